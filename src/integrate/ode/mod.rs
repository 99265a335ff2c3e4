//! Ordinary differential equation (ODE) solver configuration.
//!
//! The solvers integrate initial value problems of the form
//! dy/dt = f(t, y, θ), y(t0) = y0 across a grid of reporting times.
//!
//! # Available Methods
//!
//! | Method | Order | Type | Best For |
//! |--------|-------|------|----------|
//! | Euler | 1 | Fixed step | Piecewise-linear controls |
//! | Midpoint | 2 | Fixed step | Cheap fixed-step runs |
//! | RK4 | 4 | Fixed step | Classic fixed-step runs |
//! | RK23 | 2(3) | Adaptive | Low accuracy, fast |
//! | RK45 | 4(5) | Adaptive | General purpose (default) |

mod types;

pub use types::{ODEMethod, ODEOptions};
