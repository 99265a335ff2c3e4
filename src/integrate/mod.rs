//! ODE solvers for solvr-cde.
//!
//! This module provides Runtime-first explicit Runge-Kutta solvers for initial
//! value problems dy/dt = f(t, y, θ), evaluated at a grid of reporting times,
//! in two flavours:
//!
//! - **Direct** ([`odeint_impl`]): the solver's arithmetic is recorded by
//!   numr's autograd, so gradients flow straight through every step.
//! - **Adjoint** ([`sensitivity`]): the forward pass keeps no graph and
//!   gradients come from integrating the augmented adjoint system backward.
//!
//! # Architecture
//!
//! Right-hand sides implement [`OdeFunc`] and receive their differentiable
//! parameters explicitly through a [`crate::common::ParameterSet`]. A single
//! tableau-driven stepper integrates any [`traits::OdeState`]: autograd
//! variables for the direct and forward passes, the augmented state for the
//! backward pass.
//!
//! # Available Methods
//!
//! - **Euler**, **Midpoint**, **RK4**: fixed step
//! - **RK23**: Bogacki-Shampine 2(3) - low accuracy, fast
//! - **RK45**: Dormand-Prince 4(5) - general purpose (default)
//!
//! # Example
//!
//! ```ignore
//! use solvr_cde::integrate::{ODEOptions, odeint_impl};
//! use solvr_cde::integrate::traits::OdeFn;
//! use numr::autograd::var_mul_scalar;
//!
//! // Solve dy/dt = -y, y(0) = 1
//! let func = OdeFn::new(|_t, y, _params, c| var_mul_scalar(y, -1.0, c));
//! let y0 = Var::new(Tensor::from_slice(&[1.0], &[1], &device), false);
//! let t = Tensor::from_slice(&[0.0, 1.0, 5.0], &[3], &device);
//!
//! let sol = odeint_impl(&client, &func, &y0, &t, &ODEOptions::default())?;
//! let ys = sol.stacked(&client)?; // [3, 1]
//! ```

pub mod error;
pub mod impl_generic;
pub mod ode;
pub mod sensitivity;
pub mod traits;

// Re-export error types
pub use error::{IntegrateError, IntegrateResult};

// Re-export ODE types
pub use ode::{ODEMethod, ODEOptions};

// Re-export tensor-based ODE types and functions
pub use impl_generic::ode::{OdeSolution, StepSizeController, odeint_impl, odeint_time_gradients};
pub use sensitivity::{
    AdjointGradients, AdjointOptions, odeint_adjoint_backward_impl, odeint_adjoint_forward_impl,
};
pub use traits::{OdeFn, OdeFunc, OdeState};
