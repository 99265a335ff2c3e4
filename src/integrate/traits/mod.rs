//! Trait definitions for the ODE solvers.

mod ode_func;
mod state;

pub use ode_func::{OdeFn, OdeFunc};
pub use state::OdeState;
