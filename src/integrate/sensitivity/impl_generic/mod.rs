//! Generic implementation of adjoint backpropagation.

pub mod adjoint_ode;
mod augmented;

pub use adjoint_ode::{odeint_adjoint_backward_impl, odeint_adjoint_forward_impl};
