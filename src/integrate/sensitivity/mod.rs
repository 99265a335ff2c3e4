//! Adjoint backpropagation through ODE solutions.
//!
//! This module provides memory-efficient computation of gradients through an
//! ODE solve using the adjoint (continuous) sensitivity method.
//!
//! # Overview
//!
//! For dy/dt = f(t, y, θ) observed at a grid t₀ < … < t_N and a loss L that
//! depends on the observed states, the adjoint method computes ∂L/∂y0, ∂L/∂θ
//! and ∂L/∂tᵢ by integrating an augmented system backward in time. Memory is
//! O(len(t)) regardless of the number of solver steps, because the forward
//! pass keeps no autograd graph.
//!
//! # Example
//!
//! ```ignore
//! use solvr_cde::integrate::sensitivity::{
//!     AdjointOptions, odeint_adjoint_backward_impl, odeint_adjoint_forward_impl,
//! };
//!
//! let sol = odeint_adjoint_forward_impl(&client, &func, &y0, &t, &ode_opts)?;
//!
//! // ∂L/∂y(tᵢ) for every grid time
//! let grads = odeint_adjoint_backward_impl(
//!     &client,
//!     &func,
//!     &sol,
//!     &grad_outputs,
//!     true,
//!     &AdjointOptions::default().resolve(&ode_opts),
//! )?;
//!
//! let dl_dw = grads.params.get("w");
//! ```

pub mod impl_generic;
pub mod traits;

// Re-exports
pub use impl_generic::{odeint_adjoint_backward_impl, odeint_adjoint_forward_impl};
pub use traits::{AdjointGradients, AdjointOptions, AugmentedState};
