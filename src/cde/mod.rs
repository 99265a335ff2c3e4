//! Controlled differential equations.
//!
//! Solves
//!
//! ```text
//! z_t = z_{t0} + ∫_{t0}^{t} f(z_s) dX_s
//! ```
//!
//! for a differentiable control path `X` and a vector field `f`, by handing
//! the equivalent ODE `dz/dt = f(z) · dX/dt` to the solvers in
//! [`crate::integrate`].
//!
//! # Components
//!
//! | Item | Role |
//! |------|------|
//! | [`ControlPath`] | dX/dt at a time, plus its computed parameters |
//! | [`VectorField`] | f(z) with shape `[..., hidden, input]`, plus its parameters |
//! | [`VectorFieldAdaptor`] | `f(z) · dX/dt` as an [`crate::integrate::OdeFunc`] |
//! | [`CdeAlgorithms::cdeint`] | validates shapes and runs the direct or adjoint solver |
//! | [`CdeSolution`] | states at every grid time and the backward passes |
//!
//! # Adjoint mode
//!
//! With [`CdeOptions::adjoint`] set (the default), the forward pass keeps no
//! autograd graph and gradients come from integrating the adjoint system
//! backward. The adaptor then detaches t and z whenever the caller does not
//! need their gradients ([`DetachPolicy`]).
//!
//! Control paths built by linear interpolation do not mix well with adjoint
//! mode: their derivative jumps at every knot, so the backward integration
//! sees a discontinuous right-hand side. Prefer smooth interpolants there.
//!
//! # Example
//!
//! ```ignore
//! use solvr_cde::cde::{CdeAlgorithms, CdeOptions, FnVectorField};
//! use solvr_cde::ParameterSet;
//!
//! let func = FnVectorField::new(|z, params, c| my_field(z, params, c))
//!     .with_parameters(ParameterSet::new().with("weight", &weight));
//!
//! let solution = client.cdeint(&spline, &z0, &func, &t, &CdeOptions::default())?;
//! let (loss, grads) = solution.backward_with_loss(&client, |zt, c| my_loss(zt, c))?;
//! let d_weight = grads.parameters.get("weight");
//! ```

mod cpu;

#[cfg(feature = "cuda")]
mod cuda;

#[cfg(feature = "wgpu")]
mod wgpu;

pub mod error;
pub mod impl_generic;
pub mod traits;

pub use error::{CdeError, CdeResult, ShapeSource};
pub use impl_generic::{CdeSolution, VectorFieldAdaptor, cdeint_impl};
pub use traits::{
    CdeAlgorithms, CdeGradients, CdeOptions, ControlPath, DetachPolicy, FnControlPath,
    FnVectorField, VectorField,
};
