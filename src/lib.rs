//! solvr-cde - Controlled Differential Equations on numr
//!
//! solvr-cde solves controlled differential equations (CDEs)
//!
//! ```text
//! z_t = z_{t0} + ∫_{t0}^{t} f(z_s) dX_s
//! ```
//!
//! where `X` is a differentiable control path and `f` is a (usually learned)
//! vector field. The CDE is rewritten as the ODE `dz/dt = f(z) · dX/dt` and
//! handed to an explicit Runge-Kutta solver, either differentiating straight
//! through the solver or through the adjoint method.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         cde                              │
//! │   (vector field adaptor, cdeint entry point, gradients) │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ OdeFunc
//! ┌──────────────────────────▼──────────────────────────────┐
//! │                      integrate                           │
//! │   (RK steppers over a time grid, adjoint backward pass) │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ uses
//! ┌──────────────────────────▼──────────────────────────────┐
//! │                        numr                              │
//! │        (tensors, reverse-mode autograd, runtimes)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cde`] - Control path / vector field traits, the adaptor and [`cde::CdeAlgorithms::cdeint`]
//! - [`integrate`] - ODE solvers over time grids, direct and adjoint
//! - [`common`] - Parameter sets, autograd helpers and host transfers shared by both
//!
//! # Backend Support
//!
//! Everything is generic over numr's `Runtime` trait:
//! - CPU (default)
//! - CUDA (`cuda` feature)
//! - WebGPU (`wgpu` feature, F32 only)
//!
//! # Example
//!
//! ```ignore
//! use solvr_cde::cde::{CdeAlgorithms, CdeOptions};
//! use numr::autograd::Var;
//! use numr::runtime::cpu::{CpuClient, CpuDevice};
//!
//! let device = CpuDevice::new();
//! let client = CpuClient::new(device.clone());
//!
//! let z0 = Var::new(Tensor::from_slice(&[0.0f64; 12], &[4, 3], &device), false);
//! let t = Var::new(Tensor::from_slice(&[0.0f64, 1.0], &[2], &device), false);
//!
//! // `path` implements ControlPath, `func` implements VectorField
//! let solution = client.cdeint(&path, &z0, &func, &t, &CdeOptions::default())?;
//! let zt = solution.states(&client)?; // [2, 4, 3]
//!
//! let grads = solution.backward(&client, &grad_outputs)?;
//! ```

pub mod cde;
pub mod common;
pub mod integrate;

pub use cde::{
    CdeAlgorithms, CdeError, CdeGradients, CdeOptions, CdeResult, CdeSolution, ControlPath,
    DetachPolicy, FnControlPath, FnVectorField, VectorField, VectorFieldAdaptor, cdeint_impl,
};
pub use common::{GradientSet, ParameterSet};
pub use integrate::{
    AdjointOptions, IntegrateError, IntegrateResult, ODEMethod, ODEOptions, OdeFunc, odeint_impl,
};

// Re-export numr types that users will commonly need
pub use numr::autograd::Var;
pub use numr::error::{Error, Result};
pub use numr::runtime::{Runtime, RuntimeClient};
pub use numr::tensor::Tensor;
