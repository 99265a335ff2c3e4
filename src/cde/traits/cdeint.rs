//! CDE solving trait.

use numr::autograd::Var;
use numr::runtime::Runtime;

use super::control_path::ControlPath;
use super::types::CdeOptions;
use super::vector_field::VectorField;
use crate::cde::error::CdeResult;
use crate::cde::impl_generic::CdeSolution;

/// Trait for solving controlled differential equations.
///
/// Solves
///
/// ```text
/// z_t = z_{t0} + ∫_{t0}^{t} f(z_s) dX_s
/// ```
///
/// by integrating the ODE `dz/dt = f(z) · dX/dt` over the grid `t`.
///
/// # Shapes
///
/// - `z0`: `[..., hidden_channels]`
/// - `path.derivative(t)`: `[..., input_channels]`
/// - `func.evaluate(z)`: `[..., hidden_channels, input_channels]`
/// - `t`: `[n]`, strictly increasing or strictly decreasing
///
/// The batch dimensions `...` must agree exactly across all three. Shapes are
/// checked once, before any integration work.
///
/// # Gradients
///
/// With `options.adjoint` set (the default) the forward pass keeps no graph
/// and [`CdeSolution::backward`] integrates the adjoint system backward in
/// time. Otherwise the solution states carry the full autograd graph.
///
/// # Example
///
/// ```ignore
/// use solvr_cde::cde::{CdeAlgorithms, CdeOptions};
///
/// let solution = client.cdeint(&path, &z0, &func, &t, &CdeOptions::default())?;
/// let zt = solution.states(&client)?; // [len(t), ..., hidden_channels]
/// ```
pub trait CdeAlgorithms<R: Runtime>: Sized {
    /// Solve the CDE driven by `path` with vector field `func` from `z0` over `t`.
    fn cdeint<'a, P, V>(
        &self,
        path: &'a P,
        z0: &Var<R>,
        func: &'a V,
        t: &Var<R>,
        options: &CdeOptions,
    ) -> CdeResult<CdeSolution<'a, R, Self, P, V>>
    where
        P: ControlPath<R, Self> + ?Sized,
        V: VectorField<R, Self> + ?Sized;
}
