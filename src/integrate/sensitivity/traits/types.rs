//! Types for adjoint backpropagation through ODE solutions.
//!
//! These types configure the backward integration of the augmented adjoint
//! system and store the gradients it produces.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::common::GradientSet;
use crate::integrate::{ODEMethod, ODEOptions};

/// Options for the backward (adjoint) integration.
///
/// Every field left as `None` is inherited from the forward [`ODEOptions`].
#[derive(Debug, Clone, Default)]
pub struct AdjointOptions {
    /// Method for adjoint integration.
    pub method: Option<ODEMethod>,

    /// Relative tolerance for adjoint integration.
    pub rtol: Option<f64>,

    /// Absolute tolerance for adjoint integration.
    pub atol: Option<f64>,

    /// Step size for fixed-step adjoint integration.
    pub step_size: Option<f64>,

    /// Maximum steps per grid interval of the adjoint integration.
    pub max_steps: Option<usize>,
}

impl AdjointOptions {
    /// Set adjoint integration tolerances.
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = Some(rtol);
        self.atol = Some(atol);
        self
    }

    /// Set adjoint integration method.
    pub fn with_method(mut self, method: ODEMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the step size of a fixed-step adjoint method.
    pub fn with_step_size(mut self, h: f64) -> Self {
        self.step_size = Some(h);
        self
    }

    /// Set the maximum number of adjoint steps.
    pub fn with_max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Solver options for the backward pass, filling gaps from `forward`.
    ///
    /// The forward initial step is never reused: the augmented system has
    /// different dynamics.
    pub fn resolve(&self, forward: &ODEOptions) -> ODEOptions {
        ODEOptions {
            method: self.method.unwrap_or(forward.method),
            rtol: self.rtol.unwrap_or(forward.rtol),
            atol: self.atol.unwrap_or(forward.atol),
            h0: None,
            step_size: self.step_size.or(forward.step_size),
            max_step: forward.max_step,
            min_step: forward.min_step,
            max_steps: self.max_steps.unwrap_or(forward.max_steps),
        }
    }
}

/// State of the augmented adjoint system
///
/// ```text
/// d/dt (y, a, a_t, a_θ) = (f, -aᵀ·∂f/∂y, -aᵀ·∂f/∂t, -aᵀ·∂f/∂θ)
/// ```
///
/// integrated backward in time from the last grid point.
#[derive(Debug, Clone)]
pub struct AugmentedState<R: Runtime> {
    /// Forward state y(t), reconstructed backward.
    pub y: Tensor<R>,

    /// Adjoint a(t) = ∂L/∂y(t).
    pub adj_y: Tensor<R>,

    /// Time adjoint, shape `[1]`.
    pub adj_t: Tensor<R>,

    /// Parameter adjoints, one per parameter of the right-hand side.
    pub adj_params: Vec<Tensor<R>>,
}

/// Gradients produced by the adjoint backward pass.
#[derive(Debug, Clone)]
pub struct AdjointGradients<R: Runtime> {
    /// ∂L/∂y0.
    pub y0: Tensor<R>,

    /// ∂L/∂t for every grid time (only when time gradients were requested).
    pub t: Option<Tensor<R>>,

    /// ∂L/∂θ for every parameter, by name.
    pub params: GradientSet<R>,

    /// Number of function evaluations during the backward pass.
    pub nfev: usize,
}
