//! Types for CDE solving.

use numr::autograd::{GradStore, Var, backward, var_add, var_mul};
use numr::ops::TensorOps;
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::cde::error::{CdeError, CdeResult};
use crate::common::{GradientSet, ParameterSet, sum_all};
use crate::integrate::{AdjointOptions, ODEMethod, ODEOptions};

/// Options for [`crate::cde::CdeAlgorithms::cdeint`].
#[derive(Debug, Clone)]
pub struct CdeOptions {
    /// Backpropagate through the adjoint method (default: true).
    ///
    /// When false, gradients are taken straight through the solver's
    /// arithmetic, which keeps every intermediate stage alive.
    pub adjoint: bool,

    /// Options for the forward integration.
    pub ode: ODEOptions,

    /// Options for the backward integration in adjoint mode; unset fields
    /// inherit from `ode`.
    pub adjoint_options: AdjointOptions,
}

impl Default for CdeOptions {
    fn default() -> Self {
        Self {
            adjoint: true,
            ode: ODEOptions::default(),
            adjoint_options: AdjointOptions::default(),
        }
    }
}

impl CdeOptions {
    /// Options that differentiate straight through the solver.
    pub fn direct() -> Self {
        Self {
            adjoint: false,
            ..Default::default()
        }
    }

    /// Enable or disable the adjoint method.
    pub fn with_adjoint(mut self, adjoint: bool) -> Self {
        self.adjoint = adjoint;
        self
    }

    /// Replace the forward solver options.
    pub fn with_ode_options(mut self, ode: ODEOptions) -> Self {
        self.ode = ode;
        self
    }

    /// Set the forward integration method.
    pub fn with_method(mut self, method: ODEMethod) -> Self {
        self.ode.method = method;
        self
    }

    /// Set forward integration tolerances.
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.ode.rtol = rtol;
        self.ode.atol = atol;
        self
    }

    /// Replace the backward (adjoint) solver options.
    pub fn with_adjoint_options(mut self, adjoint_options: AdjointOptions) -> Self {
        self.adjoint_options = adjoint_options;
        self
    }

    /// Solver options for the adjoint backward pass.
    pub fn backward_options(&self) -> ODEOptions {
        self.adjoint_options.resolve(&self.ode)
    }
}

/// Which inputs the vector field adaptor detaches before evaluation.
///
/// Fixed once per integration call. An input is detached only in adjoint mode
/// and only when the caller does not want its gradient: the adjoint pass asks
/// for vector-Jacobian products with respect to every input, so anything still
/// attached is differentiated whether or not it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetachPolicy {
    /// Detach the time before querying the control path.
    pub detach_t: bool,

    /// Detach the state before evaluating the vector field.
    ///
    /// In adjoint mode this also freezes the state adjoint during the
    /// backward pass, so parameter gradients only see the direct dependence
    /// of each output on the parameters along the stored trajectory.
    pub detach_z: bool,
}

impl DetachPolicy {
    /// Derive the policy from the caller's gradient requirements.
    pub fn new(t_requires_grad: bool, z0_requires_grad: bool, adjoint: bool) -> Self {
        Self {
            detach_t: adjoint && !t_requires_grad,
            detach_z: adjoint && !z0_requires_grad,
        }
    }
}

/// Gradients of a scalar loss with respect to the inputs of a CDE solve.
#[derive(Debug, Clone)]
pub struct CdeGradients<R: Runtime> {
    /// ∂L/∂z0, present when z0 requires grad.
    pub z0: Option<Tensor<R>>,

    /// ∂L/∂t for every grid time, present when t requires grad.
    pub t: Option<Tensor<R>>,

    /// ∂L/∂θ for every vector field parameter and computed path parameter.
    ///
    /// Gradients of computed parameters stop at the computed tensor; see
    /// [`CdeGradients::backward_computed`].
    pub parameters: GradientSet<R>,
}

impl<R: Runtime> CdeGradients<R> {
    /// Continue the gradients of computed parameters into the leaves they
    /// were computed from.
    ///
    /// Backpropagates `Σ sum(pᵢ ⊙ ∂L/∂pᵢ)` through the graph of every entry of
    /// `computed` that requires grad and has a gradient here. The returned
    /// store holds the share of ∂L/∂leaf flowing through those parameters.
    pub fn backward_computed<C>(
        &self,
        computed: &ParameterSet<R>,
        client: &C,
    ) -> CdeResult<GradStore<R>>
    where
        C: TensorOps<R> + RuntimeClient<R>,
        R::Client: TensorOps<R>,
    {
        let mut total: Option<Var<R>> = None;

        for (name, var) in computed.iter() {
            if !var.requires_grad() {
                continue;
            }
            let Some(grad) = self.parameters.get(name) else {
                continue;
            };

            let weighted = var_mul(var, &Var::new(grad.clone(), false), client)?;
            let term = sum_all(&weighted, client)?;
            total = Some(match total {
                Some(acc) => var_add(&acc, &term, client)?,
                None => term,
            });
        }

        let total = total.ok_or_else(|| CdeError::InvalidGradient {
            context: "no computed parameter both requires grad and has a gradient".to_string(),
        })?;

        Ok(backward(&total, client)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::autograd::var_mul_scalar;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_detach_policy() {
        // Without the adjoint method nothing is ever detached
        assert_eq!(DetachPolicy::new(false, false, false), DetachPolicy::default());

        let policy = DetachPolicy::new(false, true, true);
        assert!(policy.detach_t);
        assert!(!policy.detach_z);

        let policy = DetachPolicy::new(true, false, true);
        assert!(!policy.detach_t);
        assert!(policy.detach_z);

        let policy = DetachPolicy::new(true, true, true);
        assert!(!policy.detach_t && !policy.detach_z);
    }

    #[test]
    fn test_options_defaults() {
        let opts = CdeOptions::default();
        assert!(opts.adjoint);
        assert_eq!(opts.ode.method, ODEMethod::RK45);

        let opts = CdeOptions::direct()
            .with_method(ODEMethod::RK4)
            .with_tolerances(1e-6, 1e-8)
            .with_adjoint_options(AdjointOptions::default().with_tolerances(1e-9, 1e-11));
        assert!(!opts.adjoint);

        let back = opts.backward_options();
        assert_eq!(back.method, ODEMethod::RK4);
        assert_eq!(back.rtol, 1e-9);
        assert_eq!(back.atol, 1e-11);
    }

    #[test]
    fn test_backward_computed() {
        let (device, client) = setup();

        // coeff = 3 * leaf, ∂L/∂coeff = 2 → ∂L/∂leaf = 6
        let leaf = Var::new(Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[2], &device), true);
        let coeff = var_mul_scalar(&leaf, 3.0, &client).unwrap();
        let computed = ParameterSet::new().with("coeff", &coeff);

        let grad = Tensor::<CpuRuntime>::from_slice(&[2.0f64, 2.0], &[2], &device);
        let grads = CdeGradients {
            z0: None,
            t: None,
            parameters: GradientSet::from_parameters(&computed, vec![grad]),
        };

        let store = grads.backward_computed(&computed, &client).unwrap();
        let d_leaf: Vec<f64> = store.get(leaf.id()).unwrap().to_vec();
        assert!((d_leaf[0] - 6.0).abs() < 1e-12);
        assert!((d_leaf[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_backward_computed_without_graph() {
        let (device, client) = setup();

        let detached = Var::new(Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device), false);
        let computed = ParameterSet::new().with("coeff", &detached);
        let grads = CdeGradients {
            z0: None,
            t: None,
            parameters: GradientSet::from_parameters(
                &computed,
                vec![Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device)],
            ),
        };

        assert!(matches!(
            grads.backward_computed(&computed, &client),
            Err(CdeError::InvalidGradient { .. })
        ));
    }
}
