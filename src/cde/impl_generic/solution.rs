//! Result of a CDE solve and its backward passes.

use numr::autograd::{Var, backward, var_add, var_mul};
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use super::adaptor::VectorFieldAdaptor;
use crate::cde::error::{CdeError, CdeResult};
use crate::cde::traits::{CdeGradients, CdeOptions, ControlPath, VectorField};
use crate::common::{GradientSet, sum_all};
use crate::integrate::{
    ODEOptions, OdeFunc, OdeSolution, odeint_adjoint_backward_impl, odeint_time_gradients,
};

/// Solution of a CDE at every grid time.
///
/// Keeps the adaptor (and so borrows the control path and vector field) so
/// that the adjoint backward pass can re-evaluate the dynamics.
pub struct CdeSolution<'a, R, C, P, V>
where
    R: Runtime,
    P: ?Sized,
    V: ?Sized,
{
    adaptor: VectorFieldAdaptor<'a, R, C, P, V>,
    ode: OdeSolution<R>,
    z0: Var<R>,
    t: Var<R>,
    adjoint: bool,
    backward_options: ODEOptions,
}

impl<'a, R, C, P, V> CdeSolution<'a, R, C, P, V>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
    P: ControlPath<R, C> + ?Sized,
    V: VectorField<R, C> + ?Sized,
{
    pub(crate) fn new(
        adaptor: VectorFieldAdaptor<'a, R, C, P, V>,
        ode: OdeSolution<R>,
        z0: Var<R>,
        t: Var<R>,
        options: &CdeOptions,
    ) -> Self {
        Self {
            adaptor,
            ode,
            z0,
            t,
            adjoint: options.adjoint,
            backward_options: options.backward_options(),
        }
    }

    /// Grid times, as read from `t`.
    pub fn times(&self) -> &[f64] {
        &self.ode.times
    }

    /// z at every grid time: `[len(t), ...z0.shape]`.
    pub fn states(&self, client: &C) -> CdeResult<Tensor<R>> {
        Ok(self.ode.stacked(client)?)
    }

    /// Differentiable state at every grid time; `None` in adjoint mode,
    /// where the forward pass keeps no graph.
    pub fn trajectory(&self) -> Option<&[Var<R>]> {
        (!self.adjoint).then_some(self.ode.states.as_slice())
    }

    /// State at the last grid time.
    pub fn final_state(&self) -> &Var<R> {
        self.ode.final_state()
    }

    /// Whether gradients come from the adjoint method.
    pub fn is_adjoint(&self) -> bool {
        self.adjoint
    }

    /// The adaptor the solver integrated.
    pub fn adaptor(&self) -> &VectorFieldAdaptor<'a, R, C, P, V> {
        &self.adaptor
    }

    /// Underlying ODE solution, with solver statistics.
    pub fn ode_solution(&self) -> &OdeSolution<R> {
        &self.ode
    }

    /// Backpropagate ∂L/∂z(tᵢ) for every grid time.
    ///
    /// `grad_outputs[i]` must have z0's shape; pass zeros for times the loss
    /// does not depend on.
    ///
    /// In adjoint mode the augmented system is integrated backward. In direct
    /// mode the gradients come from numr's autograd through the solver
    /// arithmetic. Either way time gradients are produced when `t` requires
    /// grad; in direct mode they are `f(tᵢ, zᵢ)·gᵢ` for i ≥ 1 and
    /// `-f(t₀, z₀)·(∂L/∂z₀ - g₀)` at the start.
    pub fn backward(&self, client: &C, grad_outputs: &[Tensor<R>]) -> CdeResult<CdeGradients<R>> {
        self.check_grad_outputs(grad_outputs)?;

        if self.adjoint {
            let grads = odeint_adjoint_backward_impl(
                client,
                &self.adaptor,
                &self.ode,
                grad_outputs,
                self.t.requires_grad(),
                &self.backward_options,
            )?;

            return Ok(CdeGradients {
                z0: self.z0.requires_grad().then_some(grads.y0),
                t: grads.t,
                parameters: grads.params,
            });
        }

        self.backward_direct(client, grad_outputs)
    }

    /// Evaluate a scalar loss on the stacked states and backpropagate it.
    ///
    /// Returns the loss value along with the gradients.
    pub fn backward_with_loss<L>(
        &self,
        client: &C,
        loss: L,
    ) -> CdeResult<(Tensor<R>, CdeGradients<R>)>
    where
        L: FnOnce(&Var<R>, &C) -> numr::error::Result<Var<R>>,
    {
        let stacked = Var::new(self.states(client)?, true);
        let value = loss(&stacked, client)?;

        let grads = backward(&value, client)?;
        let d_stacked = grads
            .get(stacked.id())
            .cloned()
            .ok_or_else(|| CdeError::InvalidGradient {
                context: "loss does not depend on the solution".to_string(),
            })?;

        let state_shape = self.z0.tensor().shape();
        let grad_outputs = (0..self.ode.times.len())
            .map(|i| Ok(d_stacked.narrow(0, i, 1)?.contiguous().reshape(state_shape)?))
            .collect::<CdeResult<Vec<_>>>()?;

        let gradients = self.backward(client, &grad_outputs)?;
        Ok((value.tensor().clone(), gradients))
    }

    fn check_grad_outputs(&self, grad_outputs: &[Tensor<R>]) -> CdeResult<()> {
        let n = self.ode.times.len();
        if grad_outputs.len() != n {
            return Err(CdeError::InvalidGradient {
                context: format!(
                    "expected {} gradients (one per grid time), got {}",
                    n,
                    grad_outputs.len()
                ),
            });
        }

        let shape = self.z0.tensor().shape();
        if let Some((i, g)) = grad_outputs.iter().enumerate().find(|(_, g)| g.shape() != shape) {
            return Err(CdeError::InvalidGradient {
                context: format!(
                    "gradient {} has shape {:?}, states have shape {:?}",
                    i,
                    g.shape(),
                    shape
                ),
            });
        }

        Ok(())
    }

    fn backward_direct(
        &self,
        client: &C,
        grad_outputs: &[Tensor<R>],
    ) -> CdeResult<CdeGradients<R>> {
        // Σᵢ sum(z(tᵢ) ⊙ gᵢ) has gradient gᵢ at every state
        let mut total: Option<Var<R>> = None;
        for (state, g) in self.ode.states.iter().zip(grad_outputs) {
            if !state.requires_grad() {
                continue;
            }
            let term = sum_all(&var_mul(state, &Var::new(g.clone(), false), client)?, client)?;
            total = Some(match total {
                Some(acc) => var_add(&acc, &term, client)?,
                None => term,
            });
        }

        let params = self.adaptor.parameters();
        let zeros_like = |x: &Tensor<R>| Tensor::<R>::zeros(x.shape(), x.dtype(), x.device());

        // None when nothing in the solve tracks gradients
        let store = total.map(|total| backward(&total, client)).transpose()?;
        let lookup = |var: &Var<R>| {
            store
                .as_ref()
                .and_then(|s| s.get(var.id()).cloned())
                .unwrap_or_else(|| zeros_like(var.tensor()))
        };

        let param_grads = params.iter().map(|(_, p)| lookup(p)).collect();
        let z0_grad = lookup(&self.ode.states[0]);

        let t_grad = if self.t.requires_grad() {
            Some(odeint_time_gradients(
                client,
                &self.adaptor,
                &self.ode,
                grad_outputs,
                &z0_grad,
            )?)
        } else {
            None
        };

        Ok(CdeGradients {
            z0: self.z0.requires_grad().then_some(z0_grad),
            t: t_grad,
            parameters: GradientSet::from_parameters(&params, param_grads),
        })
    }
}
