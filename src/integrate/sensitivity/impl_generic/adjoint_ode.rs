//! Adjoint backpropagation through an ODE solution.
//!
//! The forward pass integrates without building an autograd graph and keeps
//! only the states at the grid times. The backward pass reconstructs the
//! trajectory by integrating the augmented system backward, one grid
//! interval at a time, injecting the incoming gradient at every grid point.

use numr::autograd::Var;
use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;
use tracing::debug;

use crate::common::{GradientSet, from_host, time_var, vjp_with_parameters};
use crate::integrate::ODEOptions;
use crate::integrate::error::{IntegrateError, IntegrateResult};
use crate::integrate::impl_generic::ode::{
    OdeSolution, grid_times, integrate_grid, rhs_dot, sum_all_host,
};
use crate::integrate::sensitivity::traits::{AdjointGradients, AugmentedState};
use crate::integrate::traits::OdeFunc;

/// Forward pass of the adjoint method.
///
/// Integrates dy/dt = f(t, y, θ) with every input detached, so no autograd
/// graph is retained. The returned states do not require grad; gradients are
/// obtained from [`odeint_adjoint_backward_impl`].
///
/// # Arguments
///
/// * `client` - Runtime client
/// * `func` - Right-hand side
/// * `y0` - Initial state at `t[0]`
/// * `t` - 1-D strictly monotonic grid of reporting times
/// * `options` - Solver options for the forward pass
pub fn odeint_adjoint_forward_impl<R, C, F>(
    client: &C,
    func: &F,
    y0: &Tensor<R>,
    t: &Tensor<R>,
    options: &ODEOptions,
) -> IntegrateResult<OdeSolution<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
    F: OdeFunc<R, C> + ?Sized,
{
    let times = grid_times(t, "odeint_adjoint")?;
    let params = func.parameters().detached();
    let dtype = y0.dtype();
    let device = y0.device();

    let rhs = |s: f64, y: &Var<R>| {
        func.eval(&time_var::<R>(s, false, dtype, device), y, &params, client)
    };
    let output = integrate_grid(
        client,
        rhs,
        Var::new(y0.clone(), false),
        &times,
        options,
        "odeint_adjoint",
    )?;

    Ok(OdeSolution {
        times,
        time_dtype: t.dtype(),
        states: output.states,
        nfev: output.nfev,
        naccept: output.naccept,
        nreject: output.nreject,
        method: options.method,
    })
}

/// Backward pass of the adjoint method.
///
/// Given ∂L/∂y(tᵢ) for every grid time, computes ∂L/∂y0, ∂L/∂θ for every
/// parameter of `func` and, when `track_time` is set, ∂L/∂tᵢ.
///
/// # Algorithm
///
/// Starting from a = ∂L/∂y(t_N), for i = N..1:
///
/// 1. If time gradients are tracked, ∂L/∂tᵢ = f(tᵢ, yᵢ) · ∂L/∂y(tᵢ) and the
///    time adjoint is decreased by it.
/// 2. Integrate the augmented system
///    `(f, -aᵀ·∂f/∂y, -aᵀ·∂f/∂t, -aᵀ·∂f/∂θ)` from tᵢ to tᵢ₋₁.
/// 3. Reset y to the stored forward state yᵢ₋₁ and add ∂L/∂y(tᵢ₋₁) to a.
///
/// At the end a is ∂L/∂y0, the parameter adjoints are ∂L/∂θ and the time
/// adjoint is ∂L/∂t0.
///
/// # Arguments
///
/// * `client` - Runtime client
/// * `func` - Right-hand side used for the forward pass
/// * `solution` - Result of [`odeint_adjoint_forward_impl`]
/// * `grad_outputs` - ∂L/∂y(tᵢ) for every grid time (zeros where L does not depend on it)
/// * `track_time` - Whether to compute gradients with respect to the grid
/// * `options` - Solver options for the backward integration
pub fn odeint_adjoint_backward_impl<R, C, F>(
    client: &C,
    func: &F,
    solution: &OdeSolution<R>,
    grad_outputs: &[Tensor<R>],
    track_time: bool,
    options: &ODEOptions,
) -> IntegrateResult<AdjointGradients<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R>,
    F: OdeFunc<R, C> + ?Sized,
{
    let times = &solution.times;
    let states = &solution.states;
    let n = times.len();

    if grad_outputs.len() != n || states.len() != n {
        return Err(IntegrateError::InvalidInput {
            context: format!(
                "odeint_adjoint: expected {} output gradients and states, got {} and {}",
                n,
                grad_outputs.len(),
                states.len()
            ),
        });
    }
    for (i, (g, y)) in grad_outputs.iter().zip(states).enumerate() {
        if g.shape() != y.tensor().shape() {
            return Err(IntegrateError::InvalidInput {
                context: format!(
                    "odeint_adjoint: output gradient {} has shape {:?}, state has shape {:?}",
                    i,
                    g.shape(),
                    y.tensor().shape()
                ),
            });
        }
    }

    let params = func.parameters();
    let dtype = states[n - 1].tensor().dtype();
    let device = grad_outputs[n - 1].device();

    let mut adj_y = grad_outputs[n - 1].clone();
    let mut adj_t = 0.0f64;
    let mut adj_params: Vec<Tensor<R>> = params
        .iter()
        .map(|(_, p)| Tensor::<R>::zeros(p.tensor().shape(), p.tensor().dtype(), device))
        .collect();
    let mut time_vjps = vec![0.0f64; n];
    let mut nfev = 0usize;

    // d/dt (y, a, a_t, a_θ) = (f, -aᵀ·∂f/∂y, -aᵀ·∂f/∂t, -aᵀ·∂f/∂θ)
    let augmented_rhs = |s: f64, state: &AugmentedState<R>| -> Result<AugmentedState<R>> {
        let neg_adj = client.mul_scalar(&state.adj_y, -1.0)?;
        let vjp = vjp_with_parameters(
            client,
            |t, y, p, c| func.eval(t, y, p, c),
            s,
            &state.y,
            &params,
            &neg_adj,
        )?;
        Ok(AugmentedState {
            y: vjp.value,
            adj_y: vjp.vjp_y,
            adj_t: vjp.vjp_t,
            adj_params: vjp.vjp_params,
        })
    };

    for i in (1..n).rev() {
        let (t_hi, t_lo) = (times[i], times[i - 1]);

        if track_time {
            // Direct dependence of y(tᵢ) on tᵢ
            let dl = rhs_dot(
                client,
                func,
                t_hi,
                states[i].tensor(),
                &params,
                &grad_outputs[i],
            )?;
            time_vjps[i] = dl;
            adj_t -= dl;
            nfev += 1;
        }

        let start = AugmentedState {
            y: states[i].tensor().clone(),
            adj_y,
            adj_t: Tensor::<R>::full_scalar(&[1], dtype, adj_t, device),
            adj_params,
        };

        let mut output = integrate_grid(
            client,
            &augmented_rhs,
            start,
            &[t_hi, t_lo],
            options,
            "odeint_adjoint",
        )?;
        nfev += output.nfev;

        debug!(
            t_start = t_hi,
            t_end = t_lo,
            nfev = output.nfev,
            naccept = output.naccept,
            nreject = output.nreject,
            "adjoint interval integrated"
        );

        let end = output
            .states
            .pop()
            .ok_or_else(|| IntegrateError::NumericalError {
                message: "odeint_adjoint: backward integration returned no state".to_string(),
            })?;

        adj_y = client.add(&end.adj_y, &grad_outputs[i - 1])?;
        adj_t = sum_all_host(client, &end.adj_t)?;
        adj_params = end.adj_params;
    }

    time_vjps[0] = adj_t;
    let t_grad = if track_time {
        Some(from_host(
            &time_vjps,
            &[n],
            solution.time_dtype,
            device,
            "odeint_adjoint",
        )?)
    } else {
        None
    };

    Ok(AdjointGradients {
        y0: adj_y,
        t: t_grad,
        params: GradientSet::from_parameters(&params, adj_params),
        nfev,
    })
}
