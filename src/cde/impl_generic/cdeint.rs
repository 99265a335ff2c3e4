//! Generic CDE entry point.

use numr::autograd::Var;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use tracing::debug;

use super::adaptor::VectorFieldAdaptor;
use super::solution::CdeSolution;
use super::validate::{check_shapes, check_time_grid, trial_shapes};
use crate::cde::error::CdeResult;
use crate::cde::traits::{CdeOptions, ControlPath, VectorField};
use crate::common::alias;
use crate::integrate::{OdeFunc, odeint_adjoint_forward_impl, odeint_impl};

/// Solve the CDE `dz = f(z) dX` from `z0` over the grid `t`.
///
/// Validation (time grid, parameter names, the shapes of one trial
/// evaluation) completes before the solver is invoked; see
/// [`crate::cde::CdeAlgorithms::cdeint`] for the shape contract.
///
/// # Arguments
///
/// * `client` - Runtime client
/// * `path` - Control path X
/// * `z0` - Initial state, `[..., hidden_channels]`
/// * `func` - Vector field f
/// * `t` - Time grid, `[n]`
/// * `options` - Solver options and the adjoint switch
pub fn cdeint_impl<'a, R, C, P, V>(
    client: &C,
    path: &'a P,
    z0: &Var<R>,
    func: &'a V,
    t: &Var<R>,
    options: &CdeOptions,
) -> CdeResult<CdeSolution<'a, R, C, P, V>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
    P: ControlPath<R, C> + ?Sized,
    V: VectorField<R, C> + ?Sized,
{
    let z0_shape = z0.tensor().shape().to_vec();

    let validated = (|| -> CdeResult<_> {
        let times = check_time_grid(t)?;
        let adaptor = VectorFieldAdaptor::new(
            path,
            func,
            t.requires_grad(),
            z0.requires_grad(),
            options.adjoint,
        )?;
        let (control_shape, func_shape) =
            trial_shapes(client, path, func, z0, times[0], &adaptor.parameters())?;
        check_shapes(&z0_shape, &control_shape, &func_shape)?;
        Ok((times, adaptor, control_shape, func_shape))
    })();

    let (times, adaptor, control_shape, func_shape) = validated.inspect_err(|err| {
        debug!(error = %err, z0_shape = ?z0_shape, "cdeint validation failed");
    })?;

    debug!(
        adjoint = options.adjoint,
        method = ?options.ode.method,
        grid_len = times.len(),
        z0_shape = ?z0_shape,
        control_shape = ?control_shape,
        func_shape = ?func_shape,
        "solving CDE"
    );

    let ode = if options.adjoint {
        odeint_adjoint_forward_impl(client, &adaptor, z0.tensor(), t.tensor(), &options.ode)?
    } else {
        // Time gradients need the total ∂L/∂z0, so the trajectory tracks a
        // leaf standing in for z0 when the caller's z0 does not.
        let start = if t.requires_grad() && !z0.requires_grad() {
            Var::new(z0.tensor().clone(), true)
        } else {
            alias(z0)
        };
        odeint_impl(client, &adaptor, &start, t.tensor(), &options.ode)?
    };

    debug!(
        nfev = ode.nfev,
        naccept = ode.naccept,
        nreject = ode.nreject,
        "CDE solved"
    );

    Ok(CdeSolution::new(adaptor, ode, alias(z0), alias(t), options))
}
