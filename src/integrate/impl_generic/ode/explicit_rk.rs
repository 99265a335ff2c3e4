//! Explicit Runge-Kutta integration over a grid of reporting times.
//!
//! One stepper drives every method through its [`Tableau`]. Adaptive methods
//! clip their steps so that every grid point is hit exactly; fixed-step
//! methods take `step_size` steps (by default one step per grid interval),
//! shortening the last step of each interval as needed.

use numr::dtype::DType;
use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;
use tracing::trace;

use super::step_control::{StepSizeController, compute_error, compute_initial_step};
use super::tableau::Tableau;
use crate::common::to_host;
use crate::integrate::ODEOptions;
use crate::integrate::error::{IntegrateError, IntegrateResult};
use crate::integrate::traits::OdeState;

/// States at every grid time plus solver statistics.
#[derive(Debug, Clone)]
pub struct GridOutput<S> {
    /// `states[i]` is the state at `times[i]`; `states[0]` is the initial state.
    pub states: Vec<S>,
    /// Number of function evaluations
    pub nfev: usize,
    /// Number of accepted steps
    pub naccept: usize,
    /// Number of rejected steps
    pub nreject: usize,
}

/// Read a 1-D time grid into host scalars, checking that it is non-empty,
/// finite and strictly monotonic (in either direction).
///
/// Reading the grid is acceptable here: it is a small 1-D tensor at the API
/// boundary, not data inside the stepping loop. F32 and F64 grids are
/// supported.
pub fn grid_times<R: Runtime>(t: &Tensor<R>, context: &str) -> IntegrateResult<Vec<f64>> {
    if t.shape().len() != 1 {
        return Err(IntegrateError::InvalidInput {
            context: format!(
                "{}: time grid must be 1-D, got shape {:?}",
                context,
                t.shape()
            ),
        });
    }

    let dtype = t.dtype();
    if !matches!(dtype, DType::F32 | DType::F64) {
        return Err(IntegrateError::InvalidInput {
            context: format!(
                "{}: time grid must be F32 or F64, got {:?}",
                context, dtype
            ),
        });
    }

    let times = to_host(t, "grid_times")?;
    check_grid(&times, context)?;
    Ok(times)
}

pub(crate) fn check_grid(times: &[f64], context: &str) -> IntegrateResult<()> {
    if times.is_empty() {
        return Err(IntegrateError::InvalidInput {
            context: format!("{}: time grid cannot be empty", context),
        });
    }

    if let Some(&bad) = times.iter().find(|t| !t.is_finite()) {
        return Err(IntegrateError::InvalidInput {
            context: format!("{}: time grid contains non-finite value {}", context, bad),
        });
    }

    if times.len() > 1 {
        let direction = (times[1] - times[0]).signum();
        for w in times.windows(2) {
            if w[1] == w[0] || (w[1] - w[0]).signum() != direction {
                return Err(IntegrateError::InvalidInterval {
                    a: w[0],
                    b: w[1],
                    context: format!("{}: time grid must be strictly monotonic", context),
                });
            }
        }
    }

    Ok(())
}

/// Compute weighted sum of stages: h * sum(coeffs[i] * stages[i])
///
/// Uses tensor operations - data stays on device.
fn weighted_sum<R, C>(
    client: &C,
    stages: &[&Tensor<R>],
    coeffs: &[f64],
    h: f64,
) -> Result<Tensor<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R>,
{
    debug_assert_eq!(stages.len(), coeffs.len());

    let mut result = client.mul_scalar(stages[0], h * coeffs[0])?;
    for i in 1..stages.len() {
        if coeffs[i] != 0.0 {
            let term = client.mul_scalar(stages[i], h * coeffs[i])?;
            result = client.add(&result, &term)?;
        }
    }
    Ok(result)
}

/// Result of one Runge-Kutta step.
struct Step<S> {
    y_new: S,
    /// All stage derivatives; for adaptive methods the last entry is the
    /// FSAL stage f(t + h, y_new).
    stages: Vec<S>,
    nfev: usize,
}

/// Take one step of signed size `h` from `(t, y)` with first stage `k1`.
fn rk_step<R, C, S, F>(
    client: &C,
    f: &F,
    tableau: &Tableau,
    t: f64,
    y: &S,
    k1: S,
    h: f64,
) -> Result<Step<S>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    S: OdeState<R, C>,
    F: Fn(f64, &S) -> Result<S>,
{
    let mut stages = Vec::with_capacity(tableau.stages() + 1);
    stages.push(k1);
    let mut nfev = 0;

    for i in 1..tableau.stages() {
        let terms: Vec<(f64, &S)> = tableau.a[i]
            .iter()
            .zip(&stages)
            .map(|(&a, k)| (h * a, k))
            .collect();
        let y_stage = y.axpy(&terms, client)?;
        let k = f(t + tableau.c[i] * h, &y_stage)?;
        stages.push(k);
        nfev += 1;
    }

    let terms: Vec<(f64, &S)> = tableau
        .b
        .iter()
        .zip(&stages)
        .map(|(&b, k)| (h * b, k))
        .collect();
    let y_new = y.axpy(&terms, client)?;

    if tableau.is_adaptive() {
        // FSAL stage, reused as k1 of the next step
        let k_last = f(t + h, &y_new)?;
        stages.push(k_last);
        nfev += 1;
    }

    Ok(Step {
        y_new,
        stages,
        nfev,
    })
}

/// Error estimate h * Σ eᵢ kᵢ, one tensor per state component.
fn error_estimate<R, C, S>(client: &C, e: &[f64], stages: &[S], h: f64) -> Result<Vec<Tensor<R>>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    S: OdeState<R, C>,
{
    let parts: Vec<Vec<&Tensor<R>>> = stages.iter().map(|k| k.components()).collect();
    let n_components = parts.first().map_or(0, |p| p.len());

    (0..n_components)
        .map(|c| {
            let column: Vec<&Tensor<R>> = parts.iter().map(|p| p[c]).collect();
            weighted_sum(client, &column, e, h)
        })
        .collect()
}

/// Integrate `f` from `y0` across `times`, returning the state at each time.
///
/// # Arguments
///
/// * `client` - Runtime client for tensor operations
/// * `f` - Right-hand side f(t, y) -> dy/dt
/// * `y0` - State at `times[0]`
/// * `times` - Strictly monotonic reporting times (see [`check_grid`])
/// * `options` - Solver options
/// * `context` - Name used in error messages and traces
pub fn integrate_grid<R, C, S, F>(
    client: &C,
    f: F,
    y0: S,
    times: &[f64],
    options: &ODEOptions,
    context: &str,
) -> IntegrateResult<GridOutput<S>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    S: OdeState<R, C>,
    F: Fn(f64, &S) -> Result<S>,
{
    check_grid(times, context)?;

    let tableau = Tableau::for_method(options.method);
    let mut output = GridOutput {
        states: Vec::with_capacity(times.len()),
        nfev: 0,
        naccept: 0,
        nreject: 0,
    };
    output.states.push(y0.alias());

    if times.len() == 1 {
        return Ok(output);
    }

    let t_start = times[0];
    let t_end = times[times.len() - 1];
    let direction = (t_end - t_start).signum();
    let span = (t_end - t_start).abs();

    match tableau.e {
        Some(e) => integrate_adaptive(
            client,
            &f,
            tableau,
            e,
            y0,
            times,
            direction,
            span,
            options,
            context,
            &mut output,
        )?,
        None => integrate_fixed(
            client,
            &f,
            tableau,
            y0,
            times,
            direction,
            options,
            context,
            &mut output,
        )?,
    }

    Ok(output)
}

#[allow(clippy::too_many_arguments)]
fn integrate_adaptive<R, C, S, F>(
    client: &C,
    f: &F,
    tableau: &Tableau,
    e: &[f64],
    y0: S,
    times: &[f64],
    direction: f64,
    span: f64,
    options: &ODEOptions,
    context: &str,
    output: &mut GridOutput<S>,
) -> IntegrateResult<()>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    S: OdeState<R, C>,
    F: Fn(f64, &S) -> Result<S>,
{
    if !(options.rtol > 0.0) || !(options.atol > 0.0) {
        return Err(IntegrateError::InvalidParameter {
            parameter: "rtol/atol".to_string(),
            message: format!(
                "tolerances must be positive, got rtol = {}, atol = {}",
                options.rtol, options.atol
            ),
        });
    }

    let controller = StepSizeController::default();
    let min_step = options.min_step.unwrap_or(1e-14);
    let max_step = options.max_step.unwrap_or(span);
    if !(max_step > 0.0) || min_step > max_step {
        return Err(IntegrateError::InvalidParameter {
            parameter: "step_bounds".to_string(),
            message: format!("invalid step bounds [{}, {}]", min_step, max_step),
        });
    }

    let mut t = times[0];
    let mut y = y0;
    let mut k1 = f(t, &y)?;
    output.nfev += 1;

    let mut h = match options.h0 {
        Some(h0) => h0.abs(),
        None => {
            output.nfev += 1;
            compute_initial_step(
                client,
                f,
                t,
                &y,
                &k1,
                direction,
                tableau.error_order,
                options.rtol,
                options.atol,
            )?
        }
    };
    h = h.clamp(min_step, max_step);

    for &target in &times[1..] {
        while (target - t) * direction > 0.0 {
            if output.naccept + output.nreject >= options.max_steps {
                return Err(IntegrateError::MaxStepsExceeded {
                    steps: options.max_steps,
                    t,
                    context: context.to_string(),
                });
            }

            // Clip to land exactly on the grid point
            let remaining = (target - t).abs();
            let landing = h >= remaining;
            let h_step = if landing { remaining } else { h };

            let step = rk_step(client, f, tableau, t, &y, k1.alias(), direction * h_step)?;
            output.nfev += step.nfev;

            let err_parts = error_estimate(client, e, &step.stages, direction * h_step)?;
            let err = compute_error(
                client,
                &y.components(),
                &step.y_new.components(),
                &err_parts,
                options.rtol,
                options.atol,
            )?;

            if !err.is_finite() {
                return Err(IntegrateError::NumericalError {
                    message: format!(
                        "{}: non-finite error estimate at t = {:.6} (h = {:.2e})",
                        context, t, h_step
                    ),
                });
            }

            let (h_new, accept) = controller.compute_step(h_step, err, tableau.error_order);

            if accept {
                t = if landing { target } else { t + direction * h_step };
                y = step.y_new;
                // FSAL property
                k1 = step.stages.into_iter().next_back().ok_or_else(|| {
                    IntegrateError::NumericalError {
                        message: format!("{}: missing FSAL stage", context),
                    }
                })?;
                output.naccept += 1;
            } else {
                output.nreject += 1;
                trace!(context, t, h = h_step, error = err, "step rejected");

                if h_new < min_step {
                    return Err(IntegrateError::StepSizeTooSmall {
                        step: h_new,
                        t,
                        context: context.to_string(),
                    });
                }
            }

            h = h_new.clamp(min_step, max_step);
        }

        output.states.push(y.alias());
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn integrate_fixed<R, C, S, F>(
    client: &C,
    f: &F,
    tableau: &Tableau,
    y0: S,
    times: &[f64],
    direction: f64,
    options: &ODEOptions,
    context: &str,
    output: &mut GridOutput<S>,
) -> IntegrateResult<()>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    S: OdeState<R, C>,
    F: Fn(f64, &S) -> Result<S>,
{
    if let Some(h) = options.step_size {
        if !(h > 0.0) || !h.is_finite() {
            return Err(IntegrateError::InvalidParameter {
                parameter: "step_size".to_string(),
                message: format!("must be positive and finite, got {}", h),
            });
        }
    }

    let mut t = times[0];
    let mut y = y0;

    for &target in &times[1..] {
        let h = options.step_size.unwrap_or((target - t).abs());

        while (target - t) * direction > 0.0 {
            if output.naccept >= options.max_steps {
                return Err(IntegrateError::MaxStepsExceeded {
                    steps: options.max_steps,
                    t,
                    context: context.to_string(),
                });
            }

            let remaining = (target - t).abs();
            let landing = h >= remaining;
            let h_step = if landing { remaining } else { h };

            let k1 = f(t, &y)?;
            let step = rk_step(client, f, tableau, t, &y, k1, direction * h_step)?;
            output.nfev += step.nfev + 1;
            output.naccept += 1;

            t = if landing { target } else { t + direction * h_step };
            y = step.y_new;
        }

        output.states.push(y.alias());
    }

    Ok(())
}
