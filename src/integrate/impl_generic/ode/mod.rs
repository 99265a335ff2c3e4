//! Generic ODE solver implementations using tensor operations.
//!
//! All implementations use numr's `TensorOps` and `ScalarOps` for computation,
//! keeping data on device (GPU/CPU with SIMD) throughout the algorithm. The
//! time grid is the only data read back to the host.

mod explicit_rk;
mod state;
mod step_control;
mod tableau;

pub use explicit_rk::{GridOutput, grid_times, integrate_grid};
pub use step_control::{StepSizeController, compute_error, compute_initial_step, scaled_rms_norm};
pub use tableau::Tableau;

pub(crate) use step_control::sum_all_host;

use numr::autograd::Var;
use numr::dtype::DType;
use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::common::{ParameterSet, alias, from_host, time_var};
use crate::integrate::error::{IntegrateError, IntegrateResult};
use crate::integrate::traits::OdeFunc;
use crate::integrate::{ODEMethod, ODEOptions};

/// Solution of an ODE at every requested time.
pub struct OdeSolution<R: Runtime> {
    /// Requested times
    pub times: Vec<f64>,

    /// Dtype of the requested time grid
    pub time_dtype: DType,

    /// State at each requested time; `states[0]` is the initial state.
    pub states: Vec<Var<R>>,

    /// Number of function evaluations
    pub nfev: usize,

    /// Number of accepted steps
    pub naccept: usize,

    /// Number of rejected steps
    pub nreject: usize,

    /// Method used for integration
    pub method: ODEMethod,
}

impl<R: Runtime> OdeSolution<R> {
    /// State at the last requested time.
    pub fn final_state(&self) -> &Var<R> {
        // states always holds the initial state
        &self.states[self.states.len() - 1]
    }

    /// All states stacked along a new leading dimension: `[len(t), ...y0.shape]`.
    ///
    /// Uses numr's `stack` operation - data stays on device, no CPU transfer.
    pub fn stacked<C>(&self, client: &C) -> Result<Tensor<R>>
    where
        C: TensorOps<R> + RuntimeClient<R>,
    {
        let refs: Vec<&Tensor<R>> = self.states.iter().map(|s| s.tensor()).collect();
        client.stack(&refs, 0)
    }
}

/// Solve dy/dt = f(t, y, θ) from `y0` at every time in `t`, differentiating
/// straight through the solver.
///
/// The stage arithmetic uses autograd ops, so if `y0` or any parameter of
/// `func` requires grad, every returned state carries the full graph and a
/// backward pass reaches them. `states[0]` has the identity of `y0`. Memory
/// grows with the number of steps; see [`crate::integrate::sensitivity`] for
/// the adjoint alternative. Stage times are constants; gradients with respect
/// to the grid come from [`odeint_time_gradients`].
///
/// # Arguments
///
/// * `client` - Runtime client for tensor operations
/// * `func` - Right-hand side
/// * `y0` - Initial state at `t[0]`
/// * `t` - 1-D strictly monotonic grid of reporting times
/// * `options` - Solver options
pub fn odeint_impl<R, C, F>(
    client: &C,
    func: &F,
    y0: &Var<R>,
    t: &Tensor<R>,
    options: &ODEOptions,
) -> IntegrateResult<OdeSolution<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
    F: OdeFunc<R, C> + ?Sized,
{
    let times = grid_times(t, "odeint")?;
    let params = func.parameters();
    let dtype = y0.tensor().dtype();
    let device = y0.tensor().device();

    let rhs = |s: f64, y: &Var<R>| {
        func.eval(&time_var::<R>(s, false, dtype, device), y, &params, client)
    };
    let output = integrate_grid(client, rhs, alias(y0), &times, options, "odeint")?;

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

/// `sum(f(t, y) ⊙ g)` with every input detached: the direct dependence of a
/// loss with gradient `g` at y(t) on t itself.
pub(crate) fn rhs_dot<R, C, F>(
    client: &C,
    func: &F,
    t: f64,
    y: &Tensor<R>,
    params: &ParameterSet<R>,
    g: &Tensor<R>,
) -> Result<f64>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    F: OdeFunc<R, C> + ?Sized,
{
    let y_var = Var::new(y.clone(), false);
    let t_var = time_var::<R>(t, false, y.dtype(), y.device());
    let f = func.eval(&t_var, &y_var, &params.detached(), client)?;
    sum_all_host(client, &client.mul(f.tensor(), g)?)
}

/// ∂L/∂tᵢ for a solution of [`odeint_impl`].
///
/// y(tᵢ) depends on tᵢ only through the end of its own integration span, and
/// every state depends on t₀ through the start of the solve:
///
/// ```text
/// ∂L/∂tᵢ = f(tᵢ, yᵢ) · gᵢ                 (i ≥ 1)
/// ∂L/∂t₀ = -f(t₀, y₀) · (∂L/∂y₀ - g₀)
/// ```
///
/// # Arguments
///
/// * `client` - Runtime client
/// * `func` - Right-hand side used for the solve
/// * `solution` - Result of [`odeint_impl`]
/// * `grad_outputs` - gᵢ = ∂L/∂y(tᵢ) for every grid time
/// * `y0_grad` - Total ∂L/∂y₀, including g₀
pub fn odeint_time_gradients<R, C, F>(
    client: &C,
    func: &F,
    solution: &OdeSolution<R>,
    grad_outputs: &[Tensor<R>],
    y0_grad: &Tensor<R>,
) -> IntegrateResult<Tensor<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    F: OdeFunc<R, C> + ?Sized,
{
    let n = solution.times.len();
    if grad_outputs.len() != n || solution.states.len() != n {
        return Err(IntegrateError::InvalidInput {
            context: format!(
                "odeint: expected {} output gradients and states, got {} and {}",
                n,
                grad_outputs.len(),
                solution.states.len()
            ),
        });
    }

    let params = func.parameters();
    let mut time_vjps = vec![0.0f64; n];

    for i in 1..n {
        time_vjps[i] = rhs_dot(
            client,
            func,
            solution.times[i],
            solution.states[i].tensor(),
            &params,
            &grad_outputs[i],
        )?;
    }

    let through_solve = client.sub(y0_grad, &grad_outputs[0])?;
    time_vjps[0] = -rhs_dot(
        client,
        func,
        solution.times[0],
        solution.states[0].tensor(),
        &params,
        &through_solve,
    )?;

    Ok(from_host(
        &time_vjps,
        &[n],
        solution.time_dtype,
        y0_grad.device(),
        "odeint_time_gradients",
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::autograd::{backward, var_mul};
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    use crate::common::{ParameterSet, sum_all};
    use crate::integrate::traits::OdeFn;

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_odeint_shapes() {
        let (device, client) = setup();

        // dy/dt = w * y on a [2, 3] state
        let w = Var::new(Tensor::<CpuRuntime>::from_slice(&[-1.0f64], &[1], &device), false);
        let func = OdeFn::new(|_t, y, ps: &ParameterSet<CpuRuntime>, c: &CpuClient| {
            var_mul(y, ps.require("w")?, c)
        })
        .with_parameters(ParameterSet::new().with("w", &w));

        let y0 = Var::new(
            Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3], &device),
            false,
        );
        let t = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 0.5, 1.0, 2.0], &[4], &device);

        let sol = odeint_impl(&client, &func, &y0, &t, &ODEOptions::default()).unwrap();
        let stacked = sol.stacked(&client).unwrap();

        assert_eq!(stacked.shape(), &[4, 2, 3]);
        assert_eq!(sol.times, vec![0.0, 0.5, 1.0, 2.0]);

        let y_final: Vec<f64> = sol.final_state().tensor().to_vec();
        for (i, &y) in y_final.iter().enumerate() {
            let exact = (i as f64 + 1.0) * (-2.0f64).exp();
            assert!((y - exact).abs() < 1e-3, "y[{}] = {}, exact = {}", i, y, exact);
        }
    }

    #[test]
    fn test_odeint_differentiates_through_solver() {
        let (device, client) = setup();

        // dz/dt = w z, L = sum(z(T))
        // dL/dw = z0 T e^{wT}, dL/dz0 = e^{wT}
        let (w_val, z0_val, t_end) = (0.3f64, 1.5f64, 1.0f64);
        let w = Var::new(Tensor::<CpuRuntime>::from_slice(&[w_val], &[1], &device), true);
        let func = OdeFn::new(|_t, y, ps: &ParameterSet<CpuRuntime>, c: &CpuClient| {
            var_mul(y, ps.require("w")?, c)
        })
        .with_parameters(ParameterSet::new().with("w", &w));

        let z0 = Var::new(Tensor::<CpuRuntime>::from_slice(&[z0_val], &[1], &device), true);
        let t = Tensor::<CpuRuntime>::from_slice(&[0.0f64, t_end], &[2], &device);
        let opts = ODEOptions::with_tolerances(1e-8, 1e-10);

        let sol = odeint_impl(&client, &func, &z0, &t, &opts).unwrap();
        let loss = sum_all(sol.final_state(), &client).unwrap();
        let grads = backward(&loss, &client).unwrap();

        let e = (w_val * t_end).exp();
        let dw: Vec<f64> = grads.get(w.id()).unwrap().to_vec();
        let dz0: Vec<f64> = grads.get(z0.id()).unwrap().to_vec();

        assert!((dw[0] - z0_val * t_end * e).abs() < 1e-5, "dL/dw = {}", dw[0]);
        assert!((dz0[0] - e).abs() < 1e-5, "dL/dz0 = {}", dz0[0]);
    }

    #[test]
    fn test_odeint_time_gradients() {
        let (device, client) = setup();

        // dz/dt = w z, L = sum(z(T)): dL/dT = w z(T), dL/dt0 = -w z(T)
        let (w_val, z0_val, t_end) = (0.3f64, 1.5f64, 1.0f64);
        let w = Var::new(Tensor::<CpuRuntime>::from_slice(&[w_val], &[1], &device), false);
        let func = OdeFn::new(|_t, y, ps: &ParameterSet<CpuRuntime>, c: &CpuClient| {
            var_mul(y, ps.require("w")?, c)
        })
        .with_parameters(ParameterSet::new().with("w", &w));

        let z0 = Var::new(Tensor::<CpuRuntime>::from_slice(&[z0_val], &[1], &device), true);
        // Single-precision grid with a double-precision state
        let t = Tensor::<CpuRuntime>::from_slice(&[0.0f32, t_end as f32], &[2], &device);
        let opts = ODEOptions::with_tolerances(1e-8, 1e-10);

        let sol = odeint_impl(&client, &func, &z0, &t, &opts).unwrap();
        assert_eq!(sol.time_dtype, DType::F32);
        assert_eq!(sol.states[0].id(), z0.id());

        let loss = sum_all(sol.final_state(), &client).unwrap();
        let grads = backward(&loss, &client).unwrap();
        let dz0 = grads.get(z0.id()).unwrap().clone();

        let grad_outputs = vec![
            Tensor::<CpuRuntime>::zeros(&[1], DType::F64, &device),
            Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device),
        ];
        let dt = odeint_time_gradients(&client, &func, &sol, &grad_outputs, &dz0).unwrap();
        assert_eq!(dt.dtype(), DType::F32);

        let z_t = z0_val * (w_val * t_end).exp();
        let dt: Vec<f32> = dt.to_vec();
        assert!((f64::from(dt[1]) - w_val * z_t).abs() < 1e-4, "dL/dT = {}", dt[1]);
        assert!((f64::from(dt[0]) + w_val * z_t).abs() < 1e-4, "dL/dt0 = {}", dt[0]);
    }

    #[test]
    fn test_odeint_rejects_bad_grid() {
        let (device, client) = setup();

        let func = OdeFn::new(|_t, y: &Var<CpuRuntime>, _ps: &ParameterSet<CpuRuntime>, _c: &CpuClient| {
            Ok(y.clone())
        });
        let y0 = Var::new(Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device), false);

        let empty = Tensor::<CpuRuntime>::from_slice(&[] as &[f64], &[0], &device);
        assert!(odeint_impl(&client, &func, &y0, &empty, &ODEOptions::default()).is_err());

        let unsorted = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 1.0, 0.5], &[3], &device);
        assert!(odeint_impl(&client, &func, &y0, &unsorted, &ODEOptions::default()).is_err());

        let matrix = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 1.0], &[1, 2], &device);
        assert!(odeint_impl(&client, &func, &y0, &matrix, &ODEOptions::default()).is_err());
    }
}
