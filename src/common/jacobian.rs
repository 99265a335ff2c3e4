//! Reverse-mode autograd helpers shared across solvr-cde.
//!
//! The adjoint solver needs, at every stage of the backward integration, the
//! vector-Jacobian products of the right-hand side with respect to the time,
//! the state and every injected parameter. [`vjp_with_parameters`] computes
//! all of them with a single backward pass through numr's autograd graph.
//!
//! # Mathematical Background
//!
//! For dy/dt = f(t, y, θ) and adjoint a(t), the adjoint system is
//!
//! ```text
//! da/dt   = -aᵀ · ∂f/∂y
//! da_θ/dt = -aᵀ · ∂f/∂θ
//! da_t/dt = -aᵀ · ∂f/∂t
//! ```
//!
//! Each right-hand side is the gradient of the scalar `sum(f ⊙ v)` with
//! `v = -a`, which is exactly what reverse mode produces in one pass.

use numr::autograd::{Var, backward, var_mul, var_sum};
use numr::dtype::DType;
use numr::error::Result;
use numr::ops::TensorOps;
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use super::parameters::ParameterSet;

/// Another handle to `var` with the same identity.
///
/// `Var::clone` mints a new id, so gradients flowing into a clone of a leaf
/// are stored under the clone and never reach the original. Anything that
/// keeps a variable for a later gradient lookup must hold an alias instead.
pub fn alias<R: Runtime>(var: &Var<R>) -> Var<R> {
    match var.grad_fn() {
        Some(grad_fn) => {
            Var::with_id_and_grad_fn(var.tensor().clone(), var.id(), Some(grad_fn.clone()))
        }
        None => Var::with_id(var.tensor().clone(), var.id(), var.requires_grad()),
    }
}

/// Scalar time as a shape `[1]` variable of the given dtype.
pub fn time_var<R: Runtime>(
    t: f64,
    requires_grad: bool,
    dtype: DType,
    device: &R::Device,
) -> Var<R> {
    Var::new(Tensor::<R>::full_scalar(&[1], dtype, t, device), requires_grad)
}

/// Sum a variable over all of its dimensions.
pub fn sum_all<R, C>(var: &Var<R>, client: &C) -> Result<Var<R>>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
{
    let all_dims: Vec<usize> = (0..var.tensor().shape().len()).collect();
    var_sum(var, &all_dims, false, client)
}

/// Value and vector-Jacobian products of f(t, y, θ) at one point.
#[derive(Debug, Clone)]
pub struct ParameterVjp<R: Runtime> {
    /// f(t, y, θ).
    pub value: Tensor<R>,

    /// vᵀ · ∂f/∂t, shape `[1]` (zeros when f does not reach t).
    pub vjp_t: Tensor<R>,

    /// vᵀ · ∂f/∂y, shape of y (zeros when f does not reach y).
    pub vjp_y: Tensor<R>,

    /// vᵀ · ∂f/∂θᵢ for every parameter, in parameter order.
    pub vjp_params: Vec<Tensor<R>>,
}

/// Compute f(t, y, θ) and its vector-Jacobian products with respect to t, y
/// and every parameter in `params`.
///
/// Fresh leaves are created for t, y and each parameter, so the products are
/// well defined even when the caller's parameters are non-leaf tensors. An
/// input that `f` detaches (or never touches) gets a zero product.
///
/// # Arguments
///
/// * `client` - Runtime client
/// * `f` - Function f(t, y, θ) returning dy/dt
/// * `t` - Current time (scalar)
/// * `y` - Current state
/// * `params` - Parameters injected into `f`
/// * `v` - Vector to left-multiply with the Jacobians (shape of f's output)
pub fn vjp_with_parameters<R, C, F>(
    client: &C,
    f: F,
    t: f64,
    y: &Tensor<R>,
    params: &ParameterSet<R>,
    v: &Tensor<R>,
) -> Result<ParameterVjp<R>>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R>,
    F: Fn(&Var<R>, &Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    let device = y.device();

    // Create input variables with grad tracking
    let t_var = time_var::<R>(t, true, y.dtype(), device);
    let y_var = Var::new(y.clone(), true);
    let leaves = params.as_leaves();

    // Forward pass
    let f_var = f(&t_var, &y_var, &leaves, client)?;
    let value = f_var.tensor().clone();

    let zeros_like = |x: &Tensor<R>| Tensor::<R>::zeros(x.shape(), x.dtype(), x.device());

    if !f_var.requires_grad() {
        // Nothing upstream tracks gradients: every product is zero.
        return Ok(ParameterVjp {
            value,
            vjp_t: zeros_like(t_var.tensor()),
            vjp_y: zeros_like(y),
            vjp_params: leaves.iter().map(|(_, p)| zeros_like(p.tensor())).collect(),
        });
    }

    // vᵀ · f as a scalar loss
    let v_var = Var::new(v.clone(), false);
    let prod = var_mul(&f_var, &v_var, client)?;
    let loss = sum_all(&prod, client)?;

    let grads = backward(&loss, client)?;

    let vjp_t = grads
        .get(t_var.id())
        .cloned()
        .unwrap_or_else(|| zeros_like(t_var.tensor()));
    let vjp_y = grads
        .get(y_var.id())
        .cloned()
        .unwrap_or_else(|| zeros_like(y));
    let vjp_params = leaves
        .iter()
        .map(|(_, p)| {
            grads
                .get(p.id())
                .cloned()
                .unwrap_or_else(|| zeros_like(p.tensor()))
        })
        .collect();

    Ok(ParameterVjp {
        value,
        vjp_t,
        vjp_y,
        vjp_params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::autograd::{var_add, var_mul_scalar};
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_alias_keeps_gradient_identity() {
        let (device, client) = setup();

        let x = Var::new(
            Tensor::<CpuRuntime>::from_slice(&[1.0f64, -2.0], &[2], &device),
            true,
        );

        // A leaf alias routes gradients to the original
        let leaf = alias(&x);
        assert_eq!(leaf.id(), x.id());
        let grads = backward(&sum_all(&leaf, &client).unwrap(), &client).unwrap();
        assert_eq!(grads.get(x.id()).unwrap().to_vec::<f64>(), vec![1.0, 1.0]);

        // A plain clone does not
        let cloned = x.clone();
        let grads = backward(&sum_all(&cloned, &client).unwrap(), &client).unwrap();
        assert!(grads.get(x.id()).is_none());

        // An alias of a computed variable keeps both its id and its history
        let y = var_mul_scalar(&x, 3.0, &client).unwrap();
        let y_alias = alias(&y);
        assert_eq!(y_alias.id(), y.id());
        let grads = backward(&sum_all(&y_alias, &client).unwrap(), &client).unwrap();
        assert_eq!(grads.get(y.id()).unwrap().to_vec::<f64>(), vec![1.0, 1.0]);
        assert_eq!(grads.get(x.id()).unwrap().to_vec::<f64>(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_time_var_dtype() {
        let (device, _client) = setup();

        let t = time_var::<CpuRuntime>(0.25, false, DType::F32, &device);
        assert_eq!(t.tensor().dtype(), DType::F32);
        assert_eq!(t.tensor().to_vec::<f32>(), vec![0.25]);
        assert_eq!(t.tensor().shape(), &[1]);
    }

    #[test]
    fn test_vjp_with_parameters() {
        let (device, client) = setup();

        // f(t, y, p) = p * y + 2t
        // ∂f/∂y = p, ∂f/∂p = y, ∂f/∂t = 2
        let y = Tensor::<CpuRuntime>::from_slice(&[2.0f64], &[1], &device);
        let p = Var::new(Tensor::<CpuRuntime>::from_slice(&[3.0f64], &[1], &device), true);
        let v = Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device);
        let params = ParameterSet::new().with("p", &p);

        let vjp = vjp_with_parameters(
            &client,
            |t, y_var, ps: &ParameterSet<CpuRuntime>, c: &CpuClient| {
                let py = var_mul(ps.require("p")?, y_var, c)?;
                let two_t = var_mul_scalar(t, 2.0, c)?;
                var_add(&py, &two_t, c)
            },
            0.5,
            &y,
            &params,
            &v,
        )
        .unwrap();

        // f = 3 * 2 + 1 = 7
        assert!((vjp.value.to_vec::<f64>()[0] - 7.0).abs() < 1e-10);
        assert!((vjp.vjp_y.to_vec::<f64>()[0] - 3.0).abs() < 1e-10);
        assert!((vjp.vjp_params[0].to_vec::<f64>()[0] - 2.0).abs() < 1e-10);
        assert!((vjp.vjp_t.to_vec::<f64>()[0] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_vjp_detached_inputs_are_zero() {
        let (device, client) = setup();

        // f detaches y internally, so only the parameter sees a gradient
        let y = Tensor::<CpuRuntime>::from_slice(&[2.0f64], &[1], &device);
        let p = Var::new(Tensor::<CpuRuntime>::from_slice(&[3.0f64], &[1], &device), true);
        let v = Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device);
        let params = ParameterSet::new().with("p", &p);

        let vjp = vjp_with_parameters(
            &client,
            |_t, y_var, ps: &ParameterSet<CpuRuntime>, c: &CpuClient| {
                var_mul(ps.require("p")?, &y_var.detach(), c)
            },
            0.0,
            &y,
            &params,
            &v,
        )
        .unwrap();

        assert_eq!(vjp.vjp_y.to_vec::<f64>(), vec![0.0]);
        assert_eq!(vjp.vjp_t.to_vec::<f64>(), vec![0.0]);
        assert!((vjp.vjp_params[0].to_vec::<f64>()[0] - 2.0).abs() < 1e-10);
    }
}
