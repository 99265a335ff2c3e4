//! [`OdeState`] for autograd variables.
//!
//! Stage combinations are built with `var_*` ops, so when the initial state or
//! any parameter requires grad, the whole solve stays differentiable.

use numr::autograd::{Var, var_add, var_mul_scalar};
use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::common::alias;
use crate::integrate::traits::OdeState;

impl<R, C> OdeState<R, C> for Var<R>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
{
    fn axpy(&self, terms: &[(f64, &Self)], client: &C) -> Result<Self> {
        let mut result = alias(self);
        for &(coeff, k) in terms {
            if coeff != 0.0 {
                let term = var_mul_scalar(k, coeff, client)?;
                result = var_add(&result, &term, client)?;
            }
        }
        Ok(result)
    }

    fn alias(&self) -> Self {
        alias(self)
    }

    fn components(&self) -> Vec<&Tensor<R>> {
        vec![self.tensor()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::autograd::backward;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    use crate::common::sum_all;

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_var_axpy_tracks_gradients() {
        let (device, client) = setup();

        let y = Var::new(
            Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[2], &device),
            true,
        );
        let k = Var::new(
            Tensor::<CpuRuntime>::from_slice(&[10.0f64, 20.0], &[2], &device),
            true,
        );

        // y + 0.5 k + 0 k
        let out = y.axpy(&[(0.5, &k), (0.0, &k)], &client).unwrap();
        assert_eq!(out.tensor().to_vec::<f64>(), vec![6.0, 12.0]);

        let loss = sum_all(&out, &client).unwrap();
        let grads = backward(&loss, &client).unwrap();
        assert_eq!(grads.get(y.id()).unwrap().to_vec::<f64>(), vec![1.0, 1.0]);
        assert_eq!(grads.get(k.id()).unwrap().to_vec::<f64>(), vec![0.5, 0.5]);

        // With every coefficient zero the result is y itself
        let same = y.axpy(&[(0.0, &k)], &client).unwrap();
        assert_eq!(same.id(), y.id());
        let grads = backward(&sum_all(&same, &client).unwrap(), &client).unwrap();
        assert_eq!(grads.get(y.id()).unwrap().to_vec::<f64>(), vec![1.0, 1.0]);
    }
}
