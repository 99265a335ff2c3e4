//! [`OdeState`] for the augmented adjoint system.

use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::integrate::sensitivity::traits::AugmentedState;
use crate::integrate::traits::OdeState;

/// `base + Σ cᵢ · xᵢ` on plain tensors.
fn axpy_tensor<'a, R, C, I>(client: &C, base: &Tensor<R>, terms: I) -> Result<Tensor<R>>
where
    R: Runtime + 'a,
    C: TensorOps<R> + ScalarOps<R>,
    I: IntoIterator<Item = (f64, &'a Tensor<R>)>,
{
    let mut result = base.clone();
    for (coeff, x) in terms {
        if coeff != 0.0 {
            result = client.add(&result, &client.mul_scalar(x, coeff)?)?;
        }
    }
    Ok(result)
}

impl<R, C> OdeState<R, C> for AugmentedState<R>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
{
    fn axpy(&self, terms: &[(f64, &Self)], client: &C) -> Result<Self> {
        let y = axpy_tensor(client, &self.y, terms.iter().map(|&(c, k)| (c, &k.y)))?;
        let adj_y = axpy_tensor(client, &self.adj_y, terms.iter().map(|&(c, k)| (c, &k.adj_y)))?;
        let adj_t = axpy_tensor(client, &self.adj_t, terms.iter().map(|&(c, k)| (c, &k.adj_t)))?;
        let adj_params = self
            .adj_params
            .iter()
            .enumerate()
            .map(|(i, p)| axpy_tensor(client, p, terms.iter().map(|&(c, k)| (c, &k.adj_params[i]))))
            .collect::<Result<Vec<_>>>()?;

        Ok(AugmentedState {
            y,
            adj_y,
            adj_t,
            adj_params,
        })
    }

    fn alias(&self) -> Self {
        self.clone()
    }

    fn components(&self) -> Vec<&Tensor<R>> {
        let mut parts = vec![&self.y, &self.adj_y, &self.adj_t];
        parts.extend(self.adj_params.iter());
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    fn filled(device: &CpuDevice, value: f64) -> AugmentedState<CpuRuntime> {
        let t = |v: f64| Tensor::<CpuRuntime>::from_slice(&[v], &[1], device);
        AugmentedState {
            y: t(value),
            adj_y: t(2.0 * value),
            adj_t: t(3.0 * value),
            adj_params: vec![t(4.0 * value), t(5.0 * value)],
        }
    }

    #[test]
    fn test_augmented_axpy() {
        let (device, client) = setup();

        let base = filled(&device, 1.0);
        let k = filled(&device, 10.0);

        let out = OdeState::<CpuRuntime, CpuClient>::axpy(&base, &[(0.1, &k)], &client).unwrap();
        let components = OdeState::<CpuRuntime, CpuClient>::components(&out);
        let values: Vec<f64> = components
            .iter()
            .map(|c| c.to_vec::<f64>()[0])
            .collect();

        // base + 0.1 * 10 * base
        for (v, expected) in values.iter().zip([2.0, 4.0, 6.0, 8.0, 10.0]) {
            assert!((v - expected).abs() < 1e-12);
        }
        assert_eq!(components.len(), 5);
    }
}
