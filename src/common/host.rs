//! Host transfers for small tensors read at API boundaries.
//!
//! Time grids, scalar reductions and per-time gradients are tiny, so they are
//! moved through `to_vec()`/`from_slice()` as `f64` whatever the tensor's
//! floating-point dtype.

use numr::dtype::DType;
use numr::error::{Error, Result};
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Copy a floating-point tensor to the host as `f64`, in row-major order.
pub fn to_host<R: Runtime>(tensor: &Tensor<R>, op: &'static str) -> Result<Vec<f64>> {
    let dtype = tensor.dtype();
    let tensor_contig = tensor.contiguous();

    match dtype {
        DType::F32 => {
            let data: Vec<f32> = tensor_contig.to_vec();
            Ok(data.into_iter().map(f64::from).collect())
        }
        DType::F64 => Ok(tensor_contig.to_vec()),
        _ => Err(Error::UnsupportedDType { dtype, op }),
    }
}

/// Build a tensor of `dtype` from host `f64` values.
pub fn from_host<R: Runtime>(
    values: &[f64],
    shape: &[usize],
    dtype: DType,
    device: &R::Device,
    op: &'static str,
) -> Result<Tensor<R>> {
    match dtype {
        DType::F32 => {
            let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            Tensor::<R>::try_from_slice(&data, shape, device)
        }
        DType::F64 => Tensor::<R>::try_from_slice(values, shape, device),
        _ => Err(Error::UnsupportedDType { dtype, op }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::runtime::cpu::{CpuDevice, CpuRuntime};

    #[test]
    fn test_to_host_reads_f32_and_f64() {
        let device = CpuDevice::new();

        let t32 = Tensor::<CpuRuntime>::from_slice(&[0.0f32, 1.0, 2.5], &[3], &device);
        assert_eq!(to_host(&t32, "test").unwrap(), vec![0.0, 1.0, 2.5]);

        let t64 = Tensor::<CpuRuntime>::from_slice(&[0.0f64, -1.0], &[2], &device);
        assert_eq!(to_host(&t64, "test").unwrap(), vec![0.0, -1.0]);

        let ints = Tensor::<CpuRuntime>::from_slice(&[1i32, 2], &[2], &device);
        assert!(matches!(
            to_host(&ints, "test"),
            Err(Error::UnsupportedDType { .. })
        ));
    }

    #[test]
    fn test_from_host_keeps_dtype() {
        let device = CpuDevice::new();

        let t = from_host::<CpuRuntime>(&[0.5, 1.5], &[2], DType::F32, &device, "test").unwrap();
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.to_vec::<f32>(), vec![0.5, 1.5]);

        let t = from_host::<CpuRuntime>(&[0.5], &[1], DType::F64, &device, "test").unwrap();
        assert_eq!(t.dtype(), DType::F64);
        assert_eq!(t.to_vec::<f64>(), vec![0.5]);
    }
}
