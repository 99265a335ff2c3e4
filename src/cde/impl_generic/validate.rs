//! Up-front checks run by `cdeint` before any integration work.

use numr::autograd::Var;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};

use crate::cde::error::{CdeError, CdeResult, ShapeSource, batch_dims};
use crate::cde::traits::{ControlPath, VectorField};
use crate::common::{ParameterSet, time_var};
use crate::integrate::impl_generic::ode::grid_times;

/// Host copy of a valid time grid.
pub(crate) fn check_time_grid<R: Runtime>(t: &Var<R>) -> CdeResult<Vec<f64>> {
    grid_times(t.tensor(), "cdeint").map_err(|err| CdeError::InvalidTimeGrid {
        reason: err.to_string(),
    })
}

/// Evaluate dX/dt at `t0` and f(z0) once, returning their shapes.
///
/// Every input, parameters included, is detached, so the trial evaluation never
/// becomes part of an autograd graph.
pub(crate) fn trial_shapes<R, C, P, V>(
    client: &C,
    path: &P,
    func: &V,
    z0: &Var<R>,
    t0: f64,
    params: &ParameterSet<R>,
) -> CdeResult<(Vec<usize>, Vec<usize>)>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
    P: ControlPath<R, C> + ?Sized,
    V: VectorField<R, C> + ?Sized,
{
    let params = params.detached();
    let z0 = z0.detach();
    let t = time_var::<R>(t0, false, z0.tensor().dtype(), z0.tensor().device());

    let control_gradient = path.derivative(&t, &params, client)?;
    let vector_field = func.evaluate(&z0, &params, client)?;

    Ok((
        control_gradient.tensor().shape().to_vec(),
        vector_field.tensor().shape().to_vec(),
    ))
}

/// Check that z0 `[..., H]`, dX/dt `[..., I]` and f(z0) `[..., H, I]` agree.
///
/// Checks run in order: batch dimensions of the derivative, then of the
/// vector field, then hidden channels, then input channels.
pub(crate) fn check_shapes(
    z0_shape: &[usize],
    control_shape: &[usize],
    func_shape: &[usize],
) -> CdeResult<()> {
    let rank_error = |source, shape: &[usize], min_rank| CdeError::RankMismatch {
        source,
        shape: shape.to_vec(),
        min_rank,
    };

    if z0_shape.is_empty() {
        return Err(rank_error(ShapeSource::InitialState, z0_shape, 1));
    }
    if control_shape.is_empty() {
        return Err(rank_error(ShapeSource::ControlDerivative, control_shape, 1));
    }

    let z0_batch = batch_dims(z0_shape, 1);

    if batch_dims(control_shape, 1) != z0_batch {
        return Err(CdeError::BatchMismatch {
            source: ShapeSource::ControlDerivative,
            shape: control_shape.to_vec(),
            z0_shape: z0_shape.to_vec(),
        });
    }

    if func_shape.len() < 2 {
        return Err(rank_error(ShapeSource::VectorField, func_shape, 2));
    }

    if batch_dims(func_shape, 2) != z0_batch {
        return Err(CdeError::BatchMismatch {
            source: ShapeSource::VectorField,
            shape: func_shape.to_vec(),
            z0_shape: z0_shape.to_vec(),
        });
    }

    let rank = func_shape.len();
    if func_shape[rank - 2] != z0_shape[z0_shape.len() - 1] {
        return Err(CdeError::HiddenChannelMismatch {
            func_shape: func_shape.to_vec(),
            z0_shape: z0_shape.to_vec(),
        });
    }

    if func_shape[rank - 1] != control_shape[control_shape.len() - 1] {
        return Err(CdeError::InputChannelMismatch {
            func_shape: func_shape.to_vec(),
            control_shape: control_shape.to_vec(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::runtime::cpu::{CpuDevice, CpuRuntime};
    use numr::tensor::Tensor;

    #[test]
    fn test_well_formed_shapes() {
        assert!(check_shapes(&[4, 3], &[4, 2], &[4, 3, 2]).is_ok());
        // No batch dimensions
        assert!(check_shapes(&[3], &[2], &[3, 2]).is_ok());
        // Several batch dimensions
        assert!(check_shapes(&[5, 4, 3], &[5, 4, 2], &[5, 4, 3, 2]).is_ok());
    }

    #[test]
    fn test_control_batch_checked_first() {
        // Everything is wrong, but the derivative's batch is reported
        let err = check_shapes(&[4, 3], &[5, 2], &[6, 7, 8]).unwrap_err();
        assert!(matches!(
            err,
            CdeError::BatchMismatch {
                source: ShapeSource::ControlDerivative,
                ..
            }
        ));
    }

    #[test]
    fn test_vector_field_batch() {
        let err = check_shapes(&[4, 3], &[4, 2], &[5, 3, 2]).unwrap_err();
        assert!(matches!(
            err,
            CdeError::BatchMismatch {
                source: ShapeSource::VectorField,
                ..
            }
        ));
    }

    #[test]
    fn test_hidden_channels() {
        let err = check_shapes(&[4, 3], &[4, 2], &[4, 5, 2]).unwrap_err();
        assert!(matches!(err, CdeError::HiddenChannelMismatch { .. }));

        let msg = err.to_string();
        assert!(msg.contains("[4, 5, 2]") && msg.contains("[4, 3]"));
        assert!(msg.contains("5 channels") && msg.contains("3 channels"));
    }

    #[test]
    fn test_input_channels() {
        let err = check_shapes(&[4, 3], &[4, 2], &[4, 3, 4]).unwrap_err();
        assert!(matches!(err, CdeError::InputChannelMismatch { .. }));

        let msg = err.to_string();
        assert!(msg.contains("[4, 3, 4]") && msg.contains("[4, 2]"));
    }

    #[test]
    fn test_rank_problems() {
        assert!(matches!(
            check_shapes(&[], &[2], &[3, 2]),
            Err(CdeError::RankMismatch {
                source: ShapeSource::InitialState,
                ..
            })
        ));
        assert!(matches!(
            check_shapes(&[3], &[], &[3, 2]),
            Err(CdeError::RankMismatch {
                source: ShapeSource::ControlDerivative,
                ..
            })
        ));
        assert!(matches!(
            check_shapes(&[3], &[2], &[3]),
            Err(CdeError::RankMismatch {
                source: ShapeSource::VectorField,
                min_rank: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_time_grid() {
        let device = CpuDevice::new();
        let var = |values: &[f64], shape: &[usize]| {
            Var::new(Tensor::<CpuRuntime>::from_slice(values, shape, &device), false)
        };

        assert_eq!(check_time_grid(&var(&[0.0, 1.0], &[2])).unwrap(), vec![0.0, 1.0]);
        assert_eq!(check_time_grid(&var(&[1.0, 0.0], &[2])).unwrap(), vec![1.0, 0.0]);

        for bad in [
            var(&[], &[0]),
            var(&[0.0, 0.0], &[2]),
            var(&[0.0, 2.0, 1.0], &[3]),
            var(&[0.0, f64::NAN], &[2]),
            var(&[0.0, 1.0], &[1, 2]),
        ] {
            assert!(matches!(
                check_time_grid(&bad),
                Err(CdeError::InvalidTimeGrid { .. })
            ));
        }
    }

    #[test]
    fn test_time_grid_dtypes() {
        let device = CpuDevice::new();

        let single = Var::new(
            Tensor::<CpuRuntime>::from_slice(&[0.0f32, 0.5, 2.0], &[3], &device),
            false,
        );
        assert_eq!(check_time_grid(&single).unwrap(), vec![0.0, 0.5, 2.0]);

        let steps = Var::new(Tensor::<CpuRuntime>::from_slice(&[0i32, 1, 2], &[3], &device), false);
        assert!(matches!(
            check_time_grid(&steps),
            Err(CdeError::InvalidTimeGrid { .. })
        ));
    }
}
