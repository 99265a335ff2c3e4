//! Presents a CDE as an ODE right-hand side.
//!
//! The CDE `dz = f(z) dX` is driven by a differentiable path, so it is
//! equivalent to the ODE `dz/dt = f(z) · dX/dt`. [`VectorFieldAdaptor`]
//! computes that product for the solver, one stage at a time.

use std::marker::PhantomData;

use numr::autograd::ops::var_reshape;
use numr::autograd::{Var, var_mul, var_sum};
use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};

use crate::cde::error::{CdeError, CdeResult};
use crate::cde::traits::{ControlPath, DetachPolicy, VectorField};
use crate::common::ParameterSet;
use crate::integrate::OdeFunc;

/// `f(z) · dX/dt` as an [`OdeFunc`].
///
/// Holds borrowed references to the control path and the vector field for the
/// duration of one integration call (and of the backward pass that follows).
pub struct VectorFieldAdaptor<'a, R, C, P, V>
where
    R: Runtime,
    P: ?Sized,
    V: ?Sized,
{
    path: &'a P,
    func: &'a V,
    policy: DetachPolicy,
    parameters: ParameterSet<R>,
    _marker: PhantomData<fn(&C)>,
}

impl<'a, R, C, P, V> VectorFieldAdaptor<'a, R, C, P, V>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
    P: ControlPath<R, C> + ?Sized,
    V: VectorField<R, C> + ?Sized,
{
    /// Wrap `func` and `path`.
    ///
    /// The flags describe the caller's gradient requirements and fix the
    /// [`DetachPolicy`] for the adaptor's lifetime. The vector field's
    /// parameters and the path's computed parameters are collected once;
    /// a name registered by both is rejected.
    pub fn new(
        path: &'a P,
        func: &'a V,
        t_requires_grad: bool,
        z0_requires_grad: bool,
        adjoint: bool,
    ) -> CdeResult<Self> {
        let mut parameters = func.parameters();
        parameters.extend(path.computed_parameters());

        if let Some(name) = parameters.first_duplicate() {
            return Err(CdeError::DuplicateParameter {
                name: name.to_string(),
            });
        }

        Ok(Self {
            path,
            func,
            policy: DetachPolicy::new(t_requires_grad, z0_requires_grad, adjoint),
            parameters,
            _marker: PhantomData,
        })
    }

    /// The detachment policy in force.
    pub fn policy(&self) -> DetachPolicy {
        self.policy
    }

    /// The control path.
    pub fn path(&self) -> &'a P {
        self.path
    }

    /// The vector field.
    pub fn func(&self) -> &'a V {
        self.func
    }

    /// Evaluate `f(z) · dX/dt` at `(t, z)` with the given parameters.
    pub fn evaluate(
        &self,
        t: &Var<R>,
        z: &Var<R>,
        params: &ParameterSet<R>,
        client: &C,
    ) -> Result<Var<R>> {
        let detached_t;
        let t = if self.policy.detach_t {
            detached_t = t.detach();
            &detached_t
        } else {
            t
        };

        let detached_z;
        let z = if self.policy.detach_z {
            detached_z = z.detach();
            &detached_z
        } else {
            z
        };

        let control_gradient = self.path.derivative(t, params, client)?;
        let vector_field = self.func.evaluate(z, params, client)?;

        batched_matvec(&vector_field, &control_gradient, client)
    }
}

impl<R, C, P, V> OdeFunc<R, C> for VectorFieldAdaptor<'_, R, C, P, V>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R> + ScalarOps<R>,
    P: ControlPath<R, C> + ?Sized,
    V: VectorField<R, C> + ?Sized,
{
    fn eval(
        &self,
        t: &Var<R>,
        y: &Var<R>,
        params: &ParameterSet<R>,
        client: &C,
    ) -> Result<Var<R>> {
        self.evaluate(t, y, params, client)
    }

    fn parameters(&self) -> ParameterSet<R> {
        self.parameters.clone()
    }
}

/// `[..., H, I] × [..., I] → [..., H]`, contracting the last dimension.
///
/// The vector is viewed as `[..., 1, I]` so that the elementwise product
/// broadcasts over the hidden channels; summing over `I` completes the
/// contraction. Both operands stay on the autograd tape.
pub(crate) fn batched_matvec<R, C>(matrix: &Var<R>, vector: &Var<R>, client: &C) -> Result<Var<R>>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
    R::Client: TensorOps<R>,
{
    let vector_shape = vector.tensor().shape();
    let mut row_shape = vector_shape.to_vec();
    row_shape.insert(vector_shape.len().saturating_sub(1), 1);

    let row = var_reshape(vector, &row_shape)?;
    let product = var_mul(matrix, &row, client)?;
    let last = matrix.tensor().shape().len() - 1;
    var_sum(&product, &[last], false, client)
}
