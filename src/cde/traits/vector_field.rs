//! Vector field contract.
//!
//! # Example
//!
//! ```ignore
//! use numr::autograd::{Var, var_mul};
//! use solvr_cde::cde::FnVectorField;
//! use solvr_cde::ParameterSet;
//!
//! // f(z) = w ⊙ z[..., :, None], broadcast to [..., hidden, input]
//! let func = FnVectorField::new(|z, params: &ParameterSet<CpuRuntime>, c: &CpuClient| {
//!     my_linear_layer(z, params.require("weight")?, c)
//! })
//! .with_parameters(ParameterSet::new().with("weight", &weight));
//! ```

use std::marker::PhantomData;

use numr::autograd::Var;
use numr::error::Result;
use numr::runtime::Runtime;

use crate::common::ParameterSet;

/// The vector field f of a CDE, mapping z `[..., hidden]` to
/// `[..., hidden, input]`.
///
/// Learnable tensors must be listed by [`VectorField::parameters`] and read
/// from `params`, never captured: the adjoint pass substitutes its own leaves.
pub trait VectorField<R: Runtime, C> {
    /// Evaluate f(z).
    fn evaluate(&self, z: &Var<R>, params: &ParameterSet<R>, client: &C) -> Result<Var<R>>;

    /// Learnable parameters of f.
    fn parameters(&self) -> ParameterSet<R> {
        ParameterSet::new()
    }
}

/// Wrapper for closure-based vector fields.
pub struct FnVectorField<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    f: F,
    params: ParameterSet<R>,
    _marker: PhantomData<C>,
}

impl<R, C, F> FnVectorField<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    /// Create a vector field from a closure, with no parameters.
    pub fn new(f: F) -> Self {
        Self {
            f,
            params: ParameterSet::new(),
            _marker: PhantomData,
        }
    }

    /// Attach the parameters the closure reads.
    pub fn with_parameters(mut self, params: ParameterSet<R>) -> Self {
        self.params = params;
        self
    }
}

impl<R, C, F> VectorField<R, C> for FnVectorField<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    fn evaluate(&self, z: &Var<R>, params: &ParameterSet<R>, client: &C) -> Result<Var<R>> {
        (self.f)(z, params, client)
    }

    fn parameters(&self) -> ParameterSet<R> {
        self.params.clone()
    }
}
