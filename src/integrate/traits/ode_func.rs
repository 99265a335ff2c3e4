//! Right-hand-side contract for the ODE solvers.
//!
//! # Example
//!
//! ```ignore
//! use numr::autograd::{Var, var_mul};
//! use solvr_cde::integrate::traits::OdeFn;
//! use solvr_cde::ParameterSet;
//!
//! // dy/dt = w * y
//! let w = Var::new(Tensor::from_slice(&[-0.5f64], &[1], &device), true);
//! let func = OdeFn::new(|_t, y, params: &ParameterSet<CpuRuntime>, c: &CpuClient| {
//!     var_mul(params.require("w")?, y, c)
//! })
//! .with_parameters(ParameterSet::new().with("w", &w));
//! ```

use std::marker::PhantomData;

use numr::autograd::Var;
use numr::error::Result;
use numr::runtime::Runtime;

use crate::common::ParameterSet;

/// Right-hand side f(t, y, θ) of an ODE dy/dt = f(t, y, θ).
///
/// The solver hands every evaluation the parameter set it should use. The
/// direct solver passes the caller's own parameters; the adjoint solver passes
/// fresh leaves so it can take vector-Jacobian products with respect to them.
/// Implementations must therefore read their differentiable inputs from
/// `params` rather than capturing them.
pub trait OdeFunc<R: Runtime, C> {
    /// Evaluate dy/dt.
    ///
    /// # Arguments
    /// * `t` - Current time, shape `[1]`
    /// * `y` - Current state
    /// * `params` - Parameters to evaluate with (same names as [`OdeFunc::parameters`])
    /// * `client` - Runtime client
    fn eval(&self, t: &Var<R>, y: &Var<R>, params: &ParameterSet<R>, client: &C)
    -> Result<Var<R>>;

    /// The differentiable parameters of f, in a stable order.
    fn parameters(&self) -> ParameterSet<R>;
}

/// Wrapper for closure-based right-hand sides.
///
/// Allows using closures as [`OdeFunc`]s without defining a struct.
pub struct OdeFn<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    f: F,
    params: ParameterSet<R>,
    _marker: PhantomData<C>,
}

impl<R, C, F> OdeFn<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    /// Create a new right-hand side from a closure, with no parameters.
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

impl<R, C, F> OdeFunc<R, C> for OdeFn<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    fn eval(
        &self,
        t: &Var<R>,
        y: &Var<R>,
        params: &ParameterSet<R>,
        client: &C,
    ) -> Result<Var<R>> {
        (self.f)(t, y, params, client)
    }

    fn parameters(&self) -> ParameterSet<R> {
        self.params.clone()
    }
}
