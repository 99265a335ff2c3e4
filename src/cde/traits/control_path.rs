//! Control path contract.

use std::marker::PhantomData;

use numr::autograd::Var;
use numr::error::Result;
use numr::runtime::Runtime;

use crate::common::ParameterSet;

/// A continuous, differentiable control path X driving a CDE.
///
/// Paths are typically interpolants (cubic splines and the like) built by the
/// caller from observed data. Their coefficients are usually *computed* from
/// leaf tensors, so they are non-leaf `Var`s. Such tensors must be registered
/// through [`ControlPath::computed_parameters`] and read back from `params` in
/// [`ControlPath::derivative`], otherwise the adjoint pass cannot produce
/// gradients for them.
///
/// # Warning
///
/// Piecewise-linear paths have a derivative that is piecewise constant in t,
/// so its own time derivative is not defined at the knots. Using them with
/// adjoint mode while the time grid requires grad gives meaningless time
/// gradients.
pub trait ControlPath<R: Runtime, C> {
    /// dX/dt at time `t`, shape `[..., input_channels]`.
    ///
    /// # Arguments
    /// * `t` - Time, shape `[1]`
    /// * `params` - Parameters to evaluate with; contains every entry of
    ///   [`ControlPath::computed_parameters`] under the same name
    /// * `client` - Runtime client
    fn derivative(&self, t: &Var<R>, params: &ParameterSet<R>, client: &C) -> Result<Var<R>>;

    /// Non-leaf tensors the derivative depends on.
    fn computed_parameters(&self) -> ParameterSet<R> {
        ParameterSet::new()
    }
}

/// Closure-based control path.
pub struct FnControlPath<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    f: F,
    params: ParameterSet<R>,
    _marker: PhantomData<C>,
}

impl<R, C, F> FnControlPath<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    /// Wrap a closure `(t, params, client) -> dX/dt`.
    pub fn new(f: F) -> Self {
        Self {
            f,
            params: ParameterSet::new(),
            _marker: PhantomData,
        }
    }

    /// Register the computed parameters the closure reads.
    pub fn with_computed_parameters(mut self, params: ParameterSet<R>) -> Self {
        self.params = params;
        self
    }
}

impl<R, C, F> ControlPath<R, C> for FnControlPath<R, C, F>
where
    R: Runtime,
    F: Fn(&Var<R>, &ParameterSet<R>, &C) -> Result<Var<R>>,
{
    fn derivative(&self, t: &Var<R>, params: &ParameterSet<R>, client: &C) -> Result<Var<R>> {
        (self.f)(t, params, client)
    }

    fn computed_parameters(&self) -> ParameterSet<R> {
        self.params.clone()
    }
}
