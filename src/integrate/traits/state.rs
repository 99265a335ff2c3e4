//! State abstraction for the explicit Runge-Kutta driver.

use numr::error::Result;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// A value the Runge-Kutta driver can integrate.
///
/// The driver only ever forms linear combinations of states and inspects
/// their component tensors for error control, so the same stepper serves
/// autograd variables (direct mode) and the augmented adjoint system.
pub trait OdeState<R: Runtime, C>: Sized {
    /// `self + Σ cᵢ · kᵢ`. Terms with a zero coefficient are skipped.
    fn axpy(&self, terms: &[(f64, &Self)], client: &C) -> Result<Self>;

    /// Another handle to the same state.
    ///
    /// For autograd variables the handle keeps the variable's identity, so
    /// the reported states can be looked up in a gradient store.
    fn alias(&self) -> Self;

    /// Component tensors, in a fixed order shared by every state of one solve.
    fn components(&self) -> Vec<&Tensor<R>>;
}
