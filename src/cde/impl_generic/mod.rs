//! Generic CDE implementations using tensor operations.
//!
//! Everything here is written against numr's `Runtime` and client traits;
//! the backend modules only delegate.

mod adaptor;
mod cdeint;
mod solution;
mod validate;

pub use adaptor::VectorFieldAdaptor;
pub use cdeint::cdeint_impl;
pub use solution::CdeSolution;
