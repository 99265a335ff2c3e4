//! Type definitions for adjoint backpropagation.

mod types;

pub use types::{AdjointGradients, AdjointOptions, AugmentedState};
