//! CDE traits and types.

mod cdeint;
mod control_path;
mod types;
mod vector_field;

pub use cdeint::CdeAlgorithms;
pub use control_path::{ControlPath, FnControlPath};
pub use types::{CdeGradients, CdeOptions, DetachPolicy};
pub use vector_field::{FnVectorField, VectorField};
