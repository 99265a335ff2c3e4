//! Common utilities shared across solvr-cde modules.
//!
//! This module contains the infrastructure used by both the ODE solvers
//! (`integrate`) and the CDE layer (`cde`): named parameter sets that are
//! injected into every right-hand-side evaluation, the reverse-mode autograd
//! helpers that turn those evaluations into vector-Jacobian products, and
//! dtype-aware host transfers.

pub mod host;
pub mod jacobian;
pub mod parameters;

pub use host::{from_host, to_host};
pub use jacobian::{ParameterVjp, alias, sum_all, time_var, vjp_with_parameters};
pub use parameters::{GradientSet, ParameterSet};
