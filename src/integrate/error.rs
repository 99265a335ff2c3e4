//! Error types for ODE integration.

use std::fmt;

/// Result type for integration operations.
pub type IntegrateResult<T> = Result<T, IntegrateError>;

/// Errors that can occur during ODE integration.
#[derive(Debug, Clone)]
pub enum IntegrateError {
    /// Invalid interval or time grid (e.g., empty or non-monotonic).
    InvalidInterval { a: f64, b: f64, context: String },

    /// Invalid parameter value.
    InvalidParameter { parameter: String, message: String },

    /// Numerical computation failed (e.g., NaN or infinite error estimate).
    NumericalError { message: String },

    /// Invalid input array size or dimensions.
    InvalidInput { context: String },

    /// Step size became too small during adaptive integration.
    StepSizeTooSmall { step: f64, t: f64, context: String },

    /// Maximum number of steps exceeded.
    MaxStepsExceeded {
        steps: usize,
        t: f64,
        context: String,
    },

    /// Error from underlying numr operation.
    NumrError(String),
}

impl fmt::Display for IntegrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInterval { a, b, context } => {
                write!(
                    f,
                    "Invalid interval [{}, {}] in {}: bounds must be finite and distinct",
                    a, b, context
                )
            }
            Self::InvalidParameter { parameter, message } => {
                write!(f, "Invalid parameter '{}': {}", parameter, message)
            }
            Self::NumericalError { message } => {
                write!(f, "Numerical error: {}", message)
            }
            Self::InvalidInput { context } => {
                write!(f, "Invalid input: {}", context)
            }
            Self::StepSizeTooSmall { step, t, context } => {
                write!(
                    f,
                    "{}: step size {:.2e} too small at t = {:.6}",
                    context, step, t
                )
            }
            Self::MaxStepsExceeded { steps, t, context } => {
                write!(
                    f,
                    "{}: exceeded maximum {} steps at t = {:.6}",
                    context, steps, t
                )
            }
            Self::NumrError(msg) => {
                write!(f, "numr error: {}", msg)
            }
        }
    }
}

impl std::error::Error for IntegrateError {}

impl From<numr::error::Error> for IntegrateError {
    fn from(err: numr::error::Error) -> Self {
        Self::NumrError(err.to_string())
    }
}
