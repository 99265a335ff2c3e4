//! Error types for CDE solving.

use std::fmt;

use crate::integrate::IntegrateError;

/// Result type for CDE operations.
pub type CdeResult<T> = Result<T, CdeError>;

/// Tensor whose shape is being checked against z0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeSource {
    /// The initial state z0.
    InitialState,
    /// dX/dt returned by the control path.
    ControlDerivative,
    /// f(z) returned by the vector field.
    VectorField,
}

impl fmt::Display for ShapeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitialState => write!(f, "z0"),
            Self::ControlDerivative => write!(f, "control path derivative"),
            Self::VectorField => write!(f, "vector field"),
        }
    }
}

/// Errors that can occur while solving a CDE.
#[derive(Debug, Clone)]
pub enum CdeError {
    /// Batch dimensions of the control derivative or vector field differ from z0's.
    BatchMismatch {
        source: ShapeSource,
        shape: Vec<usize>,
        z0_shape: Vec<usize>,
    },

    /// Vector field's hidden channels (second-to-last dim) differ from z0's channels.
    HiddenChannelMismatch {
        func_shape: Vec<usize>,
        z0_shape: Vec<usize>,
    },

    /// Vector field's input channels (last dim) differ from the control derivative's.
    InputChannelMismatch {
        func_shape: Vec<usize>,
        control_shape: Vec<usize>,
    },

    /// A tensor has too few dimensions to carry its channels.
    RankMismatch {
        source: ShapeSource,
        shape: Vec<usize>,
        min_rank: usize,
    },

    /// Time grid is not a non-empty, finite, strictly monotonic 1-D sequence.
    InvalidTimeGrid { reason: String },

    /// The vector field and control path register the same parameter name.
    DuplicateParameter { name: String },

    /// Output gradients handed to a backward pass do not match the solution.
    InvalidGradient { context: String },

    /// Error raised by the ODE solver, surfaced unchanged.
    Integration(IntegrateError),

    /// Error from a numr operation outside the solver.
    Numr(String),
}

/// Leading dimensions of `shape`, leaving `channel_dims` trailing ones.
pub(crate) fn batch_dims(shape: &[usize], channel_dims: usize) -> &[usize] {
    &shape[..shape.len().saturating_sub(channel_dims)]
}

/// Size of the `k`-th dimension counted from the end (1 = last), or 0.
fn dim_from_end(shape: &[usize], k: usize) -> usize {
    shape.len().checked_sub(k).map_or(0, |i| shape[i])
}

impl fmt::Display for CdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatchMismatch {
                source,
                shape,
                z0_shape,
            } => {
                // The vector field carries two channel dims, everything else one.
                let channel_dims = if *source == ShapeSource::VectorField { 2 } else { 1 };
                write!(
                    f,
                    "{} does not have the same batch dimensions as z0: {} has shape {:?} \
                     (meaning batch dimensions {:?}), whilst z0 has shape {:?} \
                     (meaning batch dimensions {:?})",
                    source,
                    source,
                    shape,
                    batch_dims(shape, channel_dims),
                    z0_shape,
                    batch_dims(z0_shape, 1)
                )
            }
            Self::HiddenChannelMismatch {
                func_shape,
                z0_shape,
            } => {
                write!(
                    f,
                    "vector field does not have the same number of hidden channels as z0: \
                     vector field has shape {:?} (meaning {} channels), whilst z0 has shape \
                     {:?} (meaning {} channels)",
                    func_shape,
                    dim_from_end(func_shape, 2),
                    z0_shape,
                    dim_from_end(z0_shape, 1)
                )
            }
            Self::InputChannelMismatch {
                func_shape,
                control_shape,
            } => {
                write!(
                    f,
                    "vector field does not have the same number of input channels as the \
                     control path derivative: vector field has shape {:?} (meaning {} channels), \
                     whilst the derivative has shape {:?} (meaning {} channels)",
                    func_shape,
                    dim_from_end(func_shape, 1),
                    control_shape,
                    dim_from_end(control_shape, 1)
                )
            }
            Self::RankMismatch {
                source,
                shape,
                min_rank,
            } => {
                write!(
                    f,
                    "{} must have at least {} dimension(s), got shape {:?}",
                    source, min_rank, shape
                )
            }
            Self::InvalidTimeGrid { reason } => {
                write!(f, "Invalid time grid: {}", reason)
            }
            Self::DuplicateParameter { name } => {
                write!(
                    f,
                    "parameter '{}' is registered by both the vector field and the control path",
                    name
                )
            }
            Self::InvalidGradient { context } => {
                write!(f, "Invalid output gradients: {}", context)
            }
            Self::Integration(err) => write!(f, "{}", err),
            Self::Numr(msg) => write!(f, "numr error: {}", msg),
        }
    }
}

impl std::error::Error for CdeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Integration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IntegrateError> for CdeError {
    fn from(err: IntegrateError) -> Self {
        Self::Integration(err)
    }
}

impl From<numr::error::Error> for CdeError {
    fn from(err: numr::error::Error) -> Self {
        Self::Numr(err.to_string())
    }
}
