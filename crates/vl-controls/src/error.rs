//! Error types for control system operations.

use thiserror::Error;
use vl_core::CoreError;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in control system operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Controller family name not one of P, PI, PID.
    #[error("Invalid controller family '{name}': choose between 'P', 'PI' or 'PID'")]
    UnknownFamily { name: String },

    /// Backend name not recognised.
    #[error("Invalid controller backend '{name}': choose between 'discrete' or 'continuous'")]
    UnknownBackend { name: String },

    /// Transfer function numerator has higher degree than its denominator.
    #[error("Improper transfer function: numerator degree {num_degree} > denominator degree {den_degree}")]
    Improper {
        num_degree: usize,
        den_degree: usize,
    },

    /// Time grid is unusable (too short, not increasing, length mismatch).
    #[error("Invalid time grid: {what}")]
    InvalidGrid { what: &'static str },

    /// Numerical breakdown during a response computation.
    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
