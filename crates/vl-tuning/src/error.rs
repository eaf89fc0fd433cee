//! Error types for controller tuning.

use thiserror::Error;
use vl_controls::ControlError;
use vl_core::CoreError;

pub type TuningResult<T> = Result<T, TuningError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TuningError {
    /// The step response never changes concavity.
    #[error("Step response has no inflection point; the reaction-curve method needs an S-shaped response")]
    NoInflection,

    #[error("Tangent at the inflection point has zero slope (t = {time})")]
    ZeroSlope { time: f64 },

    /// Tangent geometry that gives no usable dead time or time constant.
    #[error("Degenerate reaction curve: {what}")]
    DegenerateCurve { what: String },

    #[error("Invalid tuning method '{name}': choose between 'ZN', 'Nelder-Mead' or 'BFGS'")]
    UnknownMethod { name: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
