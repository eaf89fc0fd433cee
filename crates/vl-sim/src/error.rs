//! Error types for plant construction and episode runs.

use thiserror::Error;
use vl_controls::ControlError;
use vl_core::CoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Parameters that are individually valid but inconsistent together.
    #[error("Invalid configuration: {what}")]
    InvalidConfiguration { what: String },

    #[error("Non-physical condition at tick {tick}: {what}")]
    NonPhysical { tick: u64, what: &'static str },

    #[error("Unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type SimResult<T> = Result<T, SimError>;
