//! Error types for the vl-app service layer.

use std::path::PathBuf;

/// Application error type shared by every front-end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Failed to write scenario file: {path}")]
    ScenarioFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Scenario validation failed: {0}")]
    Validation(String),

    #[error("Runtime construction failed: {0}")]
    Runtime(String),

    #[error("Tuning error: {0}")]
    Tuning(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for vl-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<vl_project::ProjectError> for AppError {
    fn from(err: vl_project::ProjectError) -> Self {
        match err {
            vl_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Scenario(other.to_string()),
        }
    }
}

impl From<vl_project::ValidationError> for AppError {
    fn from(err: vl_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<vl_controls::ControlError> for AppError {
    fn from(err: vl_controls::ControlError) -> Self {
        AppError::Runtime(err.to_string())
    }
}

impl From<vl_tuning::TuningError> for AppError {
    fn from(err: vl_tuning::TuningError) -> Self {
        AppError::Tuning(err.to_string())
    }
}

impl From<vl_sim::SimError> for AppError {
    fn from(err: vl_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<vl_results::ResultsError> for AppError {
    fn from(err: vl_results::ResultsError) -> Self {
        match err {
            vl_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
