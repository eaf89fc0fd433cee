//! Controllers and linear models for ventilator pressure control.
//!
//! - [`DiscreteController`]: the per-tick PI/PID recurrence with a clamped
//!   integrator.
//! - [`TransferFunction`] / [`StateSpace`]: SISO LTI models with exact
//!   sampled time responses, used by the tuners.
//! - [`ControllerBackend`]: one interface over the discrete recurrence and the
//!   resampled continuous PID.

pub mod backend;
pub mod controller;
pub mod error;
pub mod family;
pub mod lti;
pub mod response;

pub use backend::{
    BackendKind, ContinuousPid, ControllerBackend, DiscreteOptions, build_backend,
    pid_transfer_function,
};
pub use controller::{AntiWindup, ControllerState, DiscreteController, IntegratorBounds};
pub use error::{ControlError, ControlResult};
pub use family::{ControllerFamily, PidGains};
pub use lti::{StateSpace, TransferFunction};
pub use response::{
    TimeGrid, TimeResponse, default_step_grid, forced_response, peak, step_response,
};
