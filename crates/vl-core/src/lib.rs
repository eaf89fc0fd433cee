//! vl-core: shared foundation for ventiloop.
//!
//! Contains:
//! - units (uom-derived conversion factors for the breathing circuit)
//! - numeric (Real + tolerances + float helpers + sampled derivatives)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
