//! Core types for the disco simulation kernel.
//!
//! This crate holds the small vocabulary shared by the kernel and by the
//! collaborators that model code uses alongside it (random variates,
//! statistics collectors):
//!
//! - [`SimTime`]: a point on the simulated time axis
//! - [`InputError`]: malformed parameters handed to a collaborator

mod error;
mod time;

pub use error::InputError;
pub use time::{check_finite, check_non_negative, SimTime};
