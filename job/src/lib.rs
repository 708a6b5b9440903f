//! Booking lifecycle automation job.
//!
//! Library half of the `booking-automation` binary: configuration loading,
//! collaborator wiring and signal handling. The binary itself only
//! initializes logging, runs one pass and exits with the report's code.

pub mod boundary;
pub mod config;
pub mod shutdown;
pub mod wiring;

pub use boundary::exit_code_of;
pub use config::{ConfigError, JobConfig};
pub use shutdown::wait_for_signal;
pub use wiring::build_controller;
