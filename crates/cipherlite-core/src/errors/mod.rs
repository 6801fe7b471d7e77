//! Error types for the cipherlite driver.

pub mod driver_error;
pub mod error_code;

pub use driver_error::{DriverError, DriverResult};
