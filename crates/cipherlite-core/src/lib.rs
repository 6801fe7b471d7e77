//! # cipherlite-core
//!
//! Foundation crate for the cipherlite driver.
//! Defines errors, connection options, value and column types, the
//! declared-type mapping, notification events and tracing setup.
//! The driver crate depends on this; nothing here touches the engine.

pub mod config;
pub mod errors;
pub mod events;
pub mod tracing;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::ConnectOptions;
pub use errors::error_code::ErrorCode;
pub use errors::{DriverError, DriverResult};
pub use events::Notification;
pub use types::column::Column;
pub use types::mapping::{classify, SemanticType, StorageTag};
pub use types::value::{NumericPrecision, Value};
