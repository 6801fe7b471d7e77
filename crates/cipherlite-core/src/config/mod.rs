//! Connection configuration.

pub mod connect_options;

pub use connect_options::{ConnectOptions, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_REGEXP_CACHE_SIZE};
