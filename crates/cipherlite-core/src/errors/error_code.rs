//! Stable string codes for driver errors.
//!
//! Hosts that surface errors across a process or language boundary match on
//! these instead of on `Display` text.

pub const CONNECTION_ERROR: &str = "CONNECTION_ERROR";
pub const STATEMENT_ERROR: &str = "STATEMENT_ERROR";
pub const PARAMETER_MISMATCH: &str = "PARAMETER_MISMATCH";
pub const MULTIPLE_STATEMENTS: &str = "MULTIPLE_STATEMENTS";
pub const TRANSACTION_ERROR: &str = "TRANSACTION_ERROR";
pub const ALREADY_SUBSCRIBED: &str = "ALREADY_SUBSCRIBED";
pub const NOT_SUBSCRIBED: &str = "NOT_SUBSCRIBED";
pub const NOT_OPEN: &str = "NOT_OPEN";
pub const DB_BUSY: &str = "DB_BUSY";

/// Maps an error to its stable code.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}
