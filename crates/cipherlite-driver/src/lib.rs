//! cipherlite-driver: SQL driver adapter over an encrypted (SQLCipher) SQLite
//! engine.
//!
//! - `Connection` opens and keys a database, runs catalog queries and
//!   transactions, and bridges change notifications.
//! - `SqlResult` drives one prepared statement: bind, execute, fetch.

pub mod connection;
pub mod features;
pub mod notify;
mod session;
pub mod statement;

pub use cipherlite_core::{
    ConnectOptions, Column, DriverError, DriverResult, ErrorCode, Notification, NumericPrecision,
    SemanticType, StorageTag, Value,
};
pub use connection::{escape_identifier, Connection, TableKind};
pub use features::DriverFeature;
pub use statement::{BoundValue, BoundValues, FetchStatus, ResultState, SqlResult};
