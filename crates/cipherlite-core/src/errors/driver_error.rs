//! Driver-level errors.

use super::error_code::{self, ErrorCode};

/// Primary result code the engine reports for lock contention.
const ENGINE_BUSY: i32 = 5;

/// Errors surfaced by the connection manager and result adapters.
///
/// Every engine failure maps onto one of these. `code` fields carry the
/// engine's numeric result code where one exists.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("{context}: {message}")]
    Connection {
        context: String,
        message: String,
        code: Option<i32>,
    },

    #[error("{context}: {message} (code {code})")]
    Statement {
        context: String,
        message: String,
        code: i32,
    },

    #[error("Parameter count mismatch: statement expects {expected}, {supplied} supplied")]
    ParameterMismatch { expected: usize, supplied: usize },

    #[error("Unable to execute multiple statements at a time")]
    MultipleStatements,

    #[error("Unable to {operation} transaction: {message}")]
    Transaction {
        operation: &'static str,
        message: String,
    },

    #[error("Already subscribing to '{table}'")]
    AlreadySubscribed { table: String },

    #[error("Not subscribed to '{table}'")]
    NotSubscribed { table: String },

    #[error("Database not open")]
    NotOpen,
}

impl DriverError {
    pub fn connection(context: impl Into<String>, message: impl Into<String>, code: Option<i32>) -> Self {
        Self::Connection {
            context: context.into(),
            message: message.into(),
            code,
        }
    }

    pub fn statement(context: impl Into<String>, message: impl Into<String>, code: i32) -> Self {
        Self::Statement {
            context: context.into(),
            message: message.into(),
            code,
        }
    }

    /// Numeric engine code, when the failure came from the engine.
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Self::Connection { code, .. } => *code,
            Self::Statement { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the engine gave up waiting on a lock.
    pub fn is_busy(&self) -> bool {
        self.engine_code().is_some_and(|c| c & 0xff == ENGINE_BUSY)
    }
}

impl ErrorCode for DriverError {
    fn error_code(&self) -> &'static str {
        if self.is_busy() {
            return error_code::DB_BUSY;
        }
        match self {
            Self::Connection { .. } => error_code::CONNECTION_ERROR,
            Self::Statement { .. } => error_code::STATEMENT_ERROR,
            Self::ParameterMismatch { .. } => error_code::PARAMETER_MISMATCH,
            Self::MultipleStatements => error_code::MULTIPLE_STATEMENTS,
            Self::Transaction { .. } => error_code::TRANSACTION_ERROR,
            Self::AlreadySubscribed { .. } => error_code::ALREADY_SUBSCRIBED,
            Self::NotSubscribed { .. } => error_code::NOT_SUBSCRIBED,
            Self::NotOpen => error_code::NOT_OPEN,
        }
    }
}

/// Convenience type alias.
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_error_display_includes_code() {
        let err = DriverError::statement("Unable to fetch row", "UNIQUE constraint failed: t.id", 19);
        assert_eq!(
            err.to_string(),
            "Unable to fetch row: UNIQUE constraint failed: t.id (code 19)"
        );
        assert_eq!(err.error_code(), error_code::STATEMENT_ERROR);
        assert_eq!(err.engine_code(), Some(19));
    }

    #[test]
    fn extended_busy_codes_map_to_db_busy() {
        // SQLITE_BUSY_SNAPSHOT = 5 | (2 << 8)
        let err = DriverError::statement("Unable to fetch row", "database is locked", 517);
        assert!(err.is_busy());
        assert_eq!(err.error_code(), error_code::DB_BUSY);
    }

    #[test]
    fn non_engine_errors_have_no_code() {
        let err = DriverError::ParameterMismatch { expected: 2, supplied: 1 };
        assert_eq!(err.engine_code(), None);
        assert_eq!(err.error_code(), error_code::PARAMETER_MISMATCH);
        assert_eq!(DriverError::NotOpen.error_code(), error_code::NOT_OPEN);
    }
}
