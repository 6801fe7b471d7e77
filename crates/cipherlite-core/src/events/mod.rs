//! Change notifications delivered to subscribers.

use serde::{Deserialize, Serialize};

/// One event produced by the notification bridge.
///
/// Every change to a subscribed table yields a `TableChanged` followed by a
/// `RowChanged` for the same table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notification {
    TableChanged { table: String },
    RowChanged { table: String, row_id: i64 },
}

impl Notification {
    pub fn table(&self) -> &str {
        match self {
            Self::TableChanged { table } | Self::RowChanged { table, .. } => table,
        }
    }

    pub fn row_id(&self) -> Option<i64> {
        match self {
            Self::RowChanged { row_id, .. } => Some(*row_id),
            Self::TableChanged { .. } => None,
        }
    }
}
