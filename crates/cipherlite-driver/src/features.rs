//! Capabilities reported to the host abstraction.

/// A capability a host may ask about through `Connection::has_feature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverFeature {
    Transactions,
    QuerySize,
    Blob,
    Unicode,
    PreparedQueries,
    NamedPlaceholders,
    PositionalPlaceholders,
    LastInsertId,
    BatchOperations,
    SimpleLocking,
    LowPrecisionNumbers,
    EventNotifications,
    FinishQuery,
    MultipleResultSets,
    CancelQuery,
}

impl DriverFeature {
    pub const ALL: [DriverFeature; 15] = [
        Self::Transactions,
        Self::QuerySize,
        Self::Blob,
        Self::Unicode,
        Self::PreparedQueries,
        Self::NamedPlaceholders,
        Self::PositionalPlaceholders,
        Self::LastInsertId,
        Self::BatchOperations,
        Self::SimpleLocking,
        Self::LowPrecisionNumbers,
        Self::EventNotifications,
        Self::FinishQuery,
        Self::MultipleResultSets,
        Self::CancelQuery,
    ];

    /// Static answer; does not depend on the open database.
    pub fn is_supported(self) -> bool {
        match self {
            Self::Transactions
            | Self::Blob
            | Self::Unicode
            | Self::PreparedQueries
            | Self::NamedPlaceholders
            | Self::PositionalPlaceholders
            | Self::LastInsertId
            | Self::SimpleLocking
            | Self::LowPrecisionNumbers
            | Self::EventNotifications
            | Self::FinishQuery => true,
            // Row counts are unknown before a full scan, and batches are
            // emulated by `SqlResult::execute_batch`.
            Self::QuerySize
            | Self::BatchOperations
            | Self::MultipleResultSets
            | Self::CancelQuery => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_features() {
        let unsupported: Vec<_> = DriverFeature::ALL
            .into_iter()
            .filter(|f| !f.is_supported())
            .collect();
        assert_eq!(
            unsupported,
            vec![
                DriverFeature::QuerySize,
                DriverFeature::BatchOperations,
                DriverFeature::MultipleResultSets,
                DriverFeature::CancelQuery,
            ]
        );
    }
}
