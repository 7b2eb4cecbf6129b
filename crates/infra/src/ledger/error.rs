use thiserror::Error;

use stockledger_core::DomainError;

use crate::store::StoreError;

/// Why a ledger operation did not commit.
///
/// Every rejection leaves stock, records and the activity log exactly as they
/// were before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store could not complete the transaction. Never retried here.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The store rejected a write as stale or duplicate.
    #[error("write conflict: {0}")]
    Conflict(String),
}

impl LedgerError {
    /// Stable, wire-level name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Domain(err) => err.kind(),
            LedgerError::StorageUnavailable(_) => "StorageUnavailable",
            LedgerError::Conflict(_) => "Conflict",
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => LedgerError::Conflict(msg),
            StoreError::Unavailable(msg) => LedgerError::StorageUnavailable(msg),
            StoreError::Corrupt(msg) => LedgerError::StorageUnavailable(format!("corrupt record: {msg}")),
            StoreError::OutOfRange(msg) => LedgerError::Domain(DomainError::validation(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::MaterialId;

    #[test]
    fn kinds_follow_the_wire_names() {
        let stock = LedgerError::from(DomainError::InsufficientStock {
            material_id: MaterialId::new(),
            requested: 3,
            available: 2,
        });
        assert_eq!(stock.kind(), "InsufficientStock");
        assert_eq!(
            LedgerError::from(StoreError::Unavailable("disk full".into())).kind(),
            "StorageUnavailable"
        );
        assert_eq!(LedgerError::from(StoreError::Conflict("stale".into())).kind(), "Conflict");
        assert_eq!(
            LedgerError::from(StoreError::Corrupt("bad json".into())).kind(),
            "StorageUnavailable"
        );
        assert_eq!(
            LedgerError::from(StoreError::OutOfRange("debt overflow".into())).kind(),
            "Validation"
        );
    }
}
