//! Transactional persistence for the ledger.
//!
//! Every ledger operation runs inside one [`LedgerTransaction`]: reads and
//! writes staged through it become visible together on `commit`, or not at
//! all when the transaction is dropped.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, LedgerTransaction, MaterialReferences, StoreError};
pub use sqlite::SqliteLedgerStore;

use stockledger_inventory::MaterialDetails;

/// Key under which two materials count as the same item of stock: trimmed,
/// case-folded name and supplier plus the width class. An absent supplier
/// matches only another absent supplier.
pub(crate) fn identity_key(details: &MaterialDetails) -> (String, &'static str, String) {
    (
        details.name.trim().to_lowercase(),
        details.kind.as_str(),
        details
            .supplier
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default(),
    )
}
