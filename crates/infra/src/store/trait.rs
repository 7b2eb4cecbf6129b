use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockledger_core::{CustomerId, ExpectedVersion, MaterialId, ProcessingRecordId, RollId, SaleId};
use stockledger_events::{ActivityLogEntry, EventEnvelope};
use stockledger_inventory::{Material, MaterialDetails, ProcessingRecord, Roll, Sale};
use stockledger_parties::Customer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write lost an optimistic concurrency or uniqueness check.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A write would push a stored amount past what its column can hold.
    #[error("out of range: {0}")]
    OutOfRange(String),
}

/// Records that still point at a material.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MaterialReferences {
    pub sales: usize,
    pub open_processing: usize,
}

impl MaterialReferences {
    pub fn is_empty(&self) -> bool {
        self.sales == 0 && self.open_processing == 0
    }
}

/// One atomic unit of ledger work.
///
/// Reads observe the transaction's own staged writes. Dropping a transaction
/// without calling [`commit`](LedgerTransaction::commit) discards everything
/// it staged.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn read_material(&mut self, id: MaterialId) -> Result<Option<Material>, StoreError>;

    /// Find a live material with the same name, kind and supplier.
    async fn find_material(&mut self, details: &MaterialDetails) -> Result<Option<MaterialId>, StoreError>;

    /// Persist a material's state.
    ///
    /// `expected` is the version the material had when it was read
    /// (`ExpectedVersion::New` for a first write). A mismatch fails with
    /// [`StoreError::Conflict`].
    async fn write_material(&mut self, material: &Material, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Remove a material together with its rolls and fully returned
    /// processing records.
    async fn delete_material(&mut self, id: MaterialId) -> Result<(), StoreError>;

    async fn material_references(&mut self, id: MaterialId) -> Result<MaterialReferences, StoreError>;

    async fn insert_roll(&mut self, roll: &Roll) -> Result<(), StoreError>;
    async fn read_roll(&mut self, id: RollId) -> Result<Option<Roll>, StoreError>;
    async fn update_roll(&mut self, roll: &Roll) -> Result<(), StoreError>;
    async fn delete_roll(&mut self, id: RollId) -> Result<(), StoreError>;

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError>;
    async fn read_sale(&mut self, id: SaleId) -> Result<Option<Sale>, StoreError>;
    async fn delete_sale(&mut self, id: SaleId) -> Result<(), StoreError>;

    async fn insert_processing(&mut self, record: &ProcessingRecord) -> Result<(), StoreError>;
    async fn read_processing(&mut self, id: ProcessingRecordId) -> Result<Option<ProcessingRecord>, StoreError>;
    async fn update_processing(&mut self, record: &ProcessingRecord) -> Result<(), StoreError>;

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), StoreError>;
    async fn read_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, StoreError>;
    /// Overwrite a customer's descriptive details. Debt is left untouched.
    async fn update_customer(&mut self, customer: &Customer) -> Result<(), StoreError>;
    async fn delete_customer(&mut self, id: CustomerId) -> Result<(), StoreError>;
    /// Add `amount` (possibly negative) to a customer's outstanding debt.
    /// A total that would overflow fails with [`StoreError::OutOfRange`].
    async fn charge_customer(&mut self, id: CustomerId, amount: i64) -> Result<(), StoreError>;

    /// Journal one committed material event. A second event with the same
    /// material and sequence number fails with [`StoreError::Conflict`].
    async fn append_event(&mut self, envelope: &EventEnvelope<JsonValue>) -> Result<(), StoreError>;

    async fn append_log(&mut self, entry: &ActivityLogEntry) -> Result<(), StoreError>;

    /// Make every staged write durable and visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Ledger storage backend.
///
/// Query methods read committed state only.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError>;

    async fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError>;
    /// Live materials, ordered by name.
    async fn materials(&self) -> Result<Vec<Material>, StoreError>;
    async fn roll(&self, id: RollId) -> Result<Option<Roll>, StoreError>;
    /// Rolls of one material, oldest first.
    async fn rolls(&self, material_id: MaterialId) -> Result<Vec<Roll>, StoreError>;
    async fn sale(&self, id: SaleId) -> Result<Option<Sale>, StoreError>;
    /// Sales, newest first.
    async fn sales(&self) -> Result<Vec<Sale>, StoreError>;
    async fn processing_record(&self, id: ProcessingRecordId) -> Result<Option<ProcessingRecord>, StoreError>;
    /// Processing records, newest first.
    async fn processing_records(&self) -> Result<Vec<ProcessingRecord>, StoreError>;
    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;
    /// Customers, ordered by name.
    async fn customers(&self) -> Result<Vec<Customer>, StoreError>;
    /// Journaled events of one material, in sequence order.
    async fn events(&self, material_id: MaterialId) -> Result<Vec<EventEnvelope<JsonValue>>, StoreError>;
    /// Up to `limit` activity entries, newest first.
    async fn activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError>;
}
