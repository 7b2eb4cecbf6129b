//! Read-only views over committed ledger state.

use stockledger_core::{CustomerId, DomainError, MaterialId};
use stockledger_events::{ActivityLogEntry, EventBus};
use stockledger_inventory::{Material, ProcessingRecord, Roll, Sale};
use stockledger_parties::Customer;

use super::{LedgerEnvelope, LedgerError, StockLedger};

impl<B> StockLedger<B>
where
    B: EventBus<LedgerEnvelope>,
{
    pub async fn material(&self, material_id: MaterialId) -> Result<Material, LedgerError> {
        self.store
            .material(material_id)
            .await?
            .ok_or_else(|| DomainError::UnknownMaterial(material_id).into())
    }

    pub async fn materials(&self) -> Result<Vec<Material>, LedgerError> {
        Ok(self.store.materials().await?)
    }

    pub async fn rolls(&self, material_id: MaterialId) -> Result<Vec<Roll>, LedgerError> {
        self.material(material_id).await?;
        Ok(self.store.rolls(material_id).await?)
    }

    pub async fn sales(&self) -> Result<Vec<Sale>, LedgerError> {
        Ok(self.store.sales().await?)
    }

    pub async fn processing_records(&self) -> Result<Vec<ProcessingRecord>, LedgerError> {
        Ok(self.store.processing_records().await?)
    }

    pub async fn customer(&self, customer_id: CustomerId) -> Result<Customer, LedgerError> {
        self.store
            .customer(customer_id)
            .await?
            .ok_or_else(|| DomainError::UnknownCustomer(customer_id).into())
    }

    pub async fn customers(&self) -> Result<Vec<Customer>, LedgerError> {
        Ok(self.store.customers().await?)
    }

    /// The newest `limit` activity entries, newest first.
    pub async fn activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, LedgerError> {
        Ok(self.store.activity(limit).await?)
    }
}
