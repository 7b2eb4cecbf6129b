use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use stockledger_core::{Actor, CustomerId, DomainError};
use stockledger_events::{ActivityAction, ActivityLogEntry, EntityKind, EventBus};
use stockledger_parties::{Customer, CustomerDetails};

use super::{LedgerEnvelope, LedgerError, StockLedger};

impl<B> StockLedger<B>
where
    B: EventBus<LedgerEnvelope>,
{
    #[instrument(skip_all, err(level = "warn"))]
    pub async fn add_customer(&self, actor: &Actor, details: CustomerDetails) -> Result<Customer, LedgerError> {
        let now = Utc::now();
        let customer = Customer::register(CustomerId::new(), details, now)?;

        let mut tx = self.store.begin().await?;
        tx.insert_customer(&customer).await?;
        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Added,
            EntityKind::Customer,
            customer.id,
            format!("added customer '{}'", customer.name()),
            json!({ "details": customer.details }),
            now,
        ))
        .await?;
        tx.commit().await?;

        info!(customer_id = %customer.id, "customer added");
        Ok(customer)
    }

    /// Replace a customer's contact details. Debt only moves with sales.
    #[instrument(skip_all, fields(customer_id = %customer_id), err(level = "warn"))]
    pub async fn update_customer(
        &self,
        actor: &Actor,
        customer_id: CustomerId,
        details: CustomerDetails,
    ) -> Result<Customer, LedgerError> {
        let mut tx = self.store.begin().await?;
        let before = tx
            .read_customer(customer_id)
            .await?
            .ok_or(DomainError::UnknownCustomer(customer_id))?;
        let updated = before.updated(details)?;
        let now = Utc::now();

        tx.update_customer(&updated).await?;
        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Updated,
            EntityKind::Customer,
            customer_id,
            format!("updated customer '{}'", updated.name()),
            json!({ "before": before.details, "after": updated.details }),
            now,
        ))
        .await?;
        tx.commit().await?;

        info!(customer_id = %customer_id, "customer updated");
        Ok(updated)
    }

    /// Remove a customer. Past sales keep their (now dangling) customer id.
    #[instrument(skip_all, fields(customer_id = %customer_id), err(level = "warn"))]
    pub async fn delete_customer(&self, actor: &Actor, customer_id: CustomerId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin().await?;
        let customer = tx
            .read_customer(customer_id)
            .await?
            .ok_or(DomainError::UnknownCustomer(customer_id))?;

        tx.delete_customer(customer_id).await?;
        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Deleted,
            EntityKind::Customer,
            customer_id,
            format!("deleted customer '{}'", customer.name()),
            json!({ "details": customer.details, "debt": customer.debt }),
            Utc::now(),
        ))
        .await?;
        tx.commit().await?;

        info!(customer_id = %customer_id, "customer deleted");
        Ok(())
    }
}
