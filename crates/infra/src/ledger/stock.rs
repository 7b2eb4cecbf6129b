//! Operations that move stock: sales, processing shipments and manual
//! adjustments.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use stockledger_core::{
    Actor, DomainError, MaterialId, ProcessingRecordId, Quantity, SaleId,
};
use stockledger_events::{ActivityAction, ActivityLogEntry, EntityKind, EventBus};
use stockledger_inventory::{MaterialCommand, ProcessingRecord, Sale};

use super::{
    LedgerEnvelope, LedgerError, NewSale, ProcessingReceived, ProcessingSent, SaleDeleted,
    SaleRecorded, StockLedger, StockLevel, apply_command, debt_delta,
};

impl<B> StockLedger<B>
where
    B: EventBus<LedgerEnvelope>,
{
    /// Record a sale: decrement stock, store the sale and charge any amount
    /// due to the customer.
    #[instrument(
        skip_all,
        fields(material_id = %sale.material_id, quantity = sale.quantity),
        err(level = "warn")
    )]
    pub async fn record_sale(&self, actor: &Actor, sale: NewSale) -> Result<SaleRecorded, LedgerError> {
        let quantity = Quantity::positive(sale.quantity)?;

        let _guard = self.locks.acquire(sale.material_id).await;
        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        let sale_id = SaleId::new();

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::RecordSale {
                material_id: sale.material_id,
                sale_id,
                quantity,
                occurred_at: now,
            },
        )
        .await?;

        let customer = match sale.customer_id {
            Some(customer_id) => Some(
                tx.read_customer(customer_id)
                    .await?
                    .ok_or(DomainError::UnknownCustomer(customer_id))?,
            ),
            None => None,
        };

        let record = Sale::new(
            sale_id,
            sale.material_id,
            sale.customer_id,
            quantity,
            sale.unit_price,
            sale.amount_due.unwrap_or(0),
            now,
        )?;
        tx.insert_sale(&record).await?;

        if let Some(customer) = customer.filter(|_| record.amount_due > 0) {
            let amount = debt_delta(record.amount_due)?;
            customer.debt_after(amount)?;
            tx.charge_customer(customer.id, amount).await?;
        }

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Sale,
            EntityKind::Sale,
            sale_id,
            format!("sold {quantity} of '{}'", applied.material.name()),
            json!({
                "material_id": sale.material_id,
                "quantity": quantity,
                "customer_id": record.customer_id,
                "unit_price": record.unit_price,
                "amount_due": record.amount_due,
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let quantity_remaining = applied.quantity_remaining();
        info!(
            sale_id = %sale_id,
            quantity_remaining = quantity_remaining.value(),
            "sale recorded"
        );
        self.publish(&applied);

        Ok(SaleRecorded {
            sale: record,
            quantity_remaining,
        })
    }

    /// Delete a sale, restoring exactly the quantity it took out of stock and
    /// taking its amount due back off the customer's debt.
    #[instrument(skip_all, fields(sale_id = %sale_id), err(level = "warn"))]
    pub async fn delete_sale(&self, actor: &Actor, sale_id: SaleId) -> Result<SaleDeleted, LedgerError> {
        let material_id = self
            .store
            .sale(sale_id)
            .await?
            .ok_or(DomainError::UnknownSale(sale_id))?
            .material_id;

        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;
        // Re-read under the lock: a concurrent delete may have won.
        let sale = tx
            .read_sale(sale_id)
            .await?
            .ok_or(DomainError::UnknownSale(sale_id))?;
        let now = Utc::now();

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::ReverseSale {
                material_id: sale.material_id,
                sale_id,
                quantity: sale.quantity,
                occurred_at: now,
            },
        )
        .await?;
        tx.delete_sale(sale_id).await?;

        if let Some(customer_id) = sale.customer_id.filter(|_| sale.amount_due > 0) {
            if let Some(customer) = tx.read_customer(customer_id).await? {
                let amount = -debt_delta(sale.amount_due)?;
                customer.debt_after(amount)?;
                tx.charge_customer(customer_id, amount).await?;
            }
        }

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::SaleReversed,
            EntityKind::Sale,
            sale_id,
            format!(
                "reversed sale of {} of '{}'",
                sale.quantity,
                applied.material.name()
            ),
            json!({
                "material_id": sale.material_id,
                "quantity": sale.quantity,
                "customer_id": sale.customer_id,
                "amount_due": sale.amount_due,
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let quantity_remaining = applied.quantity_remaining();
        info!(
            sale_id = %sale_id,
            material_id = %material_id,
            quantity_remaining = quantity_remaining.value(),
            "sale deleted"
        );
        self.publish(&applied);

        Ok(SaleDeleted {
            sale,
            quantity_remaining,
        })
    }

    /// Move stock out to an external processor.
    #[instrument(skip_all, fields(material_id = %material_id, quantity = quantity), err(level = "warn"))]
    pub async fn send_for_processing(
        &self,
        actor: &Actor,
        material_id: MaterialId,
        quantity: i64,
        provider: Option<String>,
    ) -> Result<ProcessingSent, LedgerError> {
        let quantity = Quantity::positive(quantity)?;

        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        let record_id = ProcessingRecordId::new();

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::SendForProcessing {
                material_id,
                record_id,
                quantity,
                occurred_at: now,
            },
        )
        .await?;

        let record = ProcessingRecord::send(record_id, material_id, quantity, provider, now)?;
        tx.insert_processing(&record).await?;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::ProcessingSent,
            EntityKind::ProcessingRecord,
            record_id,
            format!(
                "sent {quantity} of '{}' for processing",
                applied.material.name()
            ),
            json!({
                "material_id": material_id,
                "quantity": quantity,
                "provider": record.provider,
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let quantity_remaining = applied.quantity_remaining();
        info!(
            record_id = %record_id,
            quantity_remaining = quantity_remaining.value(),
            "material sent for processing"
        );
        self.publish(&applied);

        Ok(ProcessingSent {
            record,
            quantity_remaining,
        })
    }

    /// Reconcile material coming back from a processor.
    ///
    /// A zero receipt is accepted and changes nothing but the record's
    /// last-received timestamp.
    #[instrument(skip_all, fields(record_id = %record_id, quantity = quantity), err(level = "warn"))]
    pub async fn receive_from_processing(
        &self,
        actor: &Actor,
        record_id: ProcessingRecordId,
        quantity: i64,
    ) -> Result<ProcessingReceived, LedgerError> {
        let quantity = Quantity::non_negative(quantity)?;
        let material_id = self
            .store
            .processing_record(record_id)
            .await?
            .ok_or(DomainError::UnknownRecord(record_id))?
            .material_id;

        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;
        let record = tx
            .read_processing(record_id)
            .await?
            .ok_or(DomainError::UnknownRecord(record_id))?;
        let now = Utc::now();

        let updated = record.receive(quantity, now)?;
        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::ReturnFromProcessing {
                material_id,
                record_id,
                quantity,
                occurred_at: now,
            },
        )
        .await?;
        tx.update_processing(&updated).await?;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::ProcessingReceived,
            EntityKind::ProcessingRecord,
            record_id,
            format!(
                "received {quantity} of '{}' back from processing",
                applied.material.name()
            ),
            json!({
                "material_id": material_id,
                "quantity": quantity,
                "quantity_sent": updated.quantity_sent,
                "quantity_returned": updated.quantity_returned,
                "status": { "before": record.status, "after": updated.status },
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let quantity_remaining = applied.quantity_remaining();
        info!(
            record_id = %record_id,
            status = updated.status.as_str(),
            quantity_remaining = quantity_remaining.value(),
            "processing receipt recorded"
        );
        self.publish(&applied);

        Ok(ProcessingReceived {
            record: updated,
            quantity_remaining,
        })
    }

    /// Administrative stock correction, logged as a manual adjustment.
    #[instrument(skip_all, fields(material_id = %material_id, delta = delta), err(level = "warn"))]
    pub async fn adjust_material_direct(
        &self,
        actor: &Actor,
        material_id: MaterialId,
        delta: i64,
        reason: Option<String>,
    ) -> Result<StockLevel, LedgerError> {
        let reason = reason.filter(|r| !r.trim().is_empty());

        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;
        let now = Utc::now();

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::AdjustStock {
                material_id,
                delta,
                reason: reason.clone(),
                occurred_at: now,
            },
        )
        .await?;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::ManualAdjustment,
            EntityKind::Material,
            material_id,
            format!("adjusted '{}' by {delta:+}", applied.material.name()),
            json!({
                "delta": delta,
                "reason": reason,
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let level = applied.stock_level();
        info!(
            quantity_remaining = level.quantity_remaining.value(),
            "stock adjusted"
        );
        self.publish(&applied);

        Ok(level)
    }
}
