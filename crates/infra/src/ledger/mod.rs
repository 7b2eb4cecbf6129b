//! The stock ledger: every operation that changes a material's
//! quantity-on-hand.
//!
//! ## Flow of one operation
//!
//! ```text
//! lock material → begin tx → read material → execute command (handle + apply)
//!   → write material (ExpectedVersion) + journal events + records
//!   + activity entry → commit → publish journaled events
//! ```
//!
//! Any error before `commit` drops the transaction, which discards every
//! staged write. Publication happens after commit and its failure is only
//! logged.

mod catalog;
mod customers;
mod error;
mod queries;
mod stock;


use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value as JsonValue, json};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;
use uuid::Uuid;

use stockledger_core::{
    Actor, AggregateRoot, CustomerId, DomainError, ExpectedVersion, MaterialId, Quantity,
};
use stockledger_events::{Command, Event, EventBus, EventEnvelope, execute};
use stockledger_inventory::{
    Material, MaterialCommand, MaterialDetails, MaterialEvent, ProcessingRecord, Roll, Sale,
};

use crate::locks::MaterialLocks;
use crate::store::{LedgerStore, LedgerTransaction};

pub use error::LedgerError;

/// Envelope type the ledger publishes.
pub type LedgerEnvelope = EventEnvelope<JsonValue>;

/// A sale to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub material_id: MaterialId,
    pub quantity: i64,
    pub customer_id: Option<CustomerId>,
    /// Price per unit in minor currency units.
    pub unit_price: u64,
    /// Part of the price left on the customer's account.
    pub amount_due: Option<u64>,
}

/// A material to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaterial {
    pub details: MaterialDetails,
    /// Stock on hand at registration, recorded as a manual adjustment.
    pub opening_stock: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecorded {
    pub sale: Sale,
    pub quantity_remaining: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDeleted {
    pub sale: Sale,
    pub quantity_remaining: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSent {
    pub record: ProcessingRecord,
    pub quantity_remaining: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingReceived {
    pub record: ProcessingRecord,
    pub quantity_remaining: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollsReceived {
    pub material_id: MaterialId,
    pub rolls: Vec<Roll>,
    pub quantity_remaining: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollResized {
    pub roll: Roll,
    pub quantity_remaining: Quantity,
}

/// Stock level of one material right after an operation committed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub material_id: MaterialId,
    pub quantity_remaining: Quantity,
}

/// Stock ledger service.
///
/// Owns the only code paths that change stock. Shared behind an `Arc` by the
/// HTTP layer; every method takes `&self`.
pub struct StockLedger<B> {
    store: Arc<dyn LedgerStore>,
    bus: B,
    locks: MaterialLocks,
    /// Serializes identity checks for material registration and renames.
    catalog: AsyncMutex<()>,
}

impl<B> StockLedger<B>
where
    B: EventBus<LedgerEnvelope>,
{
    pub fn new(store: Arc<dyn LedgerStore>, bus: B) -> Self {
        Self {
            store,
            bus,
            locks: MaterialLocks::new(),
            catalog: AsyncMutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Publish the journaled events of a committed operation.
    fn publish(&self, applied: &Applied) {
        for envelope in &applied.envelopes {
            if let Err(err) = self.bus.publish(envelope.clone()) {
                warn!(
                    material_id = %envelope.material_id(),
                    sequence_number = envelope.sequence_number(),
                    error = ?err,
                    "failed to publish committed material event"
                );
            }
        }
    }
}

/// What one material command did inside an open transaction.
struct Applied {
    material: Material,
    events: Vec<MaterialEvent>,
    envelopes: Vec<LedgerEnvelope>,
}

impl Applied {
    /// Journal `events` (already applied to `material`) in `tx`.
    async fn stage(
        tx: &mut dyn LedgerTransaction,
        actor: &Actor,
        committed_at: DateTime<Utc>,
        material: Material,
        events: Vec<MaterialEvent>,
    ) -> Result<Self, LedgerError> {
        let material_id = material.id_typed();
        let first = material.version().saturating_sub(events.len() as u64) + 1;

        let mut envelopes = Vec::with_capacity(events.len());
        for (offset, event) in events.iter().enumerate() {
            let payload = serde_json::to_value(event).map_err(|e| {
                LedgerError::StorageUnavailable(format!("failed to encode material event: {e}"))
            })?;
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                material_id,
                event.event_type(),
                first + offset as u64,
                actor.clone(),
                committed_at,
                payload,
            );
            tx.append_event(&envelope).await?;
            envelopes.push(envelope);
        }

        Ok(Self {
            material,
            events,
            envelopes,
        })
    }

    fn quantity_remaining(&self) -> Quantity {
        self.material.quantity_on_hand()
    }

    /// Before/after stock levels for the activity entry.
    fn stock_movement(&self) -> JsonValue {
        let after = self.material.quantity_on_hand().value();
        let delta = self
            .events
            .iter()
            .map(MaterialEvent::stock_delta)
            .fold(0i64, i64::saturating_add);
        json!({ "before": after.saturating_sub(delta), "after": after })
    }

    fn stock_level(&self) -> StockLevel {
        StockLevel {
            material_id: self.material.id_typed(),
            quantity_remaining: self.quantity_remaining(),
        }
    }
}

/// Read the target material, run `command` against it and stage the new
/// state and its events in `tx`.
async fn apply_command(
    tx: &mut dyn LedgerTransaction,
    actor: &Actor,
    committed_at: DateTime<Utc>,
    command: MaterialCommand,
) -> Result<Applied, LedgerError> {
    let material_id = command.target_material();
    let mut material = tx
        .read_material(material_id)
        .await?
        .ok_or(DomainError::UnknownMaterial(material_id))?;

    let expected = ExpectedVersion::Exact(material.version());
    let events = execute(&mut material, &command)?;
    tx.write_material(&material, expected).await?;

    Applied::stage(tx, actor, committed_at, material, events).await
}

/// Minor currency units as a signed debt delta.
fn debt_delta(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount)
        .map_err(|_| DomainError::validation(format!("amount {amount} is out of range")).into())
}
