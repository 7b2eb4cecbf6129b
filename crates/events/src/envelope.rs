use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockledger_core::{Actor, MaterialId};

/// Envelope for a committed material event.
///
/// This is the unit published on the bus after a ledger transaction commits.
///
/// Notes:
/// - `sequence_number` is the material's version after the event was applied,
///   so it increases by one per event within a material's stream.
/// - `payload` is the serialized event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    material_id: MaterialId,
    event_type: String,
    sequence_number: u64,
    actor: Actor,
    committed_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        material_id: MaterialId,
        event_type: impl Into<String>,
        sequence_number: u64,
        actor: Actor,
        committed_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            material_id,
            event_type: event_type.into(),
            sequence_number,
            actor,
            committed_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
