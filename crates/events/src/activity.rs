//! Append-only audit trail of every mutation the ledger performs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockledger_core::{ActivityId, Actor, DomainError};

/// What kind of mutation an activity entry records.
///
/// Manual adjustments are a distinct action so an auditor can tell a stock
/// correction apart from a sale reversal or a processing return.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Added,
    Updated,
    Deleted,
    Sale,
    SaleReversed,
    RollsReceived,
    ProcessingSent,
    ProcessingReceived,
    ManualAdjustment,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::Added => "added",
            ActivityAction::Updated => "updated",
            ActivityAction::Deleted => "deleted",
            ActivityAction::Sale => "sale",
            ActivityAction::SaleReversed => "sale_reversed",
            ActivityAction::RollsReceived => "rolls_received",
            ActivityAction::ProcessingSent => "processing_sent",
            ActivityAction::ProcessingReceived => "processing_received",
            ActivityAction::ManualAdjustment => "manual_adjustment",
        }
    }
}

impl core::str::FromStr for ActivityAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "added" => ActivityAction::Added,
            "updated" => ActivityAction::Updated,
            "deleted" => ActivityAction::Deleted,
            "sale" => ActivityAction::Sale,
            "sale_reversed" => ActivityAction::SaleReversed,
            "rolls_received" => ActivityAction::RollsReceived,
            "processing_sent" => ActivityAction::ProcessingSent,
            "processing_received" => ActivityAction::ProcessingReceived,
            "manual_adjustment" => ActivityAction::ManualAdjustment,
            other => return Err(DomainError::validation(format!("unknown activity action '{other}'"))),
        })
    }
}

/// The type of record an activity entry describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Material,
    Roll,
    Sale,
    ProcessingRecord,
    Customer,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Material => "material",
            EntityKind::Roll => "roll",
            EntityKind::Sale => "sale",
            EntityKind::ProcessingRecord => "processing_record",
            EntityKind::Customer => "customer",
        }
    }
}

impl core::str::FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "material" => EntityKind::Material,
            "roll" => EntityKind::Roll,
            "sale" => EntityKind::Sale,
            "processing_record" => EntityKind::ProcessingRecord,
            "customer" => EntityKind::Customer,
            other => return Err(DomainError::validation(format!("unknown entity kind '{other}'"))),
        })
    }
}

/// One audit entry. Written in the same transaction as the mutation it
/// describes, never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityId,
    pub recorded_at: DateTime<Utc>,
    pub actor: Actor,
    pub action: ActivityAction,
    pub entity: EntityKind,
    pub entity_id: Uuid,
    pub description: String,
    /// Structured before/after detail (quantities, ids, prices).
    pub changes: JsonValue,
}

impl ActivityLogEntry {
    pub fn new(
        actor: Actor,
        action: ActivityAction,
        entity: EntityKind,
        entity_id: impl Into<Uuid>,
        description: impl Into<String>,
        changes: JsonValue,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            recorded_at,
            actor,
            action,
            entity,
            entity_id: entity_id.into(),
            description: description.into(),
            changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip() {
        for action in [
            ActivityAction::Added,
            ActivityAction::SaleReversed,
            ActivityAction::ProcessingReceived,
            ActivityAction::ManualAdjustment,
        ] {
            assert_eq!(action.as_str().parse::<ActivityAction>().unwrap(), action);
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                serde_json::Value::String(action.as_str().to_string())
            );
        }
    }

    #[test]
    fn unknown_entity_kind_is_rejected() {
        assert!("warehouse".parse::<EntityKind>().is_err());
    }
}
