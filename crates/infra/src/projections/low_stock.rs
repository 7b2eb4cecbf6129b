use std::collections::HashMap;
use std::sync::RwLock;

use serde::Serialize;
use thiserror::Error;

use stockledger_core::{AggregateRoot, MaterialId, Quantity};
use stockledger_inventory::{Material, MaterialEvent, UnitOfMeasure};

use crate::ledger::LedgerEnvelope;

/// Stock level of one material relative to its reorder point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockEntry {
    pub material_id: MaterialId,
    pub name: String,
    pub unit: UnitOfMeasure,
    pub quantity_on_hand: Quantity,
    pub reorder_point: Option<Quantity>,
}

impl LowStockEntry {
    pub fn needs_reorder(&self) -> bool {
        self.reorder_point
            .is_some_and(|p| self.quantity_on_hand <= p)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LowStockProjectionError {
    #[error("failed to deserialize material event: {0}")]
    Deserialize(String),

    #[error("event material_id does not match envelope material_id")]
    StreamMismatch,

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("stock delta {delta} out of range for tracked quantity {quantity}")]
    StockOutOfRange { quantity: i64, delta: i64 },
}

#[derive(Debug, Clone)]
struct Tracked {
    entry: LowStockEntry,
    sequence: u64,
    deleted: bool,
}

/// Low-stock report.
///
/// Follows published material events and keeps each material's stock next to
/// its reorder point. Disposable: [`seed`](Self::seed) rebuilds it from the
/// committed materials at any time.
#[derive(Debug, Default)]
pub struct LowStockProjection {
    materials: RwLock<HashMap<MaterialId, Tracked>>,
}

impl LowStockProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the read model with the state of `materials`.
    pub fn seed(&self, materials: impl IntoIterator<Item = Material>) {
        let seeded: HashMap<MaterialId, Tracked> = materials
            .into_iter()
            .map(|m| {
                let tracked = Tracked {
                    entry: entry_for(&m),
                    sequence: m.version(),
                    deleted: m.is_deleted(),
                };
                (m.id_typed(), tracked)
            })
            .collect();

        if let Ok(mut materials) = self.materials.write() {
            *materials = seeded;
        }
    }

    pub fn get(&self, material_id: MaterialId) -> Option<LowStockEntry> {
        self.materials
            .read()
            .ok()?
            .get(&material_id)
            .filter(|t| !t.deleted)
            .map(|t| t.entry.clone())
    }

    /// Live materials at or below their reorder point, ordered by name.
    pub fn below_reorder_point(&self) -> Vec<LowStockEntry> {
        let Ok(materials) = self.materials.read() else {
            return Vec::new();
        };
        let mut entries: Vec<LowStockEntry> = materials
            .values()
            .filter(|t| !t.deleted && t.entry.needs_reorder())
            .map(|t| t.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.material_id.cmp(&b.material_id)));
        entries
    }

    /// Apply one published envelope.
    ///
    /// - Replays at or below the material's cursor are ignored (at-least-once
    ///   delivery)
    /// - A material's first event must be its registration (sequence 1)
    /// - After that, sequence numbers must advance by exactly one
    pub fn apply_envelope(&self, envelope: &LedgerEnvelope) -> Result<(), LowStockProjectionError> {
        let material_id = envelope.material_id();
        let seq = envelope.sequence_number();

        let mut materials = match self.materials.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let last = materials.get(&material_id).map(|t| t.sequence).unwrap_or(0);

        if seq == 0 {
            return Err(LowStockProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            // Duplicate or replay; safe to ignore.
            return Ok(());
        }
        if seq != last + 1 {
            return Err(LowStockProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: MaterialEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| LowStockProjectionError::Deserialize(e.to_string()))?;
        if event.material_id() != material_id {
            return Err(LowStockProjectionError::StreamMismatch);
        }

        match &event {
            MaterialEvent::Registered { details, .. } => {
                materials.insert(
                    material_id,
                    Tracked {
                        entry: LowStockEntry {
                            material_id,
                            name: details.name.clone(),
                            unit: details.unit,
                            quantity_on_hand: Quantity::ZERO,
                            reorder_point: details.reorder_point,
                        },
                        sequence: seq,
                        deleted: false,
                    },
                );
                return Ok(());
            }
            _ if last == 0 => {
                return Err(LowStockProjectionError::NonMonotonicSequence { last, found: seq });
            }
            _ => {}
        }

        if let Some(tracked) = materials.get_mut(&material_id) {
            match &event {
                MaterialEvent::DetailsUpdated { details, .. } => {
                    tracked.entry.name = details.name.clone();
                    tracked.entry.unit = details.unit;
                    tracked.entry.reorder_point = details.reorder_point;
                }
                MaterialEvent::Deleted { .. } => tracked.deleted = true,
                other => {
                    let quantity = tracked.entry.quantity_on_hand;
                    let delta = other.stock_delta();
                    tracked.entry.quantity_on_hand = quantity.checked_apply(delta).ok_or(
                        LowStockProjectionError::StockOutOfRange { quantity: quantity.value(), delta },
                    )?;
                }
            }
            // Advance cursor after successful apply.
            tracked.sequence = seq;
        }

        Ok(())
    }
}

fn entry_for(material: &Material) -> LowStockEntry {
    let details = material.details();
    LowStockEntry {
        material_id: material.id_typed(),
        name: details.name.clone(),
        unit: details.unit,
        quantity_on_hand: material.quantity_on_hand(),
        reorder_point: details.reorder_point,
    }
}
