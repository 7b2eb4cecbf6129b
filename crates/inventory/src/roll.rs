use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Entity, MaterialId, Quantity, RollId};

/// A physical roll of a material received into stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll {
    pub id: RollId,
    pub material_id: MaterialId,
    pub quantity: Quantity,
    pub received_at: DateTime<Utc>,
}

impl Roll {
    pub fn new(
        id: RollId,
        material_id: MaterialId,
        quantity: Quantity,
        received_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity.is_zero() {
            return Err(DomainError::invalid_quantity(0));
        }
        Ok(Self { id, material_id, quantity, received_at })
    }

    pub fn resized(&self, quantity: Quantity) -> DomainResult<Self> {
        if quantity.is_zero() {
            return Err(DomainError::invalid_quantity(0));
        }
        Ok(Self { quantity, ..self.clone() })
    }
}

impl Entity for Roll {
    type Id = RollId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
