use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    Aggregate, AggregateRoot, DomainError, MaterialId, ProcessingRecordId, Quantity, RollId, SaleId,
};
use stockledger_events::{Command, Event};

/// Fabric width class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    #[default]
    #[serde(alias = "enli")]
    Wide,
    #[serde(alias = "ensiz")]
    Narrow,
}

impl MaterialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Wide => "wide",
            MaterialKind::Narrow => "narrow",
        }
    }
}

/// Unit in which a material's quantities are counted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    #[default]
    Metre,
    Centimetre,
    Roll,
    Piece,
    Kilogram,
}

/// Descriptive attributes of a material. Never includes stock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialDetails {
    pub name: String,
    #[serde(default)]
    pub kind: MaterialKind,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub unit: UnitOfMeasure,
    /// Stock level at or below which the material shows up in the low-stock report.
    #[serde(default)]
    pub reorder_point: Option<Quantity>,
}

impl MaterialDetails {
    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(())
    }
}

/// Aggregate root: Material.
///
/// The only owner of quantity-on-hand. Stock changes exclusively through the
/// events this aggregate emits, each carrying a signed delta, so the current
/// quantity is always the sum of the deltas applied since registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    id: MaterialId,
    details: MaterialDetails,
    quantity_on_hand: Quantity,
    version: u64,
    registered: bool,
    deleted: bool,
}

impl Material {
    /// Create an empty, not-yet-registered aggregate instance.
    pub fn empty(id: MaterialId) -> Self {
        Self {
            id,
            details: MaterialDetails::default(),
            quantity_on_hand: Quantity::ZERO,
            version: 0,
            registered: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> MaterialId {
        self.id
    }

    pub fn details(&self) -> &MaterialDetails {
        &self.details
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn quantity_on_hand(&self) -> Quantity {
        self.quantity_on_hand
    }

    pub fn is_registered(&self) -> bool {
        self.registered && !self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether stock sits at or below the reorder point.
    pub fn needs_reorder(&self) -> bool {
        self.details
            .reorder_point
            .is_some_and(|p| self.quantity_on_hand <= p)
    }
}

impl AggregateRoot for Material {
    type Id = MaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Commands accepted by a material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialCommand {
    Register {
        material_id: MaterialId,
        details: MaterialDetails,
        occurred_at: DateTime<Utc>,
    },
    UpdateDetails {
        material_id: MaterialId,
        details: MaterialDetails,
        occurred_at: DateTime<Utc>,
    },
    ReceiveRolls {
        material_id: MaterialId,
        rolls: Vec<(RollId, Quantity)>,
        occurred_at: DateTime<Utc>,
    },
    RemoveRoll {
        material_id: MaterialId,
        roll_id: RollId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    ResizeRoll {
        material_id: MaterialId,
        roll_id: RollId,
        from: Quantity,
        to: Quantity,
        occurred_at: DateTime<Utc>,
    },
    RecordSale {
        material_id: MaterialId,
        sale_id: SaleId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    ReverseSale {
        material_id: MaterialId,
        sale_id: SaleId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    SendForProcessing {
        material_id: MaterialId,
        record_id: ProcessingRecordId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    ReturnFromProcessing {
        material_id: MaterialId,
        record_id: ProcessingRecordId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    AdjustStock {
        material_id: MaterialId,
        delta: i64,
        reason: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    Delete {
        material_id: MaterialId,
        occurred_at: DateTime<Utc>,
    },
}

impl Command for MaterialCommand {
    fn target_material(&self) -> MaterialId {
        match self {
            MaterialCommand::Register { material_id, .. }
            | MaterialCommand::UpdateDetails { material_id, .. }
            | MaterialCommand::ReceiveRolls { material_id, .. }
            | MaterialCommand::RemoveRoll { material_id, .. }
            | MaterialCommand::ResizeRoll { material_id, .. }
            | MaterialCommand::RecordSale { material_id, .. }
            | MaterialCommand::ReverseSale { material_id, .. }
            | MaterialCommand::SendForProcessing { material_id, .. }
            | MaterialCommand::ReturnFromProcessing { material_id, .. }
            | MaterialCommand::AdjustStock { material_id, .. }
            | MaterialCommand::Delete { material_id, .. } => *material_id,
        }
    }
}

/// Facts emitted by a material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialEvent {
    Registered {
        material_id: MaterialId,
        details: MaterialDetails,
        occurred_at: DateTime<Utc>,
    },
    DetailsUpdated {
        material_id: MaterialId,
        details: MaterialDetails,
        occurred_at: DateTime<Utc>,
    },
    RollsReceived {
        material_id: MaterialId,
        rolls: Vec<(RollId, Quantity)>,
        occurred_at: DateTime<Utc>,
    },
    RollRemoved {
        material_id: MaterialId,
        roll_id: RollId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    RollResized {
        material_id: MaterialId,
        roll_id: RollId,
        from: Quantity,
        to: Quantity,
        occurred_at: DateTime<Utc>,
    },
    Sold {
        material_id: MaterialId,
        sale_id: SaleId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    SaleReversed {
        material_id: MaterialId,
        sale_id: SaleId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    SentForProcessing {
        material_id: MaterialId,
        record_id: ProcessingRecordId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    ReturnedFromProcessing {
        material_id: MaterialId,
        record_id: ProcessingRecordId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
    },
    StockAdjusted {
        material_id: MaterialId,
        delta: i64,
        reason: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    Deleted {
        material_id: MaterialId,
        occurred_at: DateTime<Utc>,
    },
}

impl MaterialEvent {
    /// Signed change this event makes to quantity-on-hand.
    pub fn stock_delta(&self) -> i64 {
        match self {
            MaterialEvent::RollsReceived { rolls, .. } => rolls
                .iter()
                .fold(0i64, |total, (_, q)| total.saturating_add(q.value())),
            MaterialEvent::RollRemoved { quantity, .. } => -quantity.value(),
            MaterialEvent::RollResized { from, to, .. } => to.value() - from.value(),
            MaterialEvent::Sold { quantity, .. } => -quantity.value(),
            MaterialEvent::SaleReversed { quantity, .. } => quantity.value(),
            MaterialEvent::SentForProcessing { quantity, .. } => -quantity.value(),
            MaterialEvent::ReturnedFromProcessing { quantity, .. } => quantity.value(),
            MaterialEvent::StockAdjusted { delta, .. } => *delta,
            MaterialEvent::Registered { .. }
            | MaterialEvent::DetailsUpdated { .. }
            | MaterialEvent::Deleted { .. } => 0,
        }
    }

    pub fn material_id(&self) -> MaterialId {
        match self {
            MaterialEvent::Registered { material_id, .. }
            | MaterialEvent::DetailsUpdated { material_id, .. }
            | MaterialEvent::RollsReceived { material_id, .. }
            | MaterialEvent::RollRemoved { material_id, .. }
            | MaterialEvent::RollResized { material_id, .. }
            | MaterialEvent::Sold { material_id, .. }
            | MaterialEvent::SaleReversed { material_id, .. }
            | MaterialEvent::SentForProcessing { material_id, .. }
            | MaterialEvent::ReturnedFromProcessing { material_id, .. }
            | MaterialEvent::StockAdjusted { material_id, .. }
            | MaterialEvent::Deleted { material_id, .. } => *material_id,
        }
    }
}

impl Event for MaterialEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MaterialEvent::Registered { .. } => "inventory.material.registered",
            MaterialEvent::DetailsUpdated { .. } => "inventory.material.details_updated",
            MaterialEvent::RollsReceived { .. } => "inventory.material.rolls_received",
            MaterialEvent::RollRemoved { .. } => "inventory.material.roll_removed",
            MaterialEvent::RollResized { .. } => "inventory.material.roll_resized",
            MaterialEvent::Sold { .. } => "inventory.material.sold",
            MaterialEvent::SaleReversed { .. } => "inventory.material.sale_reversed",
            MaterialEvent::SentForProcessing { .. } => "inventory.material.sent_for_processing",
            MaterialEvent::ReturnedFromProcessing { .. } => "inventory.material.returned_from_processing",
            MaterialEvent::StockAdjusted { .. } => "inventory.material.stock_adjusted",
            MaterialEvent::Deleted { .. } => "inventory.material.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MaterialEvent::Registered { occurred_at, .. }
            | MaterialEvent::DetailsUpdated { occurred_at, .. }
            | MaterialEvent::RollsReceived { occurred_at, .. }
            | MaterialEvent::RollRemoved { occurred_at, .. }
            | MaterialEvent::RollResized { occurred_at, .. }
            | MaterialEvent::Sold { occurred_at, .. }
            | MaterialEvent::SaleReversed { occurred_at, .. }
            | MaterialEvent::SentForProcessing { occurred_at, .. }
            | MaterialEvent::ReturnedFromProcessing { occurred_at, .. }
            | MaterialEvent::StockAdjusted { occurred_at, .. }
            | MaterialEvent::Deleted { occurred_at, .. } => *occurred_at,
        }
    }
}

impl Aggregate for Material {
    type Command = MaterialCommand;
    type Event = MaterialEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MaterialEvent::Registered { material_id, details, .. } => {
                self.id = *material_id;
                self.details = details.clone();
                self.quantity_on_hand = Quantity::ZERO;
                self.registered = true;
            }
            MaterialEvent::DetailsUpdated { details, .. } => {
                self.details = details.clone();
            }
            MaterialEvent::Deleted { .. } => {
                self.deleted = true;
            }
            other => match self.quantity_on_hand.checked_apply(other.stock_delta()) {
                Some(quantity) => self.quantity_on_hand = quantity,
                // handle() rejects every command whose event would land here.
                None => debug_assert!(
                    false,
                    "stock delta {} out of range for {}",
                    other.stock_delta(),
                    self.quantity_on_hand
                ),
            },
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if !matches!(command, MaterialCommand::Register { .. }) {
            self.ensure_live(command.target_material())?;
        }

        let event = match command {
            MaterialCommand::Register { material_id, details, occurred_at } => {
                return self.handle_register(*material_id, details, *occurred_at);
            }
            MaterialCommand::UpdateDetails { material_id, details, occurred_at } => {
                details.validate()?;
                MaterialEvent::DetailsUpdated {
                    material_id: *material_id,
                    details: details.clone(),
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::ReceiveRolls { material_id, rolls, occurred_at } => {
                if rolls.is_empty() {
                    return Err(DomainError::validation("at least one roll is required"));
                }
                if let Some((_, q)) = rolls.iter().find(|(_, q)| q.is_zero()) {
                    return Err(DomainError::invalid_quantity(q.value()));
                }
                let total = rolls.iter().try_fold(0i64, |total, (_, q)| {
                    total
                        .checked_add(q.value())
                        .ok_or_else(|| DomainError::invalid_quantity(q.value()))
                })?;
                self.ensure_can_credit(total)?;
                MaterialEvent::RollsReceived {
                    material_id: *material_id,
                    rolls: rolls.clone(),
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::RemoveRoll { material_id, roll_id, quantity, occurred_at } => {
                self.ensure_can_debit(*quantity)?;
                MaterialEvent::RollRemoved {
                    material_id: *material_id,
                    roll_id: *roll_id,
                    quantity: *quantity,
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::ResizeRoll { material_id, roll_id, from, to, occurred_at } => {
                if to.is_zero() {
                    return Err(DomainError::invalid_quantity(0));
                }
                match from.checked_sub(*to) {
                    Some(shrink) => self.ensure_can_debit(shrink)?,
                    None => self.ensure_can_credit(to.value() - from.value())?,
                }
                MaterialEvent::RollResized {
                    material_id: *material_id,
                    roll_id: *roll_id,
                    from: *from,
                    to: *to,
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::RecordSale { material_id, sale_id, quantity, occurred_at } => {
                ensure_positive(*quantity)?;
                self.ensure_can_debit(*quantity)?;
                MaterialEvent::Sold {
                    material_id: *material_id,
                    sale_id: *sale_id,
                    quantity: *quantity,
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::ReverseSale { material_id, sale_id, quantity, occurred_at } => {
                self.ensure_can_credit(quantity.value())?;
                MaterialEvent::SaleReversed {
                    material_id: *material_id,
                    sale_id: *sale_id,
                    quantity: *quantity,
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::SendForProcessing { material_id, record_id, quantity, occurred_at } => {
                ensure_positive(*quantity)?;
                self.ensure_can_debit(*quantity)?;
                MaterialEvent::SentForProcessing {
                    material_id: *material_id,
                    record_id: *record_id,
                    quantity: *quantity,
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::ReturnFromProcessing { material_id, record_id, quantity, occurred_at } => {
                self.ensure_can_credit(quantity.value())?;
                MaterialEvent::ReturnedFromProcessing {
                    material_id: *material_id,
                    record_id: *record_id,
                    quantity: *quantity,
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::AdjustStock { material_id, delta, reason, occurred_at } => {
                if *delta == 0 {
                    return Err(DomainError::invalid_quantity(0));
                }
                if *delta > 0 {
                    self.ensure_can_credit(*delta)?;
                } else if self.quantity_on_hand.checked_apply(*delta).is_none() {
                    return Err(self.insufficient(delta.saturating_neg()));
                }
                MaterialEvent::StockAdjusted {
                    material_id: *material_id,
                    delta: *delta,
                    reason: reason.clone(),
                    occurred_at: *occurred_at,
                }
            }
            MaterialCommand::Delete { material_id, occurred_at } => MaterialEvent::Deleted {
                material_id: *material_id,
                occurred_at: *occurred_at,
            },
        };

        Ok(vec![event])
    }
}

fn ensure_positive(quantity: Quantity) -> Result<(), DomainError> {
    if quantity.is_zero() {
        return Err(DomainError::invalid_quantity(0));
    }
    Ok(())
}

impl Material {
    fn handle_register(
        &self,
        material_id: MaterialId,
        details: &MaterialDetails,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<MaterialEvent>, DomainError> {
        if self.registered {
            return Err(DomainError::conflict("material already exists"));
        }
        details.validate()?;
        Ok(vec![MaterialEvent::Registered {
            material_id,
            details: details.clone(),
            occurred_at,
        }])
    }

    fn ensure_live(&self, target: MaterialId) -> Result<(), DomainError> {
        if !self.is_registered() || self.id != target {
            return Err(DomainError::UnknownMaterial(target));
        }
        Ok(())
    }

    fn ensure_can_debit(&self, quantity: Quantity) -> Result<(), DomainError> {
        if self.quantity_on_hand.checked_sub(quantity).is_none() {
            return Err(self.insufficient(quantity.value()));
        }
        Ok(())
    }

    /// Stock must still fit in a quantity after `amount` is added.
    fn ensure_can_credit(&self, amount: i64) -> Result<(), DomainError> {
        if self.quantity_on_hand.checked_apply(amount).is_none() {
            return Err(DomainError::invalid_quantity(amount));
        }
        Ok(())
    }

    fn insufficient(&self, requested: i64) -> DomainError {
        DomainError::InsufficientStock {
            material_id: self.id,
            requested,
            available: self.quantity_on_hand.value(),
        }
    }
}
