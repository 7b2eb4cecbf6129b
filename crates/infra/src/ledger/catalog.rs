//! Material catalog and roll bookkeeping.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};

use stockledger_core::{Actor, DomainError, ExpectedVersion, MaterialId, Quantity, RollId};
use stockledger_events::{ActivityAction, ActivityLogEntry, EntityKind, EventBus, execute};
use stockledger_inventory::{Material, MaterialCommand, MaterialDetails, Roll};

use super::{
    Applied, LedgerEnvelope, LedgerError, NewMaterial, RollResized, RollsReceived, StockLedger,
    StockLevel, apply_command,
};

impl<B> StockLedger<B>
where
    B: EventBus<LedgerEnvelope>,
{
    /// Register a material. Opening stock, when given, is booked as a manual
    /// adjustment in the same transaction.
    #[instrument(skip_all, fields(name = %material.details.name), err(level = "warn"))]
    pub async fn add_material(&self, actor: &Actor, material: NewMaterial) -> Result<Material, LedgerError> {
        let opening = match material.opening_stock {
            Some(0) | None => None,
            Some(q) => Some(Quantity::positive(q)?),
        };

        let material_id = MaterialId::new();
        // Held until publication so later operations on the new material
        // cannot publish ahead of its registration.
        let _guard = self.locks.acquire(material_id).await;
        let _catalog = self.catalog.lock().await;
        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.find_material(&material.details).await? {
            return Err(DomainError::conflict(format!(
                "material '{}' already exists ({existing})",
                material.details.name.trim()
            ))
            .into());
        }

        let now = Utc::now();
        let mut aggregate = Material::empty(material_id);
        let mut events = execute(
            &mut aggregate,
            &MaterialCommand::Register {
                material_id,
                details: material.details,
                occurred_at: now,
            },
        )?;
        if let Some(quantity) = opening {
            events.extend(execute(
                &mut aggregate,
                &MaterialCommand::AdjustStock {
                    material_id,
                    delta: quantity.value(),
                    reason: Some("opening stock".to_string()),
                    occurred_at: now,
                },
            )?);
        }
        tx.write_material(&aggregate, ExpectedVersion::New).await?;
        let applied = Applied::stage(tx.as_mut(), actor, now, aggregate, events).await?;
        let aggregate = &applied.material;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Added,
            EntityKind::Material,
            material_id,
            format!("added material '{}'", aggregate.name()),
            json!({ "details": aggregate.details() }),
            now,
        ))
        .await?;
        if let Some(quantity) = opening {
            tx.append_log(&ActivityLogEntry::new(
                actor.clone(),
                ActivityAction::ManualAdjustment,
                EntityKind::Material,
                material_id,
                format!("opening stock of {quantity} for '{}'", aggregate.name()),
                json!({
                    "delta": quantity,
                    "reason": "opening stock",
                    "stock": { "before": 0, "after": quantity },
                }),
                now,
            ))
            .await?;
        }

        tx.commit().await?;

        info!(
            material_id = %material_id,
            quantity_remaining = aggregate.quantity_on_hand().value(),
            "material added"
        );
        self.publish(&applied);

        Ok(applied.material)
    }

    /// Replace a material's descriptive details. Stock is not editable here.
    #[instrument(skip_all, fields(material_id = %material_id), err(level = "warn"))]
    pub async fn update_material(
        &self,
        actor: &Actor,
        material_id: MaterialId,
        details: MaterialDetails,
    ) -> Result<Material, LedgerError> {
        let _guard = self.locks.acquire(material_id).await;
        let _catalog = self.catalog.lock().await;
        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.find_material(&details).await? {
            if existing != material_id {
                return Err(DomainError::conflict(format!(
                    "material '{}' already exists ({existing})",
                    details.name.trim()
                ))
                .into());
            }
        }

        let before = tx
            .read_material(material_id)
            .await?
            .ok_or(DomainError::UnknownMaterial(material_id))?;
        let now = Utc::now();

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::UpdateDetails {
                material_id,
                details,
                occurred_at: now,
            },
        )
        .await?;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Updated,
            EntityKind::Material,
            material_id,
            format!("updated material '{}'", applied.material.name()),
            json!({ "before": before.details(), "after": applied.material.details() }),
            now,
        ))
        .await?;

        tx.commit().await?;

        info!(material_id = %material_id, "material updated");
        self.publish(&applied);

        Ok(applied.material)
    }

    /// Delete a material that no sale or open processing record refers to.
    /// Its rolls and fully returned processing records go with it.
    #[instrument(skip_all, fields(material_id = %material_id), err(level = "warn"))]
    pub async fn delete_material(&self, actor: &Actor, material_id: MaterialId) -> Result<(), LedgerError> {
        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;

        let mut material = tx
            .read_material(material_id)
            .await?
            .ok_or(DomainError::UnknownMaterial(material_id))?;

        let references = tx.material_references(material_id).await?;
        if !references.is_empty() {
            return Err(DomainError::MaterialInUse {
                material_id,
                sales: references.sales,
                open_processing: references.open_processing,
            }
            .into());
        }

        let now = Utc::now();
        let events = execute(
            &mut material,
            &MaterialCommand::Delete {
                material_id,
                occurred_at: now,
            },
        )?;
        tx.delete_material(material_id).await?;
        let applied = Applied::stage(tx.as_mut(), actor, now, material, events).await?;
        let material = &applied.material;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Deleted,
            EntityKind::Material,
            material_id,
            format!("deleted material '{}'", material.name()),
            json!({
                "details": material.details(),
                "quantity_on_hand": material.quantity_on_hand(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        info!(material_id = %material_id, "material deleted");
        self.publish(&applied);

        Ok(())
    }

    /// Book newly delivered rolls; stock rises by their total length.
    #[instrument(skip_all, fields(material_id = %material_id, rolls = quantities.len()), err(level = "warn"))]
    pub async fn receive_rolls(
        &self,
        actor: &Actor,
        material_id: MaterialId,
        quantities: Vec<i64>,
    ) -> Result<RollsReceived, LedgerError> {
        let now = Utc::now();
        let rolls = quantities
            .into_iter()
            .map(|q| Roll::new(RollId::new(), material_id, Quantity::positive(q)?, now))
            .collect::<Result<Vec<_>, DomainError>>()?;

        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::ReceiveRolls {
                material_id,
                rolls: rolls.iter().map(|r| (r.id, r.quantity)).collect(),
                occurred_at: now,
            },
        )
        .await?;
        for roll in &rolls {
            tx.insert_roll(roll).await?;
        }

        let total = rolls
            .iter()
            .fold(0i64, |total, r| total.saturating_add(r.quantity.value()));
        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::RollsReceived,
            EntityKind::Material,
            material_id,
            format!(
                "received {} roll(s) totalling {total} of '{}'",
                rolls.len(),
                applied.material.name()
            ),
            json!({
                "rolls": rolls.iter().map(|r| json!({ "id": r.id, "quantity": r.quantity })).collect::<Vec<_>>(),
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let quantity_remaining = applied.quantity_remaining();
        info!(
            quantity_remaining = quantity_remaining.value(),
            "rolls received"
        );
        self.publish(&applied);

        Ok(RollsReceived {
            material_id,
            rolls,
            quantity_remaining,
        })
    }

    /// Remove a roll; its full length leaves stock.
    #[instrument(skip_all, fields(roll_id = %roll_id), err(level = "warn"))]
    pub async fn remove_roll(&self, actor: &Actor, roll_id: RollId) -> Result<StockLevel, LedgerError> {
        let material_id = self
            .store
            .roll(roll_id)
            .await?
            .ok_or(DomainError::UnknownRoll(roll_id))?
            .material_id;

        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;
        let roll = tx
            .read_roll(roll_id)
            .await?
            .ok_or(DomainError::UnknownRoll(roll_id))?;
        let now = Utc::now();

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::RemoveRoll {
                material_id,
                roll_id,
                quantity: roll.quantity,
                occurred_at: now,
            },
        )
        .await?;
        tx.delete_roll(roll_id).await?;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Deleted,
            EntityKind::Roll,
            roll_id,
            format!(
                "removed roll of {} from '{}'",
                roll.quantity,
                applied.material.name()
            ),
            json!({
                "material_id": material_id,
                "quantity": roll.quantity,
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let level = applied.stock_level();
        info!(
            material_id = %material_id,
            quantity_remaining = level.quantity_remaining.value(),
            "roll removed"
        );
        self.publish(&applied);

        Ok(level)
    }

    /// Correct a roll's length; stock moves by the difference.
    #[instrument(skip_all, fields(roll_id = %roll_id, quantity = quantity), err(level = "warn"))]
    pub async fn resize_roll(
        &self,
        actor: &Actor,
        roll_id: RollId,
        quantity: i64,
    ) -> Result<RollResized, LedgerError> {
        let quantity = Quantity::positive(quantity)?;
        let material_id = self
            .store
            .roll(roll_id)
            .await?
            .ok_or(DomainError::UnknownRoll(roll_id))?
            .material_id;

        let _guard = self.locks.acquire(material_id).await;
        let mut tx = self.store.begin().await?;
        let roll = tx
            .read_roll(roll_id)
            .await?
            .ok_or(DomainError::UnknownRoll(roll_id))?;
        let resized = roll.resized(quantity)?;
        let now = Utc::now();

        let applied = apply_command(
            tx.as_mut(),
            actor,
            now,
            MaterialCommand::ResizeRoll {
                material_id,
                roll_id,
                from: roll.quantity,
                to: resized.quantity,
                occurred_at: now,
            },
        )
        .await?;
        tx.update_roll(&resized).await?;

        tx.append_log(&ActivityLogEntry::new(
            actor.clone(),
            ActivityAction::Updated,
            EntityKind::Roll,
            roll_id,
            format!(
                "resized roll of '{}' from {} to {}",
                applied.material.name(),
                roll.quantity,
                resized.quantity
            ),
            json!({
                "material_id": material_id,
                "quantity": { "before": roll.quantity, "after": resized.quantity },
                "stock": applied.stock_movement(),
            }),
            now,
        ))
        .await?;

        tx.commit().await?;

        let quantity_remaining = applied.quantity_remaining();
        info!(
            material_id = %material_id,
            quantity_remaining = quantity_remaining.value(),
            "roll resized"
        );
        self.publish(&applied);

        Ok(RollResized {
            roll: resized,
            quantity_remaining,
        })
    }
}
