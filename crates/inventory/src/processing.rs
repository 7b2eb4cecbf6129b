use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{
    DomainError, DomainResult, Entity, MaterialId, ProcessingRecordId, Quantity,
};

/// Reconciliation state of a processing record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Nothing has come back yet.
    Sent,
    /// Some, but not all, of the shipment has come back.
    Partial,
    /// Fully reconciled.
    Returned,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Sent => "sent",
            ProcessingStatus::Partial => "partial",
            ProcessingStatus::Returned => "returned",
        }
    }
}

impl core::str::FromStr for ProcessingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(ProcessingStatus::Sent),
            "partial" => Ok(ProcessingStatus::Partial),
            "returned" => Ok(ProcessingStatus::Returned),
            other => Err(DomainError::validation(format!("unknown processing status '{other}'"))),
        }
    }
}

/// Material temporarily out of sellable stock at an external processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRecord {
    pub id: ProcessingRecordId,
    pub material_id: MaterialId,
    pub provider: Option<String>,
    pub quantity_sent: Quantity,
    pub quantity_returned: Quantity,
    pub status: ProcessingStatus,
    pub sent_at: DateTime<Utc>,
    pub last_received_at: Option<DateTime<Utc>>,
}

impl ProcessingRecord {
    pub fn send(
        id: ProcessingRecordId,
        material_id: MaterialId,
        quantity: Quantity,
        provider: Option<String>,
        sent_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity.is_zero() {
            return Err(DomainError::invalid_quantity(0));
        }
        Ok(Self {
            id,
            material_id,
            provider: provider.filter(|p| !p.trim().is_empty()),
            quantity_sent: quantity,
            quantity_returned: Quantity::ZERO,
            status: ProcessingStatus::Sent,
            sent_at,
            last_received_at: None,
        })
    }

    /// Amount still out at the processor.
    pub fn outstanding(&self) -> Quantity {
        self.quantity_sent
            .checked_sub(self.quantity_returned)
            .unwrap_or(Quantity::ZERO)
    }

    /// Whether the record still holds material away from stock.
    pub fn is_open(&self) -> bool {
        self.status != ProcessingStatus::Returned
    }

    /// Reconcile a receipt, returning the updated record.
    ///
    /// Receipts against a fully returned record, or larger than what is still
    /// outstanding, fail with `OverReturn`. A zero receipt on a record nothing
    /// has come back from keeps it `sent`.
    pub fn receive(&self, quantity: Quantity, received_at: DateTime<Utc>) -> DomainResult<Self> {
        let outstanding = self.outstanding();
        if self.status == ProcessingStatus::Returned || quantity > outstanding {
            return Err(DomainError::OverReturn {
                record_id: self.id,
                requested: quantity.value(),
                outstanding: outstanding.value(),
            });
        }

        let quantity_returned = self
            .quantity_returned
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invalid_quantity(quantity.value()))?;

        let status = if quantity_returned == self.quantity_sent {
            ProcessingStatus::Returned
        } else if quantity_returned.is_zero() {
            ProcessingStatus::Sent
        } else {
            ProcessingStatus::Partial
        };

        Ok(Self {
            quantity_returned,
            status,
            last_received_at: Some(received_at),
            ..self.clone()
        })
    }
}

impl Entity for ProcessingRecord {
    type Id = ProcessingRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(v: i64) -> Quantity {
        Quantity::non_negative(v).unwrap()
    }

    fn sent(quantity: i64) -> ProcessingRecord {
        ProcessingRecord::send(
            ProcessingRecordId::new(),
            MaterialId::new(),
            q(quantity),
            Some("Dyehouse Kaya".to_string()),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn partial_then_full_receipt_reconciles() {
        let record = sent(10);
        let record = record.receive(q(4), Utc::now()).unwrap();
        assert_eq!(record.status, ProcessingStatus::Partial);
        assert_eq!(record.outstanding(), q(6));

        let record = record.receive(q(6), Utc::now()).unwrap();
        assert_eq!(record.status, ProcessingStatus::Returned);
        assert!(!record.is_open());
    }

    #[test]
    fn over_return_is_rejected() {
        let record = sent(5).receive(q(2), Utc::now()).unwrap();
        let err = record.receive(q(4), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::OverReturn { record_id: record.id, requested: 4, outstanding: 3 }
        );
    }

    #[test]
    fn returned_record_accepts_nothing_more() {
        let record = sent(2).receive(q(2), Utc::now()).unwrap();
        assert!(matches!(
            record.receive(Quantity::ZERO, Utc::now()),
            Err(DomainError::OverReturn { outstanding: 0, .. })
        ));
    }

    #[test]
    fn zero_receipt_keeps_untouched_record_sent() {
        let record = sent(3).receive(Quantity::ZERO, Utc::now()).unwrap();
        assert_eq!(record.status, ProcessingStatus::Sent);
        assert!(record.last_received_at.is_some());
    }

    #[test]
    fn blank_provider_is_dropped() {
        let record = ProcessingRecord::send(
            ProcessingRecordId::new(),
            MaterialId::new(),
            q(1),
            Some("  ".to_string()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.provider, None);
    }
}
