use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{CustomerId, DomainError, DomainResult, Entity, MaterialId, Quantity, SaleId};

/// A recorded sale. Immutable once recorded; removing it is the only way to
/// undo its stock effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub material_id: MaterialId,
    /// `None` for walk-in customers.
    pub customer_id: Option<CustomerId>,
    pub quantity: Quantity,
    /// Price per unit of measure, in minor currency units.
    pub unit_price: u64,
    /// Part of the price left on the customer's account (minor units).
    pub amount_due: u64,
    pub sold_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(
        id: SaleId,
        material_id: MaterialId,
        customer_id: Option<CustomerId>,
        quantity: Quantity,
        unit_price: u64,
        amount_due: u64,
        sold_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity.is_zero() {
            return Err(DomainError::invalid_quantity(0));
        }
        if amount_due > 0 && customer_id.is_none() {
            return Err(DomainError::validation(
                "amount_due requires a customer to charge",
            ));
        }
        Ok(Self {
            id,
            material_id,
            customer_id,
            quantity,
            unit_price,
            amount_due,
            sold_at,
        })
    }

    /// Total price of the sale in minor units (saturating).
    pub fn total_price(&self) -> u64 {
        self.unit_price
            .saturating_mul(u64::try_from(self.quantity.value()).unwrap_or(0))
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_price_multiplies_quantity() {
        let sale = Sale::new(
            SaleId::new(),
            MaterialId::new(),
            None,
            Quantity::positive(3).unwrap(),
            1_250,
            0,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(sale.total_price(), 3_750);
    }

    #[test]
    fn walk_in_sale_cannot_carry_debt() {
        let err = Sale::new(
            SaleId::new(),
            MaterialId::new(),
            None,
            Quantity::positive(1).unwrap(),
            100,
            100,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
