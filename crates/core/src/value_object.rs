//! Value objects: equality by value, not identity.
//!
//! Value objects have **no identity** - they are defined entirely by their
//! attribute values. Two quantities of `4` are the same quantity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one (`Quantity::checked_sub` returns a new quantity).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A non-negative amount of a material, expressed in the material's unit of
/// measure.
///
/// Deserialization rejects negative values, so a `Quantity` read off the wire
/// or out of storage always satisfies the non-negativity invariant.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// A quantity that must be strictly positive (a sale, a shipment, a roll).
    pub fn positive(value: i64) -> DomainResult<Self> {
        if value <= 0 {
            return Err(DomainError::invalid_quantity(value));
        }
        Ok(Self(value))
    }

    /// A quantity that may be zero (stock levels, processing receipts).
    pub fn non_negative(value: i64) -> DomainResult<Self> {
        if value < 0 {
            return Err(DomainError::invalid_quantity(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtract, returning `None` when the result would be negative.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        let v = self.0.checked_sub(other.0)?;
        (v >= 0).then_some(Quantity(v))
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// Apply a signed delta, returning `None` when the result would be negative.
    pub fn checked_apply(self, delta: i64) -> Option<Quantity> {
        let v = self.0.checked_add(delta)?;
        (v >= 0).then_some(Quantity(v))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Quantity::non_negative(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Who performed a mutation (recorded on every activity log entry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl ValueObject for Actor {}

impl Actor {
    pub const ANONYMOUS: &'static str = "anonymous";

    /// Build an actor from a free-form name; blank names become `anonymous`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Self::anonymous();
        }
        Self(trimmed.to_string())
    }

    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rejects_zero_and_negative() {
        assert_eq!(
            Quantity::positive(0).unwrap_err(),
            DomainError::InvalidQuantity { requested: 0 }
        );
        assert!(Quantity::positive(-3).is_err());
        assert_eq!(Quantity::positive(5).unwrap().value(), 5);
    }

    #[test]
    fn checked_sub_never_goes_negative() {
        let ten = Quantity::positive(10).unwrap();
        let four = Quantity::positive(4).unwrap();
        assert_eq!(ten.checked_sub(four).unwrap().value(), 6);
        assert!(four.checked_sub(ten).is_none());
        assert!(four.checked_apply(-5).is_none());
        assert_eq!(four.checked_apply(-4).unwrap(), Quantity::ZERO);
    }

    #[test]
    fn deserializing_a_negative_quantity_fails() {
        assert!(serde_json::from_str::<Quantity>("-1").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("7").unwrap().value(), 7);
    }

    #[test]
    fn blank_actor_is_anonymous() {
        assert_eq!(Actor::new("   ").as_str(), "anonymous");
        assert_eq!(Actor::new(" ayse ").as_str(), "ayse");
    }
}
