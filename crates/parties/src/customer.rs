use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{CustomerId, DomainError, DomainResult, Entity};

/// Editable customer attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl CustomerDetails {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        Ok(())
    }
}

/// A customer and the debt outstanding on their account (minor currency units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub details: CustomerDetails,
    pub debt: i64,
    pub registered_at: DateTime<Utc>,
}

impl Customer {
    pub fn register(
        id: CustomerId,
        details: CustomerDetails,
        registered_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        details.validate()?;
        Ok(Self {
            id,
            details,
            debt: 0,
            registered_at,
        })
    }

    /// Replace the editable attributes; debt is untouched.
    pub fn updated(&self, details: CustomerDetails) -> DomainResult<Self> {
        details.validate()?;
        Ok(Self {
            details,
            ..self.clone()
        })
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    /// Debt after adding `amount` (negative to pay down), rejecting results
    /// that do not fit the account.
    pub fn debt_after(&self, amount: i64) -> DomainResult<i64> {
        self.debt.checked_add(amount).ok_or_else(|| {
            DomainError::validation(format!(
                "charging {amount} would overflow the debt of customer '{}'",
                self.name()
            ))
        })
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str) -> CustomerDetails {
        CustomerDetails {
            name: name.to_string(),
            contact: Some("+90 555 000 0000".to_string()),
            location: Some("Merter".to_string()),
        }
    }

    #[test]
    fn register_starts_without_debt() {
        let c = Customer::register(CustomerId::new(), details("Atelier Nur"), Utc::now()).unwrap();
        assert_eq!(c.debt, 0);
        assert_eq!(c.name(), "Atelier Nur");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Customer::register(CustomerId::new(), details(" "), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_keeps_debt() {
        let mut c = Customer::register(CustomerId::new(), details("A"), Utc::now()).unwrap();
        c.debt = 4_200;
        let updated = c.updated(details("B")).unwrap();
        assert_eq!(updated.debt, 4_200);
        assert_eq!(updated.name(), "B");
    }

    #[test]
    fn debt_after_rejects_overflow() {
        let mut c = Customer::register(CustomerId::new(), details("Atelier Nur"), Utc::now()).unwrap();
        assert_eq!(c.debt_after(i64::MAX).unwrap(), i64::MAX);

        c.debt = i64::MAX;
        assert!(matches!(c.debt_after(1), Err(DomainError::Validation(_))));
        assert_eq!(c.debt_after(-i64::MAX).unwrap(), 0);

        c.debt = -1;
        assert!(matches!(c.debt_after(i64::MIN), Err(DomainError::Validation(_))));
    }
}
