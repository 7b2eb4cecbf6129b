//! Domain error model.

use thiserror::Error;

use crate::id::{CustomerId, MaterialId, ProcessingRecordId, RollId, SaleId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is recoverable and user-facing: it carries enough context for
/// the caller to render a corrective message. Infrastructure failures (storage
/// unavailable) are modelled elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A quantity was zero or negative where a positive one is required.
    #[error("invalid quantity: {requested}")]
    InvalidQuantity { requested: i64 },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("unknown material {0}")]
    UnknownMaterial(MaterialId),

    #[error("unknown sale {0}")]
    UnknownSale(SaleId),

    #[error("unknown processing record {0}")]
    UnknownRecord(ProcessingRecordId),

    #[error("unknown roll {0}")]
    UnknownRoll(RollId),

    #[error("unknown customer {0}")]
    UnknownCustomer(CustomerId),

    /// The operation would drive quantity-on-hand below zero.
    #[error("insufficient stock for material {material_id}: requested {requested}, available {available}")]
    InsufficientStock {
        material_id: MaterialId,
        requested: i64,
        available: i64,
    },

    /// A processing return exceeds what is still outstanding on the record.
    #[error("over-return on processing record {record_id}: requested {requested}, outstanding {outstanding}")]
    OverReturn {
        record_id: ProcessingRecordId,
        requested: i64,
        outstanding: i64,
    },

    /// The material is still referenced and cannot be deleted.
    #[error("material {material_id} is referenced by {sales} sale(s) and {open_processing} open processing record(s)")]
    MaterialInUse {
        material_id: MaterialId,
        sales: usize,
        open_processing: usize,
    },

    /// A conflict occurred (duplicate identity, stale version).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_quantity(requested: i64) -> Self {
        Self::InvalidQuantity { requested }
    }

    /// Stable, wire-level name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "Validation",
            DomainError::InvalidQuantity { .. } => "InvalidQuantity",
            DomainError::InvalidId(_) => "InvalidId",
            DomainError::UnknownMaterial(_) => "UnknownMaterial",
            DomainError::UnknownSale(_) => "UnknownSale",
            DomainError::UnknownRecord(_) => "UnknownRecord",
            DomainError::UnknownRoll(_) => "UnknownRoll",
            DomainError::UnknownCustomer(_) => "UnknownCustomer",
            DomainError::InsufficientStock { .. } => "InsufficientStock",
            DomainError::OverReturn { .. } => "OverReturn",
            DomainError::MaterialInUse { .. } => "MaterialInUse",
            DomainError::Conflict(_) => "Conflict",
        }
    }
}
