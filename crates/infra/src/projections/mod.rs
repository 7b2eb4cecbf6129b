//! Read models fed from committed ledger events.

pub mod low_stock;

pub use low_stock::{LowStockEntry, LowStockProjection, LowStockProjectionError};
