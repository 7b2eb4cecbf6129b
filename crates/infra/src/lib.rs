//! Infrastructure layer: ledger service, storage, locks, read models, config.

pub mod config;
pub mod ledger;
pub mod locks;
pub mod projections;
pub mod store;
pub mod workers;

pub use ledger::{LedgerEnvelope, LedgerError, StockLedger};

mod integration_tests;
