//! Inventory domain module.
//!
//! Business rules for materials and the records that move their stock (sales,
//! processing shipments, rolls), implemented as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod material;
pub mod processing;
pub mod roll;
pub mod sale;

#[cfg(test)]
mod properties;

pub use material::{
    Material, MaterialCommand, MaterialDetails, MaterialEvent, MaterialKind, UnitOfMeasure,
};
pub use processing::{ProcessingRecord, ProcessingStatus};
pub use roll::Roll;
pub use sale::Sale;
