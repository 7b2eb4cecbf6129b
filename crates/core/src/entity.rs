//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Sales, processing records, rolls and customers are entities: they are
/// looked up and referenced by id, but they do not guard a stock invariant.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
