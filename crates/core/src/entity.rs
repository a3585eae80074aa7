//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stock documents are entities keyed by their document id; stock lines are
/// addressed by the farmer order they were built from.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
