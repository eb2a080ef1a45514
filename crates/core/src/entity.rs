//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Installments and payments are entities owned by an obligation aggregate; they
/// are addressed by id but only mutated through their aggregate.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
