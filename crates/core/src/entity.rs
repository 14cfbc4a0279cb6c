//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// The identifier renders through `Display`; storage adapters use that text as
/// the row key.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
