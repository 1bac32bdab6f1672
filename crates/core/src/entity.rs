//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + AsRef<str>;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// True if the identifier carries a usable (non-blank) value.
    fn has_id(&self) -> bool {
        !self.id().as_ref().trim().is_empty()
    }
}
