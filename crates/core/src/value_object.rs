//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Two
/// `ProviderReference`s with the same id and metadata are the same reference;
/// a `Project`, by contrast, is an entity and is identified by its id.
///
/// The trait requires `Clone + PartialEq + Debug` so values can be copied into
/// commands, compared in tests and logged.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
