//! `orbit-core`: foundation building blocks shared by every layer.
//!
//! This crate contains **pure** primitives (no IO, no async, no storage).

pub mod entity;
pub mod error;
pub mod id;
pub mod validate;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CommandId, ProjectId, ProviderId, TenantName, UserId};
pub use validate::Validate;
pub use value_object::ValueObject;
