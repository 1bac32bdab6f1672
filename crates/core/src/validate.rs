//! Payload validation (schema + business rules).

use crate::error::DomainResult;

/// Types that can check their own schema and business rules.
///
/// Validation is pure: it never touches storage. Repositories call it before
/// any store interaction so an invalid payload never reaches the backend.
pub trait Validate {
    fn validate(&self) -> DomainResult<()>;
}
