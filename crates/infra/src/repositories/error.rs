use thiserror::Error;

use orbit_core::{DomainError, ProjectId};

use crate::document_store::StoreError;

/// Repository operation error.
///
/// `NotFound` is deliberately absent: read and delete paths turn a missing
/// document into `Ok(None)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// The payload failed schema or business-rule validation (never retried).
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A document with the same identity already exists (never retried).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The project document is gone but its dependent records were not all
    /// cleaned up.
    #[error(
        "cleanup after removing project '{project_id}' incomplete (memberships: {}, links: {})",
        outcome(.memberships),
        outcome(.links)
    )]
    PartialFailure {
        project_id: ProjectId,
        memberships: Option<Box<RepositoryError>>,
        links: Option<Box<RepositoryError>>,
    },

    /// Stored data could not be mapped to or from the domain type.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Store(StoreError),
}

fn outcome(error: &Option<Box<RepositoryError>>) -> String {
    match error {
        Some(e) => format!("failed: {e}"),
        None => "ok".to_string(),
    }
}

impl From<StoreError> for RepositoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { message, .. } => RepositoryError::Conflict(message),
            other => RepositoryError::Store(other),
        }
    }
}

impl From<DomainError> for RepositoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Conflict(msg) => RepositoryError::Conflict(msg),
            other => RepositoryError::ValidationFailed(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(value: serde_json::Error) -> Self {
        RepositoryError::Serialization(value.to_string())
    }
}
