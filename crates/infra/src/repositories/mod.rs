//! Tenant-scoped repositories over the document store.
//!
//! `ProjectRepository` is the aggregate-root repository: it enforces project
//! identity, computes the project's membership view from the user store and
//! cascades removals to memberships and links. `UserRepository` and
//! `ProjectLinkRepository` own those dependent records and expose the narrow
//! [`MembershipStore`] / [`LinkStore`] seams the project repository needs.

pub mod error;
pub mod links;
pub mod projects;
pub mod users;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;

use orbit_core::ProjectId;
use orbit_model::User;

use crate::document_store::Document;

pub use error::RepositoryError;
pub use links::ProjectLinkRepository;
pub use projects::ProjectRepository;
pub use users::UserRepository;

/// Lazy, single-pass sequence of repository items.
pub type EntityStream<T> = BoxStream<'static, Result<T, RepositoryError>>;

/// Membership side of the user store, as seen by the project repository.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Users holding a membership in `project_id`.
    async fn list_users_by_project(&self, project_id: &ProjectId) -> Result<Vec<User>, RepositoryError>;

    /// Drop every membership in `project_id`. Returns how many users changed.
    async fn remove_project_memberships(&self, project_id: &ProjectId) -> Result<usize, RepositoryError>;
}

/// Link side of the store, as seen by the project repository.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Delete every link owned by `project_id`. Returns how many were removed.
    async fn remove_project_links(&self, project_id: &ProjectId) -> Result<usize, RepositoryError>;
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Document, RepositoryError> {
    Ok(serde_json::to_value(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(document: Document) -> Result<T, RepositoryError> {
    Ok(serde_json::from_value(document)?)
}
