use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;
use thiserror::Error;

use orbit_core::TenantName;

use super::query::Predicate;

/// A stored JSON document. Every document carries a string `id` field.
pub type Document = JsonValue;

/// Lazy, single-pass, paginated query result.
pub type DocumentStream = BoxStream<'static, Result<Document, StoreError>>;

/// Document store operation error.
///
/// These are **infrastructure errors**. Repositories translate `NotFound` into
/// empty results where the read/delete contract tolerates it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A document with the same id or unique key already exists in the partition.
    #[error("conflict in '{container}': {message}")]
    Conflict { container: String, message: String },

    #[error("document '{id}' not found in '{container}'")]
    NotFound { container: String, id: String },

    /// The document is not an object with a non-blank string `id`.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Partitioned document store (one instance per container/collection).
///
/// ## Contract
///
/// - every call is scoped to one partition (the tenant); documents in other
///   partitions are invisible
/// - `create` detects conflicts on `id` and on the container's unique keys
/// - `read` and `delete` report `NotFound` for missing documents
/// - `upsert` creates or replaces by `id` (still enforcing unique keys)
/// - `query` returns a lazy stream that fetches pages as it is polled
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the container, used in errors and logs.
    fn container(&self) -> &str;

    async fn create(&self, partition: &TenantName, document: Document) -> Result<Document, StoreError>;

    async fn read(&self, partition: &TenantName, id: &str) -> Result<Document, StoreError>;

    fn query(&self, partition: &TenantName, predicate: Predicate) -> DocumentStream;

    async fn upsert(&self, partition: &TenantName, document: Document) -> Result<Document, StoreError>;

    /// Delete by id, returning the removed document.
    async fn delete(&self, partition: &TenantName, id: &str) -> Result<Document, StoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn container(&self) -> &str {
        (**self).container()
    }

    async fn create(&self, partition: &TenantName, document: Document) -> Result<Document, StoreError> {
        (**self).create(partition, document).await
    }

    async fn read(&self, partition: &TenantName, id: &str) -> Result<Document, StoreError> {
        (**self).read(partition, id).await
    }

    fn query(&self, partition: &TenantName, predicate: Predicate) -> DocumentStream {
        (**self).query(partition, predicate)
    }

    async fn upsert(&self, partition: &TenantName, document: Document) -> Result<Document, StoreError> {
        (**self).upsert(partition, document).await
    }

    async fn delete(&self, partition: &TenantName, id: &str) -> Result<Document, StoreError> {
        (**self).delete(partition, id).await
    }
}

/// Extract the string `id` of a document.
pub fn document_id(document: &Document) -> Result<&str, StoreError> {
    document
        .get("id")
        .and_then(JsonValue::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| StoreError::InvalidDocument("missing non-blank string `id`".to_string()))
}
