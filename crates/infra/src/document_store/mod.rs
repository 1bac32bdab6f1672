//! Partitioned document store boundary.
//!
//! This module defines the store abstraction the repositories are written
//! against, without making any assumption about the backend. Every call is
//! scoped to a tenant partition.

pub mod in_memory;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use query::{DEFAULT_PAGE_SIZE, Predicate};
pub use r#trait::{Document, DocumentStore, DocumentStream, StoreError, document_id};
