use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::StreamExt;
use futures::{future, stream};

use orbit_core::TenantName;

use super::query::{DEFAULT_PAGE_SIZE, Predicate};
use super::r#trait::{Document, DocumentStore, DocumentStream, StoreError, document_id};

type Partitions = BTreeMap<TenantName, BTreeMap<String, Document>>;

/// In-memory partitioned document store.
///
/// Intended for tests/dev. Queries are served page by page (ordered by id,
/// resuming after the last id served) so consumers see the same lazy,
/// paginated behaviour a real backend gives them.
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStore {
    container: String,
    unique_keys: Vec<String>,
    page_size: usize,
    partitions: Arc<RwLock<Partitions>>,
}

impl InMemoryDocumentStore {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            unique_keys: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            partitions: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Declare a JSON pointer whose value must be unique within a partition.
    pub fn with_unique_key(mut self, pointer: impl Into<String>) -> Self {
        self.unique_keys.push(pointer.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of documents stored in `partition`.
    pub fn len(&self, partition: &TenantName) -> usize {
        self.partitions
            .read()
            .map(|p| p.get(partition).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, partition: &TenantName) -> bool {
        self.len(partition) == 0
    }

    fn poisoned(&self) -> StoreError {
        StoreError::Backend(format!("'{}' lock poisoned", self.container))
    }

    fn conflict(&self, message: String) -> StoreError {
        StoreError::Conflict {
            container: self.container.clone(),
            message,
        }
    }

    /// First unique key on which `document` collides with another document.
    fn unique_key_violation(
        &self,
        documents: &BTreeMap<String, Document>,
        id: &str,
        document: &Document,
    ) -> Option<String> {
        self.unique_keys.iter().find_map(|key| {
            let value = document.pointer(key)?;
            documents
                .iter()
                .any(|(other_id, other)| other_id != id && other.pointer(key) == Some(value))
                .then(|| format!("unique key '{key}' already holds {value}"))
        })
    }
}

/// Position of a query between pages: the id of the last document served,
/// like a backend continuation token. Documents added, removed or rewritten
/// behind the cursor do not shift the pages still to come.
#[derive(Debug, Clone)]
enum Continuation {
    Start,
    After(String),
    Done,
}

fn read_page(
    partitions: &RwLock<Partitions>,
    container: &str,
    partition: &TenantName,
    predicate: &Predicate,
    after: Option<&str>,
    page_size: usize,
) -> Result<Vec<(String, Document)>, StoreError> {
    let partitions = partitions
        .read()
        .map_err(|_| StoreError::Backend(format!("'{container}' lock poisoned")))?;

    let Some(docs) = partitions.get(partition) else {
        return Ok(Vec::new());
    };
    let lower = match after {
        Some(id) => Bound::Excluded(id),
        None => Bound::Unbounded,
    };

    Ok(docs
        .range::<str, _>((lower, Bound::Unbounded))
        .filter(|(_, doc)| predicate.matches(doc))
        .take(page_size)
        .map(|(id, doc)| (id.clone(), doc.clone()))
        .collect())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn container(&self) -> &str {
        &self.container
    }

    async fn create(&self, partition: &TenantName, document: Document) -> Result<Document, StoreError> {
        let id = document_id(&document)?.to_string();
        let mut partitions = self.partitions.write().map_err(|_| self.poisoned())?;
        let documents = partitions.entry(partition.clone()).or_default();

        if documents.contains_key(&id) {
            return Err(self.conflict(format!("id '{id}' already exists")));
        }
        if let Some(violation) = self.unique_key_violation(documents, &id, &document) {
            return Err(self.conflict(violation));
        }

        documents.insert(id, document.clone());
        Ok(document)
    }

    async fn read(&self, partition: &TenantName, id: &str) -> Result<Document, StoreError> {
        let partitions = self.partitions.read().map_err(|_| self.poisoned())?;
        partitions
            .get(partition)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                container: self.container.clone(),
                id: id.to_string(),
            })
    }

    fn query(&self, partition: &TenantName, predicate: Predicate) -> DocumentStream {
        let partitions = self.partitions.clone();
        let container = self.container.clone();
        let partition = partition.clone();
        let page_size = self.page_size;

        stream::unfold(Continuation::Start, move |cursor| {
            let after = match &cursor {
                Continuation::Start => None,
                Continuation::After(id) => Some(id.as_str()),
                Continuation::Done => return future::ready(None),
            };
            let page = read_page(&partitions, &container, &partition, &predicate, after, page_size);
            future::ready(match page {
                Ok(docs) if docs.is_empty() => None,
                Ok(docs) => {
                    let next = match docs.last() {
                        Some((id, _)) if docs.len() == page_size => Continuation::After(id.clone()),
                        _ => Continuation::Done,
                    };
                    Some((docs.into_iter().map(|(_, doc)| Ok(doc)).collect::<Vec<_>>(), next))
                }
                Err(e) => Some((vec![Err(e)], Continuation::Done)),
            })
        })
        .flat_map(stream::iter)
        .boxed()
    }

    async fn upsert(&self, partition: &TenantName, document: Document) -> Result<Document, StoreError> {
        let id = document_id(&document)?.to_string();
        let mut partitions = self.partitions.write().map_err(|_| self.poisoned())?;
        let documents = partitions.entry(partition.clone()).or_default();

        if let Some(violation) = self.unique_key_violation(documents, &id, &document) {
            return Err(self.conflict(violation));
        }

        documents.insert(id, document.clone());
        Ok(document)
    }

    async fn delete(&self, partition: &TenantName, id: &str) -> Result<Document, StoreError> {
        let mut partitions = self.partitions.write().map_err(|_| self.poisoned())?;
        partitions
            .get_mut(partition)
            .and_then(|docs| docs.remove(id))
            .ok_or_else(|| StoreError::NotFound {
                container: self.container.clone(),
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::json;

    use super::*;

    fn tenant(name: &str) -> TenantName {
        TenantName::new(name)
    }

    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new("projects").with_unique_key("/name")
    }

    #[tokio::test]
    async fn create_detects_id_and_unique_key_conflicts() {
        let store = store();
        let t = tenant("t1");

        store.create(&t, json!({ "id": "1", "name": "a" })).await.unwrap();

        let dup_id = store.create(&t, json!({ "id": "1", "name": "b" })).await.unwrap_err();
        assert!(dup_id.is_conflict());

        let dup_name = store.create(&t, json!({ "id": "2", "name": "a" })).await.unwrap_err();
        assert!(dup_name.is_conflict());

        assert_eq!(store.len(&t), 1);
    }

    #[tokio::test]
    async fn partitions_are_isolated() {
        let store = store();
        store.create(&tenant("t1"), json!({ "id": "1", "name": "a" })).await.unwrap();
        store.create(&tenant("t2"), json!({ "id": "1", "name": "a" })).await.unwrap();

        assert!(store.read(&tenant("t3"), "1").await.unwrap_err().is_not_found());
        assert_eq!(store.len(&tenant("t1")), 1);
        assert_eq!(store.len(&tenant("t2")), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_but_keeps_unique_keys() {
        let store = store();
        let t = tenant("t1");
        store.create(&t, json!({ "id": "1", "name": "a" })).await.unwrap();
        store.create(&t, json!({ "id": "2", "name": "b" })).await.unwrap();

        store.upsert(&t, json!({ "id": "1", "name": "a2" })).await.unwrap();
        assert_eq!(store.read(&t, "1").await.unwrap()["name"], "a2");

        let err = store.upsert(&t, json!({ "id": "1", "name": "b" })).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn delete_reports_not_found_the_second_time() {
        let store = store();
        let t = tenant("t1");
        store.create(&t, json!({ "id": "1", "name": "a" })).await.unwrap();

        assert_eq!(store.delete(&t, "1").await.unwrap()["name"], "a");
        assert!(store.delete(&t, "1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn query_pages_through_all_matches() {
        let store = InMemoryDocumentStore::new("users").with_page_size(2);
        let t = tenant("t1");
        for i in 0..5 {
            let role = if i % 2 == 0 { "Admin" } else { "None" };
            store
                .create(&t, json!({ "id": format!("u{i}"), "role": role }))
                .await
                .unwrap();
        }

        let all: Vec<_> = store.query(&t, Predicate::All).try_collect().await.unwrap();
        assert_eq!(all.len(), 5);

        let admins: Vec<_> = store
            .query(&t, Predicate::field_equals("/role", "Admin"))
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<_> = admins.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["u0", "u2", "u4"]);
    }

    #[tokio::test]
    async fn deleting_while_paging_skips_nothing() {
        let store = InMemoryDocumentStore::new("projects").with_page_size(2);
        let t = tenant("t1");
        for i in 0..5 {
            store.create(&t, json!({ "id": format!("p{i}") })).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut stream = store.query(&t, Predicate::All);
        while let Some(doc) = stream.try_next().await.unwrap() {
            let id = doc["id"].as_str().unwrap().to_string();
            store.delete(&t, &id).await.unwrap();
            seen.push(id);
        }

        assert_eq!(seen, vec!["p0", "p1", "p2", "p3", "p4"]);
        assert!(store.is_empty(&t));
    }

    #[tokio::test]
    async fn documents_without_id_are_rejected() {
        let store = store();
        let err = store.create(&tenant("t1"), json!({ "name": "x" })).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument(_)));
    }
}
