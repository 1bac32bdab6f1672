use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info};

use orbit_core::{ProjectId, TenantName, Validate};
use orbit_model::ProjectLink;

use super::{EntityStream, LinkStore, RepositoryError, decode, encode};
use crate::document_store::{DocumentStore, Predicate};

/// Links owned by the projects of one tenant.
pub struct ProjectLinkRepository<S> {
    partition: TenantName,
    store: S,
}

impl<S> ProjectLinkRepository<S>
where
    S: DocumentStore,
{
    pub fn new(partition: TenantName, store: S) -> Self {
        Self { partition, store }
    }

    pub async fn add(&self, link: ProjectLink) -> Result<ProjectLink, RepositoryError> {
        link.validate()?;
        let stored = self.store.create(&self.partition, encode(&link)?).await?;
        decode(stored)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ProjectLink>, RepositoryError> {
        match self.store.read(&self.partition, id).await {
            Ok(doc) => Ok(Some(decode(doc)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set(&self, link: ProjectLink) -> Result<ProjectLink, RepositoryError> {
        link.validate()?;
        let stored = self.store.upsert(&self.partition, encode(&link)?).await?;
        decode(stored)
    }

    pub async fn remove(&self, id: &str) -> Result<Option<ProjectLink>, RepositoryError> {
        match self.store.delete(&self.partition, id).await {
            Ok(doc) => Ok(Some(decode(doc)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_by_project(&self, project_id: &ProjectId) -> EntityStream<ProjectLink> {
        self.store
            .query(
                &self.partition,
                Predicate::field_equals("/projectId", project_id.as_str()),
            )
            .map(|doc| decode::<ProjectLink>(doc.map_err(RepositoryError::from)?))
            .boxed()
    }
}

#[async_trait]
impl<S> LinkStore for ProjectLinkRepository<S>
where
    S: DocumentStore,
{
    async fn remove_project_links(&self, project_id: &ProjectId) -> Result<usize, RepositoryError> {
        let links: Vec<ProjectLink> = self.list_by_project(project_id).try_collect().await?;

        let mut removed = 0;
        for link in links {
            // A concurrent removal already did the work.
            if self.remove(&link.id).await?.is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(project_id = %project_id, links = removed, "removed project links");
        } else {
            debug!(project_id = %project_id, "no project links to remove");
        }
        Ok(removed)
    }
}
