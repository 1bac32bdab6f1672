use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use orbit_core::{ProviderId, TenantName, Validate};
use orbit_model::Project;

use super::{EntityStream, LinkStore, MembershipStore, RepositoryError, decode, encode};
use crate::document_store::{Document, DocumentStore, Predicate, StoreError};

/// Repository for the project aggregate root.
///
/// ## Contract
///
/// - every operation is scoped to `partition` (the tenant)
/// - returned projects always carry a freshly computed `users` view
/// - `remove` is idempotent and cascades to memberships and links
pub struct ProjectRepository<S, U, L> {
    partition: TenantName,
    store: S,
    users: Arc<U>,
    links: Arc<L>,
}

impl<S, U, L> ProjectRepository<S, U, L>
where
    S: DocumentStore,
    U: MembershipStore + 'static,
    L: LinkStore + 'static,
{
    pub fn new(partition: TenantName, store: S, users: Arc<U>, links: Arc<L>) -> Self {
        Self {
            partition,
            store,
            users,
            links,
        }
    }

    pub fn partition(&self) -> &TenantName {
        &self.partition
    }

    /// Persist a new project. Name and id collisions surface as `Conflict`.
    pub async fn add(&self, project: Project) -> Result<Project, RepositoryError> {
        project.validate()?;

        let stored = self
            .store
            .create(&self.partition, encode(&project)?)
            .await
            .inspect_err(|e| {
                if e.is_conflict() {
                    warn!(project_id = %project.id, name = %project.name, "project already exists");
                }
            })?;

        info!(project_id = %project.id, tenant = %self.partition, "project added");
        self.hydrate(stored).await
    }

    /// Resolve by id first, then by name.
    pub async fn get(&self, name_or_id: &str) -> Result<Option<Project>, RepositoryError> {
        match self.store.read(&self.partition, name_or_id).await {
            Ok(doc) => return self.hydrate(doc).await.map(Some),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        debug!(name = %name_or_id, "no project with this id, trying name");
        let mut matches = self
            .store
            .query(&self.partition, Predicate::field_equals("/name", name_or_id));
        match matches.next().await {
            Some(doc) => self.hydrate(doc?).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn name_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        Ok(self.get(name).await?.is_some())
    }

    pub async fn set(&self, project: Project) -> Result<Project, RepositoryError> {
        project.validate()?;
        let stored = self.store.upsert(&self.partition, encode(&project)?).await?;
        self.hydrate(stored).await
    }

    pub fn list(&self) -> EntityStream<Project> {
        self.stream(Predicate::All)
    }

    /// Projects whose id or name is in `names_or_ids`.
    pub fn list_by_ids<I, V>(&self, names_or_ids: I) -> EntityStream<Project>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let keys: Vec<String> = names_or_ids
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .collect();
        self.stream(Predicate::or([
            Predicate::field_in("/id", keys.clone()),
            Predicate::field_in("/name", keys),
        ]))
    }

    /// Projects whose type references `provider_id`.
    pub fn list_by_provider(&self, provider_id: &ProviderId) -> EntityStream<Project> {
        self.stream(Predicate::any_element_equals(
            "/type/providers",
            "/id",
            provider_id.as_str(),
        ))
    }

    /// Delete the project, then drop its memberships and links.
    ///
    /// Both cleanups always run, keyed on `project.id`, before the deleted
    /// document is decoded. If either fails the project document is already
    /// gone and `PartialFailure` reports which side failed.
    pub async fn remove(&self, project: &Project) -> Result<Option<Project>, RepositoryError> {
        let doc = match self.store.delete(&self.partition, project.id.as_str()).await {
            Ok(doc) => doc,
            Err(e) if e.is_not_found() => {
                debug!(project_id = %project.id, "project already removed");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let (memberships, links) = tokio::join!(
            self.users.remove_project_memberships(&project.id),
            self.links.remove_project_links(&project.id),
        );

        if memberships.is_err() || links.is_err() {
            let error = RepositoryError::PartialFailure {
                project_id: project.id.clone(),
                memberships: memberships.err().map(Box::new),
                links: links.err().map(Box::new),
            };
            warn!(project_id = %project.id, error = %error, "project removed with incomplete cleanup");
            return Err(error);
        }

        let removed: Project = decode(doc)?;
        info!(project_id = %removed.id, tenant = %self.partition, "project removed");
        Ok(Some(removed))
    }

    /// Replace `project.users` with the members currently in the user store.
    pub async fn populate_users(&self, project: &mut Project) -> Result<(), RepositoryError> {
        populate_users(self.users.as_ref(), project).await
    }

    async fn hydrate(&self, doc: Document) -> Result<Project, RepositoryError> {
        let mut project: Project = decode(doc)?;
        self.populate_users(&mut project).await?;
        Ok(project)
    }

    fn stream(&self, predicate: Predicate) -> EntityStream<Project> {
        let users = self.users.clone();
        self.store
            .query(&self.partition, predicate)
            .then(move |doc: Result<Document, StoreError>| {
                let users = users.clone();
                async move {
                    let mut project: Project = decode(doc?)?;
                    populate_users(users.as_ref(), &mut project).await?;
                    Ok::<_, RepositoryError>(project)
                }
            })
            .boxed()
    }
}

async fn populate_users<U>(users: &U, project: &mut Project) -> Result<(), RepositoryError>
where
    U: MembershipStore + ?Sized,
{
    project.users = users.list_users_by_project(&project.id).await?;
    Ok(())
}
