use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info};

use orbit_core::{ProjectId, TenantName, UserId, Validate};
use orbit_model::{User, UserRole};

use super::{EntityStream, MembershipStore, RepositoryError, decode, encode};
use crate::document_store::{DocumentStore, Predicate, StoreError};

/// Users of one tenant, including their project memberships.
pub struct UserRepository<S> {
    partition: TenantName,
    store: S,
}

impl<S> UserRepository<S>
where
    S: DocumentStore,
{
    pub fn new(partition: TenantName, store: S) -> Self {
        Self { partition, store }
    }

    pub fn partition(&self) -> &TenantName {
        &self.partition
    }

    pub async fn add(&self, user: User) -> Result<User, RepositoryError> {
        user.validate()?;
        let stored = self.store.create(&self.partition, encode(&user)?).await?;
        decode(stored)
    }

    pub async fn get(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        match self.store.read(&self.partition, id.as_str()).await {
            Ok(doc) => Ok(Some(decode(doc)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set(&self, user: User) -> Result<User, RepositoryError> {
        user.validate()?;
        let stored = self.store.upsert(&self.partition, encode(&user)?).await?;
        decode(stored)
    }

    pub async fn remove(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        match self.store.delete(&self.partition, id.as_str()).await {
            Ok(doc) => Ok(Some(decode(doc)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(&self) -> EntityStream<User> {
        self.stream(Predicate::All)
    }

    pub fn list_by_project(&self, project_id: &ProjectId) -> EntityStream<User> {
        self.stream(Predicate::any_element_equals(
            "/projectMemberships",
            "/projectId",
            project_id.as_str(),
        ))
    }

    pub fn list_admins(&self) -> EntityStream<User> {
        self.stream(Predicate::field_equals("/role", role_name(UserRole::Admin)))
    }

    /// Drop `user_id`'s membership in `project_id`, if any.
    pub async fn remove_project_membership(
        &self,
        user_id: &UserId,
        project_id: &ProjectId,
    ) -> Result<Option<User>, RepositoryError> {
        let Some(mut user) = self.get(user_id).await? else {
            return Ok(None);
        };
        if !user.remove_membership(project_id) {
            return Ok(Some(user));
        }
        self.set(user).await.map(Some)
    }

    fn stream(&self, predicate: Predicate) -> EntityStream<User> {
        self.store
            .query(&self.partition, predicate)
            .map(|doc| decode::<User>(doc.map_err(RepositoryError::from)?))
            .boxed()
    }
}

fn role_name(role: UserRole) -> String {
    serde_json::to_value(role)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[async_trait]
impl<S> MembershipStore for UserRepository<S>
where
    S: DocumentStore,
{
    async fn list_users_by_project(&self, project_id: &ProjectId) -> Result<Vec<User>, RepositoryError> {
        self.list_by_project(project_id).try_collect().await
    }

    async fn remove_project_memberships(&self, project_id: &ProjectId) -> Result<usize, RepositoryError> {
        // Collect first so every upsert runs outside the query's page reads.
        let members: Vec<User> = self.list_by_project(project_id).try_collect().await?;

        let mut changed = 0;
        for mut user in members {
            if user.remove_membership(project_id) {
                match self.store.upsert(&self.partition, encode(&user)?).await {
                    Ok(_) => changed += 1,
                    Err(StoreError::NotFound { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if changed > 0 {
            info!(project_id = %project_id, users = changed, "removed project memberships");
        } else {
            debug!(project_id = %project_id, "no project memberships to remove");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::document_store::InMemoryDocumentStore;
    use orbit_model::ProjectUserRole;

    fn repo() -> UserRepository<InMemoryDocumentStore> {
        UserRepository::new(TenantName::new("t1"), InMemoryDocumentStore::new("users"))
    }

    #[tokio::test]
    async fn lists_members_of_a_project_only() {
        let repo = repo();
        let p1 = ProjectId::new("p1");
        let p2 = ProjectId::new("p2");
        repo.add(User::new("a").with_membership(p1.clone(), ProjectUserRole::Owner)).await.unwrap();
        repo.add(User::new("b").with_membership(p2.clone(), ProjectUserRole::Member)).await.unwrap();
        repo.add(
            User::new("c")
                .with_membership(p1.clone(), ProjectUserRole::Member)
                .with_membership(p2.clone(), ProjectUserRole::Member),
        )
        .await
        .unwrap();

        let members = repo.list_users_by_project(&p1).await.unwrap();
        let ids: Vec<_> = members.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn removing_memberships_keeps_other_projects() {
        let repo = repo();
        let p1 = ProjectId::new("p1");
        let p2 = ProjectId::new("p2");
        repo.add(
            User::new("c")
                .with_membership(p1.clone(), ProjectUserRole::Member)
                .with_membership(p2.clone(), ProjectUserRole::Owner),
        )
        .await
        .unwrap();

        assert_eq!(repo.remove_project_memberships(&p1).await.unwrap(), 1);
        assert!(repo.list_users_by_project(&p1).await.unwrap().is_empty());

        let user = repo.get(&UserId::new("c")).await.unwrap().unwrap();
        assert!(user.is_member_of(&p2));

        // Nothing left to do the second time.
        assert_eq!(repo.remove_project_memberships(&p1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_admins_filters_by_role() {
        let repo = repo();
        repo.add(User::new("a").with_role(UserRole::Admin)).await.unwrap();
        repo.add(User::new("b").with_role(UserRole::Creator)).await.unwrap();

        let admins: Vec<User> = repo.list_admins().try_collect().await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id.as_str(), "a");
    }

    #[tokio::test]
    async fn add_conflicts_on_existing_user() {
        let repo = repo();
        repo.add(User::new("a")).await.unwrap();
        let err = repo.add(User::new("a")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_user_reads_and_removes_as_none() {
        let repo = repo();
        assert_eq!(repo.get(&UserId::new("ghost")).await.unwrap(), None);
        assert_eq!(repo.remove(&UserId::new("ghost")).await.unwrap(), None);
        assert_eq!(
            repo.remove_project_membership(&UserId::new("ghost"), &ProjectId::new("p1"))
                .await
                .unwrap(),
            None
        );
    }
}
