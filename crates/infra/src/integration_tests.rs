//! Integration tests for the project aggregate and its dependent records.
//!
//! Tests: ProjectRepository → DocumentStore, with the user and link
//! repositories wired in as the cascade targets.
//!
//! Verifies:
//! - Round trip, conflict detection and dual id/name lookup
//! - Idempotent removal
//! - Cascade of memberships and links, including partial failure and
//!   undecodable project documents

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures::TryStreamExt;
    use serde_json::json;

    use orbit_core::{ProjectId, TenantName, UserId};
    use orbit_model::{Project, ProjectLink, ProjectType, ProjectUserRole, ProviderReference, User};

    use crate::document_store::{DocumentStore, InMemoryDocumentStore};
    use crate::repositories::{
        LinkStore, MembershipStore, ProjectLinkRepository, ProjectRepository, RepositoryError,
        UserRepository,
    };

    type Users = UserRepository<InMemoryDocumentStore>;
    type Links = ProjectLinkRepository<InMemoryDocumentStore>;

    struct Fixture {
        projects: ProjectRepository<InMemoryDocumentStore, Users, Links>,
        project_docs: InMemoryDocumentStore,
        users: Arc<Users>,
        links: Arc<Links>,
    }

    fn tenant() -> TenantName {
        TenantName::new("contoso")
    }

    fn setup() -> Fixture {
        orbit_observability::init();

        let project_docs = InMemoryDocumentStore::new("projects").with_unique_key("/name");
        let users = Arc::new(UserRepository::new(tenant(), InMemoryDocumentStore::new("users")));
        let links = Arc::new(ProjectLinkRepository::new(tenant(), InMemoryDocumentStore::new("links")));
        let projects = ProjectRepository::new(tenant(), project_docs.clone(), users.clone(), links.clone());

        Fixture {
            projects,
            project_docs,
            users,
            links,
        }
    }

    fn project(name: &str) -> Project {
        let project_type = ProjectType::new("default")
            .with_provider(ProviderReference::new("azure.resources"))
            .with_provider(ProviderReference::new("azure.devops").depends_on("azure.resources"));
        Project::new(name, project_type)
    }

    #[tokio::test]
    async fn added_project_reads_back_with_empty_users() {
        let f = setup();
        let added = f.projects.add(project("apollo")).await.unwrap();

        let found = f.projects.get(added.id.as_str()).await.unwrap().unwrap();
        assert_eq!(found, added);
        assert!(found.users.is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict_and_stores_nothing() {
        let f = setup();
        f.projects.add(project("apollo")).await.unwrap();

        let err = f.projects.add(project("apollo")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(f.project_docs.len(&tenant()), 1);
    }

    #[tokio::test]
    async fn name_and_id_resolve_the_same_project() {
        let f = setup();
        let added = f.projects.add(project("apollo")).await.unwrap();

        let by_id = f.projects.get(added.id.as_str()).await.unwrap().unwrap();
        let by_name = f.projects.get("apollo").await.unwrap().unwrap();
        assert_eq!(by_id.id, by_name.id);
        assert_eq!(f.projects.get("gemini").await.unwrap(), None);
    }

    #[tokio::test]
    async fn projects_are_invisible_to_other_tenants() {
        let f = setup();
        let added = f.projects.add(project("apollo")).await.unwrap();

        let other = ProjectRepository::new(
            TenantName::new("fabrikam"),
            f.project_docs.clone(),
            f.users.clone(),
            f.links.clone(),
        );
        assert_eq!(other.get(added.id.as_str()).await.unwrap(), None);
        assert_eq!(other.get("apollo").await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_remove_returns_none() {
        let f = setup();
        let added = f.projects.add(project("apollo")).await.unwrap();

        assert_eq!(f.projects.remove(&added).await.unwrap().map(|p| p.id), Some(added.id.clone()));
        assert_eq!(f.projects.remove(&added).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_cascades_to_memberships_and_links() {
        let f = setup();
        let apollo = f.projects.add(project("apollo")).await.unwrap();
        let gemini = f.projects.add(project("gemini")).await.unwrap();

        f.users
            .add(
                User::new("u1")
                    .with_membership(apollo.id.clone(), ProjectUserRole::Owner)
                    .with_membership(gemini.id.clone(), ProjectUserRole::Member),
            )
            .await
            .unwrap();
        f.users
            .add(User::new("u2").with_membership(apollo.id.clone(), ProjectUserRole::Member))
            .await
            .unwrap();
        f.links.add(ProjectLink::new(apollo.id.clone(), "https://git.example/apollo")).await.unwrap();
        f.links.add(ProjectLink::new(gemini.id.clone(), "https://git.example/gemini")).await.unwrap();

        let populated = f.projects.get("apollo").await.unwrap().unwrap();
        assert_eq!(populated.users.len(), 2);

        f.projects.remove(&apollo).await.unwrap();

        assert!(f.users.list_users_by_project(&apollo.id).await.unwrap().is_empty());
        let apollo_links: Vec<ProjectLink> = f.links.list_by_project(&apollo.id).try_collect().await.unwrap();
        assert!(apollo_links.is_empty());

        // The other project keeps its member and link.
        let u1 = f.users.get(&UserId::new("u1")).await.unwrap().unwrap();
        assert!(u1.is_member_of(&gemini.id));
        let gemini_links: Vec<ProjectLink> = f.links.list_by_project(&gemini.id).try_collect().await.unwrap();
        assert_eq!(gemini_links.len(), 1);
        assert_eq!(f.projects.get("gemini").await.unwrap().unwrap().users.len(), 1);
    }

    /// Link store whose cleanup always fails.
    struct BrokenLinks;

    #[async_trait]
    impl LinkStore for BrokenLinks {
        async fn remove_project_links(&self, _project_id: &ProjectId) -> Result<usize, RepositoryError> {
            Err(RepositoryError::Store(crate::document_store::StoreError::Backend(
                "links container offline".to_string(),
            )))
        }
    }

    #[tokio::test]
    async fn failed_cleanup_surfaces_as_partial_failure() {
        let users = Arc::new(UserRepository::new(tenant(), InMemoryDocumentStore::new("users")));
        let project_docs = InMemoryDocumentStore::new("projects");
        let projects = ProjectRepository::new(tenant(), project_docs.clone(), users.clone(), Arc::new(BrokenLinks));

        let apollo = projects.add(project("apollo")).await.unwrap();
        users
            .add(User::new("u1").with_membership(apollo.id.clone(), ProjectUserRole::Owner))
            .await
            .unwrap();

        let err = projects.remove(&apollo).await.unwrap_err();
        match err {
            RepositoryError::PartialFailure {
                project_id,
                memberships,
                links,
            } => {
                assert_eq!(project_id, apollo.id);
                assert!(memberships.is_none());
                assert!(links.is_some());
            }
            other => panic!("expected partial failure, got {other:?}"),
        }

        // The project is gone and the membership side still ran.
        assert!(project_docs.read(&tenant(), apollo.id.as_str()).await.unwrap_err().is_not_found());
        assert!(users.list_users_by_project(&apollo.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_project_document_is_still_cascaded() {
        let f = setup();
        let mut broken = project("broken");
        broken.id = ProjectId::new("broken-1");
        f.project_docs
            .upsert(&tenant(), json!({ "id": "broken-1", "name": 5 }))
            .await
            .unwrap();
        f.users
            .add(User::new("u1").with_membership(broken.id.clone(), ProjectUserRole::Owner))
            .await
            .unwrap();
        f.links.add(ProjectLink::new(broken.id.clone(), "https://git.example/broken")).await.unwrap();

        let err = f.projects.remove(&broken).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));

        assert!(f.project_docs.is_empty(&tenant()));
        assert!(f.users.list_users_by_project(&broken.id).await.unwrap().is_empty());
        let links: Vec<ProjectLink> = f.links.list_by_project(&broken.id).try_collect().await.unwrap();
        assert!(links.is_empty());
    }
}
