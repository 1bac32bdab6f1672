//! Project aggregate root and its project type.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use orbit_core::{
    DomainError, DomainResult, Entity, ProjectId, ProviderId, Validate, ValueObject,
};

use crate::user::User;

const MAX_NAME_LEN: usize = 255;

/// Reference from a project type to a provider, with per-project metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReference {
    pub id: ProviderId,
    #[serde(default)]
    pub depends_on: Vec<ProviderId>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ProviderReference {
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn depends_on(mut self, provider: impl Into<ProviderId>) -> Self {
        self.depends_on.push(provider.into());
        self
    }
}

impl ValueObject for ProviderReference {}

/// Template a project is created from: region, subscriptions and the
/// providers that take part in the project's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectType {
    pub id: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default)]
    pub subscription_capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name_prefix: Option<String>,
    #[serde(default)]
    pub providers: Vec<ProviderReference>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ProjectType {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_default: false,
            region: String::new(),
            subscriptions: Vec::new(),
            subscription_capacity: 10,
            resource_group_name_prefix: None,
            providers: Vec::new(),
            tags: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_provider(mut self, provider: ProviderReference) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn references_provider(&self, provider_id: &ProviderId) -> bool {
        self.providers.iter().any(|p| &p.id == provider_id)
    }
}

impl Validate for ProjectType {
    fn validate(&self) -> DomainResult<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("project type id must not be blank"));
        }
        if self.providers.is_empty() {
            return Err(DomainError::validation(format!(
                "project type '{}' must reference at least one provider",
                self.id
            )));
        }

        let mut known = HashSet::new();
        for provider in &self.providers {
            if provider.id.is_blank() {
                return Err(DomainError::validation(format!(
                    "project type '{}' references a provider without id",
                    self.id
                )));
            }
            if !known.insert(&provider.id) {
                return Err(DomainError::validation(format!(
                    "project type '{}' references provider '{}' more than once",
                    self.id, provider.id
                )));
            }
        }

        for provider in &self.providers {
            for dependency in &provider.depends_on {
                if dependency == &provider.id {
                    return Err(DomainError::validation(format!(
                        "provider '{}' cannot depend on itself",
                        provider.id
                    )));
                }
                if !known.contains(dependency) {
                    return Err(DomainError::validation(format!(
                        "provider '{}' depends on '{}' which is not part of project type '{}'",
                        provider.id, dependency, self.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Project aggregate root.
///
/// `users` is a read-side view: it is never persisted with the project
/// document and is recomputed from the user store on every repository read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(skip)]
    pub users: Vec<User>,
}

impl Project {
    /// New project with a generated id.
    pub fn new(name: impl Into<String>, project_type: ProjectType) -> Self {
        Self::with_id(ProjectId::generate(), name, project_type)
    }

    pub fn with_id(id: ProjectId, name: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            id,
            name: name.into(),
            project_type,
            resource_group_name: None,
            tags: BTreeMap::new(),
            properties: BTreeMap::new(),
            users: Vec::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl Entity for Project {
    type Id = ProjectId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Validate for Project {
    fn validate(&self) -> DomainResult<()> {
        if self.id.is_blank() {
            return Err(DomainError::validation("project id must not be blank"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("project name must not be blank"));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "project name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        self.project_type.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_type() -> ProjectType {
        ProjectType::new("default")
            .with_provider(ProviderReference::new("azure.resources"))
            .with_provider(ProviderReference::new("azure.devops").depends_on("azure.resources"))
    }

    #[test]
    fn valid_project_passes() {
        let project = Project::new("apollo", project_type());
        assert!(project.validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let project = Project::new("  ", project_type());
        assert!(matches!(project.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let ty = ProjectType::new("t")
            .with_provider(ProviderReference::new("a").depends_on("missing"));
        let project = Project::new("apollo", ty);
        assert!(matches!(project.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn project_type_without_providers_is_rejected() {
        let project = Project::new("apollo", ProjectType::new("empty"));
        assert!(project.validate().is_err());
    }

    #[test]
    fn users_are_not_serialized() {
        let mut project = Project::new("apollo", project_type());
        project.users.push(User::new("u1"));

        let json = serde_json::to_value(&project).unwrap();
        assert!(json.get("users").is_none());
        assert_eq!(json["type"]["providers"][1]["dependsOn"][0], "azure.resources");

        let back: Project = serde_json::from_value(json).unwrap();
        assert!(back.users.is_empty());
        assert_eq!(back.id, project.id);
    }

    #[test]
    fn references_provider_is_structural() {
        let ty = project_type();
        assert!(ty.references_provider(&ProviderId::new("azure.devops")));
        assert!(!ty.references_provider(&ProviderId::new("github")));
    }
}
