//! Links attached to a project (repositories, dashboards, service endpoints).

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use orbit_core::{DomainError, DomainResult, ProjectId, Validate};

use crate::links::Hypermedia;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProjectLinkType {
    #[default]
    Link,
    Readme,
    Service,
    GitRepository,
    AzureResource,
    Environment,
}

/// A titled href owned by a project.
///
/// Two links are equal when their ids match, whatever their href or title.
/// The hash only covers the id so `Hash` stays consistent with `Eq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLink {
    pub id: String,
    pub project_id: ProjectId,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub link_type: ProjectLinkType,
}

impl ProjectLink {
    pub fn new(project_id: ProjectId, href: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            project_id,
            href: href.into(),
            title: None,
            link_type: ProjectLinkType::Link,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_type(mut self, link_type: ProjectLinkType) -> Self {
        self.link_type = link_type;
        self
    }
}

impl PartialEq for ProjectLink {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProjectLink {}

impl Hash for ProjectLink {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Hypermedia for ProjectLink {
    fn href(&self) -> String {
        self.href.clone()
    }
}

impl Validate for ProjectLink {
    fn validate(&self) -> DomainResult<()> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("link id must not be blank"));
        }
        if self.project_id.is_blank() {
            return Err(DomainError::validation(format!(
                "link '{}' must belong to a project",
                self.id
            )));
        }
        if self.href.trim().is_empty() {
            return Err(DomainError::validation(format!("link '{}' has no href", self.id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn equality_ignores_href_and_title_drift() {
        let a = ProjectLink::new("p1".into(), "https://one").with_title("one");
        let mut b = a.clone();
        b.href = "https://two".to_string();
        b.title = None;

        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn distinct_ids_are_distinct_links() {
        let a = ProjectLink::new("p1".into(), "https://same");
        let b = ProjectLink::new("p1".into(), "https://same");
        assert_ne!(a, b);
    }

    #[test]
    fn templated_links_substitute_tokens() {
        let link = ProjectLink::new("p1".into(), "https://dev.example/{org}/{repo}");
        assert!(link.templated());
        let out = link.substitute_tokens(&|t| match t {
            "org" => "contoso".to_string(),
            _ => "web".to_string(),
        });
        assert_eq!(out, "https://dev.example/contoso/web");
    }
}
