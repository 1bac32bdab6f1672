//! Users and their project memberships.
//!
//! Memberships are stored on the user document, not on the project: the
//! project's `users` view is derived by querying users whose memberships
//! reference the project.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orbit_core::{DomainError, DomainResult, Entity, ProjectId, UserId, Validate};

/// Kind of directory principal behind a user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserType {
    #[default]
    User,
    Group,
    System,
    Provider,
}

/// Control-plane wide role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserRole {
    #[default]
    None,
    Provider,
    Creator,
    Admin,
}

/// Role of a user within one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProjectUserRole {
    #[default]
    None,
    Provider,
    Member,
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMembership {
    pub project_id: ProjectId,
    #[serde(default)]
    pub role: ProjectUserRole,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ProjectMembership {
    pub fn new(project_id: ProjectId, role: ProjectUserRole) -> Self {
        Self {
            project_id,
            role,
            properties: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub project_memberships: Vec<ProjectMembership>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl User {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            user_type: UserType::User,
            role: UserRole::None,
            project_memberships: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_membership(mut self, project_id: ProjectId, role: ProjectUserRole) -> Self {
        self.ensure_membership(project_id, role);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_member_of(&self, project_id: &ProjectId) -> bool {
        self.membership(project_id).is_some()
    }

    pub fn membership(&self, project_id: &ProjectId) -> Option<&ProjectMembership> {
        self.project_memberships
            .iter()
            .find(|m| &m.project_id == project_id)
    }

    /// Add or update the membership for `project_id`.
    pub fn ensure_membership(&mut self, project_id: ProjectId, role: ProjectUserRole) {
        match self
            .project_memberships
            .iter_mut()
            .find(|m| m.project_id == project_id)
        {
            Some(existing) => existing.role = role,
            None => self
                .project_memberships
                .push(ProjectMembership::new(project_id, role)),
        }
    }

    /// Drop the membership for `project_id`. Returns true if one was removed.
    pub fn remove_membership(&mut self, project_id: &ProjectId) -> bool {
        let before = self.project_memberships.len();
        self.project_memberships
            .retain(|m| &m.project_id != project_id);
        self.project_memberships.len() != before
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Validate for User {
    fn validate(&self) -> DomainResult<()> {
        if self.id.is_blank() {
            return Err(DomainError::validation("user id must not be blank"));
        }
        for membership in &self.project_memberships {
            if membership.project_id.is_blank() {
                return Err(DomainError::validation(format!(
                    "user '{}' has a membership without project id",
                    self.id
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        if !self
            .project_memberships
            .iter()
            .all(|m| seen.insert(&m.project_id))
        {
            return Err(DomainError::validation(format!(
                "user '{}' has duplicate project memberships",
                self.id
            )));
        }
        Ok(())
    }
}
