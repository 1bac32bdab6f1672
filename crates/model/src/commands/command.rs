use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orbit_core::{CommandId, DomainError, DomainResult, Entity, ProjectId, Validate};

use super::result::CommandResult;
use crate::project::Project;
use crate::project_link::ProjectLink;
use crate::provider::Provider;
use crate::user::User;

/// Who executes a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandTarget {
    Orchestrator,
    Provider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandAction {
    Create,
    Update,
    Delete,
    Custom,
}

/// Closed set of commands understood by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    ProjectCreate,
    ProjectUpdate,
    ProjectDelete,
    ProjectUserCreate,
    ProjectUserUpdate,
    ProjectUserDelete,
    TeamCloudUserCreate,
    TeamCloudUserUpdate,
    TeamCloudUserDelete,
    ProjectLinkCreate,
    ProjectLinkDelete,
    ProviderRegister,
    ProviderProjectCreate,
    ProviderProjectUpdate,
    ProviderProjectDelete,
}

impl CommandKind {
    pub fn target(self) -> CommandTarget {
        match self {
            CommandKind::ProviderRegister
            | CommandKind::ProviderProjectCreate
            | CommandKind::ProviderProjectUpdate
            | CommandKind::ProviderProjectDelete => CommandTarget::Provider,
            _ => CommandTarget::Orchestrator,
        }
    }

    pub fn action(self) -> CommandAction {
        use CommandKind::*;
        match self {
            ProjectCreate | ProjectUserCreate | TeamCloudUserCreate | ProjectLinkCreate
            | ProviderProjectCreate => CommandAction::Create,
            ProjectUpdate | ProjectUserUpdate | TeamCloudUserUpdate | ProviderProjectUpdate => {
                CommandAction::Update
            }
            ProjectDelete | ProjectUserDelete | TeamCloudUserDelete | ProjectLinkDelete
            | ProviderProjectDelete => CommandAction::Delete,
            ProviderRegister => CommandAction::Custom,
        }
    }

    /// True if the command only makes sense inside one project.
    pub fn is_project_scoped(self) -> bool {
        use CommandKind::*;
        !matches!(
            self,
            TeamCloudUserCreate | TeamCloudUserUpdate | TeamCloudUserDelete | ProviderRegister
        )
    }

    /// True if `payload` is the payload variant this kind carries.
    pub fn accepts(self, payload: &CommandPayload) -> bool {
        use CommandKind::*;
        match payload {
            CommandPayload::Project(_) => matches!(
                self,
                ProjectCreate
                    | ProjectUpdate
                    | ProjectDelete
                    | ProviderProjectCreate
                    | ProviderProjectUpdate
                    | ProviderProjectDelete
            ),
            CommandPayload::User(_) => matches!(
                self,
                ProjectUserCreate
                    | ProjectUserUpdate
                    | ProjectUserDelete
                    | TeamCloudUserCreate
                    | TeamCloudUserUpdate
                    | TeamCloudUserDelete
            ),
            CommandPayload::ProjectLink(_) => matches!(self, ProjectLinkCreate | ProjectLinkDelete),
            CommandPayload::Provider(_) => matches!(self, ProviderRegister),
        }
    }
}

/// Entity carried by a command (and echoed back as result output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum CommandPayload {
    Project(Project),
    User(User),
    Provider(Provider),
    ProjectLink(ProjectLink),
}

impl CommandPayload {
    /// Identifier of the carried entity.
    pub fn entity_id(&self) -> &str {
        match self {
            CommandPayload::Project(p) => p.id().as_str(),
            CommandPayload::User(u) => u.id().as_str(),
            CommandPayload::Provider(p) => p.id().as_str(),
            CommandPayload::ProjectLink(l) => &l.id,
        }
    }

    /// Project the payload itself belongs to, if it says so.
    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            CommandPayload::Project(p) => Some(&p.id),
            CommandPayload::ProjectLink(l) => Some(&l.project_id),
            CommandPayload::User(_) | CommandPayload::Provider(_) => None,
        }
    }
}

impl Validate for CommandPayload {
    fn validate(&self) -> DomainResult<()> {
        match self {
            CommandPayload::Project(p) => p.validate(),
            CommandPayload::User(u) => u.validate(),
            CommandPayload::Provider(p) => p.validate(),
            CommandPayload::ProjectLink(l) => l.validate(),
        }
    }
}

/// Immutable unit of work sent to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    command_id: CommandId,
    kind: CommandKind,
    user: User,
    payload: CommandPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_id: Option<ProjectId>,
    created_at: DateTime<Utc>,
}

impl Command {
    /// Build a command, generating an id unless `command_id` overrides it.
    ///
    /// Fails with `InvalidArgument` if the acting user has no id, the payload
    /// does not fit `kind`, the payload has no identifier, or a
    /// project-scoped kind cannot determine its project.
    pub fn new(
        kind: CommandKind,
        user: User,
        payload: CommandPayload,
        command_id: Option<CommandId>,
    ) -> DomainResult<Self> {
        Self::build(kind, user, payload, None, command_id)
    }

    /// Like [`Command::new`] for payloads that do not carry their project (users).
    pub fn for_project(
        kind: CommandKind,
        user: User,
        payload: CommandPayload,
        project_id: ProjectId,
        command_id: Option<CommandId>,
    ) -> DomainResult<Self> {
        Self::build(kind, user, payload, Some(project_id), command_id)
    }

    fn build(
        kind: CommandKind,
        user: User,
        payload: CommandPayload,
        project_id: Option<ProjectId>,
        command_id: Option<CommandId>,
    ) -> DomainResult<Self> {
        if user.id.is_blank() {
            return Err(DomainError::invalid_argument("command user must have an id"));
        }
        if !kind.accepts(&payload) {
            return Err(DomainError::invalid_argument(format!(
                "{kind:?} does not accept this payload"
            )));
        }
        if payload.entity_id().trim().is_empty() {
            return Err(DomainError::invalid_argument(format!(
                "{kind:?} payload must have an id"
            )));
        }

        let project_id = project_id.or_else(|| payload.project_id().cloned());
        if kind.is_project_scoped() && project_id.as_ref().is_none_or(|id| id.is_blank()) {
            return Err(DomainError::invalid_argument(format!(
                "{kind:?} requires a project id"
            )));
        }

        Ok(Self {
            command_id: command_id.unwrap_or_default(),
            kind,
            user,
            payload,
            project_id,
            created_at: Utc::now(),
        })
    }

    pub fn project_create(user: User, project: Project) -> DomainResult<Self> {
        Self::new(CommandKind::ProjectCreate, user, CommandPayload::Project(project), None)
    }

    pub fn project_update(user: User, project: Project) -> DomainResult<Self> {
        Self::new(CommandKind::ProjectUpdate, user, CommandPayload::Project(project), None)
    }

    pub fn project_delete(user: User, project: Project) -> DomainResult<Self> {
        Self::new(CommandKind::ProjectDelete, user, CommandPayload::Project(project), None)
    }

    pub fn project_user_create(user: User, member: User, project_id: ProjectId) -> DomainResult<Self> {
        Self::for_project(
            CommandKind::ProjectUserCreate,
            user,
            CommandPayload::User(member),
            project_id,
            None,
        )
    }

    pub fn project_user_delete(user: User, member: User, project_id: ProjectId) -> DomainResult<Self> {
        Self::for_project(
            CommandKind::ProjectUserDelete,
            user,
            CommandPayload::User(member),
            project_id,
            None,
        )
    }

    pub fn teamcloud_user_create(user: User, payload: User) -> DomainResult<Self> {
        Self::new(CommandKind::TeamCloudUserCreate, user, CommandPayload::User(payload), None)
    }

    pub fn project_link_create(user: User, link: ProjectLink) -> DomainResult<Self> {
        Self::new(CommandKind::ProjectLinkCreate, user, CommandPayload::ProjectLink(link), None)
    }

    pub fn provider_register(user: User, provider: Provider) -> DomainResult<Self> {
        Self::new(CommandKind::ProviderRegister, user, CommandPayload::Provider(provider), None)
    }

    pub fn provider_project_create(
        user: User,
        project: Project,
        command_id: Option<CommandId>,
    ) -> DomainResult<Self> {
        Self::new(
            CommandKind::ProviderProjectCreate,
            user,
            CommandPayload::Project(project),
            command_id,
        )
    }

    pub fn provider_project_delete(
        user: User,
        project: Project,
        command_id: Option<CommandId>,
    ) -> DomainResult<Self> {
        Self::new(
            CommandKind::ProviderProjectDelete,
            user,
            CommandPayload::Project(project),
            command_id,
        )
    }

    pub fn command_id(&self) -> CommandId {
        self.command_id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn payload(&self) -> &CommandPayload {
        &self.payload
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        self.project_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Validate the payload against its schema and business rules.
    pub fn validate(&self) -> DomainResult<()> {
        self.payload.validate()
    }

    /// The single result record for this command, initially `Scheduled`.
    pub fn create_result(&self) -> CommandResult {
        CommandResult::scheduled(self.command_id)
    }
}
