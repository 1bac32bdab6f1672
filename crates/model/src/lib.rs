//! `orbit-model`: documents, hypermedia links and the command/result model.
//!
//! Everything here is plain data plus pure behaviour (validation, link
//! resolution, result aggregation). Storage and transport live in `orbit-infra`.

pub mod commands;
pub mod links;
pub mod project;
pub mod project_link;
pub mod provider;
pub mod user;

pub use commands::{
    Command, CommandAction, CommandError, CommandKind, CommandPayload, CommandResult,
    CommandTarget, ErrorSeverity, OrchestratorCommandResult, RuntimeStatus,
};
pub use links::{Hypermedia, LinkContext, ProjectReferenceLinks, ReferenceLink};
pub use project::{Project, ProjectType, ProviderReference};
pub use project_link::{ProjectLink, ProjectLinkType};
pub use provider::Provider;
pub use user::{ProjectMembership, ProjectUserRole, User, UserRole, UserType};
