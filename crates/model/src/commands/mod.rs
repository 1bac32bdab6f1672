//! Command & result model.
//!
//! A [`Command`] is an immutable request tagged with a [`CommandKind`]. Its
//! single [`CommandResult`] tracks a [`RuntimeStatus`] plus captured errors,
//! and an [`OrchestratorCommandResult`] merges the primary result with the
//! per-provider results reported back by the orchestrator.

pub mod aggregate;
pub mod command;
pub mod result;
pub mod status;

pub use aggregate::OrchestratorCommandResult;
pub use command::{Command, CommandAction, CommandKind, CommandPayload, CommandTarget};
pub use result::{CommandError, CommandResult, ErrorSeverity};
pub use status::RuntimeStatus;
