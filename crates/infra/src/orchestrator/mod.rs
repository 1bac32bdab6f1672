//! Orchestrator boundary: where commands are submitted and their results read.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use orbit_model::{Command, OrchestratorCommandResult};

pub use http::HttpOrchestrator;

/// Orchestrator call error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The orchestrator was unreachable or answered with a gateway-class
    /// status. Worth retrying.
    #[error("orchestrator unavailable: {0}")]
    Transient(String),

    #[error("orchestrator answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("could not decode orchestrator response: {0}")]
    Decode(String),
}

impl OrchestratorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, OrchestratorError::Transient(_))
    }
}

/// Remote executor of commands.
///
/// Both calls return the current aggregated view of the command: the primary
/// result plus whatever provider results the orchestrator has collected.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Submit `command` for execution.
    async fn invoke(&self, command: &Command) -> Result<OrchestratorCommandResult, OrchestratorError>;

    /// Read the latest result of a previously submitted `command`.
    async fn query(&self, command: &Command) -> Result<OrchestratorCommandResult, OrchestratorError>;
}

#[async_trait]
impl<O> Orchestrator for Arc<O>
where
    O: Orchestrator + ?Sized,
{
    async fn invoke(&self, command: &Command) -> Result<OrchestratorCommandResult, OrchestratorError> {
        (**self).invoke(command).await
    }

    async fn query(&self, command: &Command) -> Result<OrchestratorCommandResult, OrchestratorError> {
        (**self).query(command).await
    }
}
