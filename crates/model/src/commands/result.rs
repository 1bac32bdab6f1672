use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orbit_core::CommandId;

use super::command::CommandPayload;
use super::status::RuntimeStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ErrorSeverity {
    #[default]
    Error,
    Warning,
}

/// An error captured while executing a command (primary or provider side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub severity: ErrorSeverity,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            severity: ErrorSeverity::Error,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Warning,
            ..Self::new(message)
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ErrorSeverity::Error
    }
}

impl core::fmt::Display for CommandError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Outcome record of exactly one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command_id: CommandId,
    #[serde(default)]
    pub runtime_status: RuntimeStatus,
    #[serde(default)]
    pub errors: Vec<CommandError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<CommandPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CommandResult {
    /// Fresh result for a command that has been created but not yet observed running.
    pub fn scheduled(command_id: CommandId) -> Self {
        Self {
            command_id,
            runtime_status: RuntimeStatus::Scheduled,
            errors: Vec::new(),
            output: None,
            last_updated: Some(Utc::now()),
        }
    }

    pub fn with_status(mut self, status: RuntimeStatus) -> Self {
        self.apply_status(status);
        self
    }

    pub fn with_error(mut self, error: CommandError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_output(mut self, output: CommandPayload) -> Self {
        self.output = Some(output);
        self
    }

    pub fn is_active(&self) -> bool {
        self.runtime_status.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.runtime_status.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.runtime_status == RuntimeStatus::Completed
    }

    /// Move to `status` unless that would take a terminal result back to active.
    ///
    /// Returns whether the status was applied.
    pub fn apply_status(&mut self, status: RuntimeStatus) -> bool {
        if !self.runtime_status.can_transition_to(status) {
            tracing::warn!(
                command_id = %self.command_id,
                from = %self.runtime_status,
                to = %status,
                "ignoring status transition out of a terminal state"
            );
            return false;
        }
        self.runtime_status = status;
        self.last_updated = Some(Utc::now());
        true
    }

    pub fn push_error(&mut self, error: CommandError) {
        self.errors.push(error);
        self.last_updated = Some(Utc::now());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// First captured entry, whatever its severity.
    pub fn first_error(&self) -> Option<&CommandError> {
        self.errors.first()
    }

    /// Why the command did not complete: the first error, else the status name.
    ///
    /// `None` for completed results.
    pub fn failure_reason(&self) -> Option<String> {
        if self.is_completed() {
            return None;
        }
        Some(
            self.first_error()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| self.runtime_status.to_string()),
        )
    }
}
