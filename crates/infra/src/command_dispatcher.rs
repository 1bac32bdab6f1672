//! Command dispatch: submit a command to the orchestrator, then poll until it
//! settles.
//!
//! ```text
//! Command
//!   ↓
//! 1. Validate payload (never submitted when invalid)
//!   ↓
//! 2. Submit; transient failures retried every `submit_interval`
//!    until `submit_budget` is spent
//!   ↓
//! 3. Poll every `poll_interval` while the status is active,
//!    until `poll_budget` is spent
//!   ↓
//! 4. Classify: Completed | Failed | TimedOut | SubmissionAbandoned
//! ```
//!
//! The last known result is always handed back with the outcome. Only
//! validation failures and non-transient orchestrator errors are returned as
//! `Err`.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use orbit_core::DomainError;
use orbit_model::{Command, OrchestratorCommandResult};

use crate::orchestrator::{Orchestrator, OrchestratorError};

/// Fixed-interval retry and polling budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    pub submit_interval: Duration,
    pub submit_budget: Duration,
    pub poll_interval: Duration,
    pub poll_budget: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            submit_interval: Duration::from_secs(1),
            submit_budget: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(1),
            poll_budget: Duration::from_secs(5 * 60),
        }
    }
}

impl DispatchPolicy {
    pub fn with_submit(mut self, interval: Duration, budget: Duration) -> Self {
        self.submit_interval = interval;
        self.submit_budget = budget;
        self
    }

    pub fn with_poll(mut self, interval: Duration, budget: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_budget = budget;
        self
    }

    /// Submission attempts allowed by the budget (at least one).
    pub fn submit_attempts(&self) -> u32 {
        slots(self.submit_budget, self.submit_interval).max(1)
    }

    /// Status queries allowed by the budget (may be zero).
    pub fn poll_attempts(&self) -> u32 {
        slots(self.poll_budget, self.poll_interval)
    }
}

fn slots(budget: Duration, interval: Duration) -> u32 {
    if interval.is_zero() {
        return 0;
    }
    u32::try_from(budget.as_nanos() / interval.as_nanos()).unwrap_or(u32::MAX)
}

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    /// Terminal but not completed. `reason` is the first reported error, or
    /// the status name when there is none.
    Failed { reason: String },
    /// Still active when the poll budget ran out.
    TimedOut,
    /// The orchestrator stayed unreachable for the whole submit budget.
    SubmissionAbandoned {
        attempts: u32,
        last_error: OrchestratorError,
    },
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOutcome::Completed => f.write_str("completed"),
            DispatchOutcome::Failed { reason } => write!(f, "failed: {reason}"),
            DispatchOutcome::TimedOut => f.write_str("timed out"),
            DispatchOutcome::SubmissionAbandoned { attempts, last_error } => {
                write!(f, "submission abandoned after {attempts} attempts: {last_error}")
            }
        }
    }
}

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub result: OrchestratorCommandResult,
    pub outcome: DispatchOutcome,
    pub submit_attempts: u32,
    pub polls: u32,
}

impl DispatchReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == DispatchOutcome::Completed
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("command rejected: {0}")]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Drives commands through an [`Orchestrator`].
pub struct CommandDispatcher<O> {
    orchestrator: O,
    policy: DispatchPolicy,
}

impl<O> CommandDispatcher<O>
where
    O: Orchestrator,
{
    pub fn new(orchestrator: O) -> Self {
        Self {
            orchestrator,
            policy: DispatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    pub async fn dispatch(&self, command: &Command) -> Result<DispatchReport, DispatchError> {
        let command_id = command.command_id();

        if let Err(e) = command.validate() {
            warn!(command_id = %command_id, kind = ?command.kind(), error = %e, "command failed validation");
            return Err(e.into());
        }

        let max_attempts = self.policy.submit_attempts();
        let mut attempt = 0;
        let mut result = loop {
            attempt += 1;
            match self.orchestrator.invoke(command).await {
                Ok(result) => break result,
                Err(e) if e.is_transient() => {
                    if attempt >= max_attempts {
                        warn!(command_id = %command_id, attempts = attempt, error = %e, "giving up on submission");
                        return Ok(DispatchReport {
                            result: OrchestratorCommandResult::aggregate(command.create_result(), []),
                            outcome: DispatchOutcome::SubmissionAbandoned {
                                attempts: attempt,
                                last_error: e,
                            },
                            submit_attempts: attempt,
                            polls: 0,
                        });
                    }
                    debug!(command_id = %command_id, attempt, error = %e, "orchestrator unavailable, retrying");
                    tokio::time::sleep(self.policy.submit_interval).await;
                }
                Err(e) => {
                    error!(command_id = %command_id, attempt, error = %e, "command submission failed");
                    return Err(e.into());
                }
            }
        };
        info!(command_id = %command_id, kind = ?command.kind(), attempts = attempt, "command submitted");

        let max_polls = self.policy.poll_attempts();
        let mut polls = 0;
        while result.command_result.is_active() && polls < max_polls {
            tokio::time::sleep(self.policy.poll_interval).await;
            polls += 1;
            match self.orchestrator.query(command).await {
                Ok(latest) => result = latest,
                Err(e) if e.is_transient() => {
                    debug!(command_id = %command_id, poll = polls, error = %e, "status query failed, will retry");
                }
                Err(e) => {
                    error!(command_id = %command_id, poll = polls, error = %e, "status query failed");
                    return Err(e.into());
                }
            }
        }

        let outcome = classify(&result);
        match &outcome {
            DispatchOutcome::Completed => {
                info!(command_id = %command_id, polls, "command completed")
            }
            DispatchOutcome::TimedOut => {
                warn!(command_id = %command_id, polls, status = ?result.command_result.runtime_status, "command still running after poll budget")
            }
            DispatchOutcome::Failed { reason } => {
                warn!(command_id = %command_id, polls, status = ?result.command_result.runtime_status, reason = %reason, "command failed")
            }
            DispatchOutcome::SubmissionAbandoned { .. } => {}
        }

        Ok(DispatchReport {
            result,
            outcome,
            submit_attempts: attempt,
            polls,
        })
    }
}

fn classify(result: &OrchestratorCommandResult) -> DispatchOutcome {
    let primary = &result.command_result;
    if primary.is_completed() {
        return DispatchOutcome::Completed;
    }
    if primary.is_active() {
        return DispatchOutcome::TimedOut;
    }

    let reason = result
        .errors()
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| primary.runtime_status.to_string());
    DispatchOutcome::Failed { reason }
}
