use serde::{Deserialize, Serialize};

/// Runtime status of a command as reported by the orchestrator.
///
/// `Scheduled` and `Running` are active; every other value is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RuntimeStatus {
    #[default]
    Unknown,
    Scheduled,
    Running,
    Completed,
    Failed,
    Canceled,
    Terminated,
}

impl RuntimeStatus {
    pub fn is_active(self) -> bool {
        matches!(self, RuntimeStatus::Scheduled | RuntimeStatus::Running)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// True if moving from `self` to `next` keeps terminality monotonic.
    pub fn can_transition_to(self, next: RuntimeStatus) -> bool {
        !(self.is_terminal() && self != RuntimeStatus::Unknown && next.is_active())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeStatus::Unknown => "Unknown",
            RuntimeStatus::Scheduled => "Scheduled",
            RuntimeStatus::Running => "Running",
            RuntimeStatus::Completed => "Completed",
            RuntimeStatus::Failed => "Failed",
            RuntimeStatus::Canceled => "Canceled",
            RuntimeStatus::Terminated => "Terminated",
        }
    }
}

impl core::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
