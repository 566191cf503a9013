//! Execution status state machine.

use serde::{Deserialize, Serialize};

/// Status of a workflow execution or of a single activity within it.
///
/// Workflow transitions:
/// ```text
/// Pending ──► Running ──┬──► Completed
///                       ├──► Failed                      (compensation disabled)
///                       └──► Compensating ──┬──► Compensated
///                                           └──► Failed
/// ```
///
/// Activity records only ever hold `Completed`, `Failed` or `Compensated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Created but not yet started.
    #[default]
    Pending,

    /// Activities are being executed.
    Running,

    /// Every activity succeeded (terminal).
    Completed,

    /// Forward execution failed and was not fully rolled back (terminal).
    Failed,

    /// A step failed and previously completed steps are being rolled back.
    Compensating,

    /// A step failed and every completed step was rolled back (terminal).
    Compensated,
}

impl ExecutionStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Compensated
        )
    }

    /// Returns true for terminal states that did not run to completion.
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionStatus::Failed | ExecutionStatus::Compensated)
    }

    /// Returns the status name as used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Compensating => "compensating",
            ExecutionStatus::Compensated => "compensated",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(ExecutionStatus::default(), ExecutionStatus::Pending);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Compensating.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Compensated.is_terminal());
    }

    #[test]
    fn test_failure_states() {
        assert!(!ExecutionStatus::Completed.is_failure());
        assert!(ExecutionStatus::Failed.is_failure());
        assert!(ExecutionStatus::Compensated.is_failure());
    }

    #[test]
    fn test_serialization_uses_upper_case() {
        let json = serde_json::to_string(&ExecutionStatus::Compensating).unwrap();
        assert_eq!(json, "\"COMPENSATING\"");
        let back: ExecutionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ExecutionStatus::Compensating);
    }
}
