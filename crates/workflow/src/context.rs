//! Per-run execution records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::ExecutionId;

use crate::error::WorkflowError;
use crate::state::ExecutionStatus;

/// Audit record for one activity slot.
///
/// Written once, after the step succeeds or runs out of attempts. A completed
/// step that is later rolled back moves to `Compensated`.
#[derive(Debug, Clone)]
pub struct ActivityExecution<P> {
    pub name: String,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub input: P,
    pub output: Option<P>,
    pub error: Option<String>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// The record of one workflow run.
///
/// Created by the engine at the start of `execute`, mutated only by the
/// engine while the run is in progress, and handed back to the caller
/// once the run ends.
#[derive(Debug, Clone)]
pub struct ExecutionContext<P> {
    pub workflow_id: String,
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub input: P,
    /// Output of the last activity, set only when the run completes.
    pub output: Option<P>,
    /// The forward failure. Never replaced by a compensation failure.
    pub error: Option<WorkflowError>,
    /// Set when rolling back a completed step failed.
    pub compensation_error: Option<WorkflowError>,
    pub activities: Vec<ActivityExecution<P>>,
    pub metadata: HashMap<String, String>,
}

impl<P> ExecutionContext<P> {
    pub(crate) fn start(workflow_id: &str, input: P) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            execution_id: ExecutionId::new(),
            status: ExecutionStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            input,
            output: None,
            error: None,
            compensation_error: None,
            activities: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Wall-clock duration of the run, once it has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Returns the audit record for the named activity.
    pub fn activity(&self, name: &str) -> Option<&ActivityExecution<P>> {
        self.activities.iter().find(|a| a.name == name)
    }

    /// Names of the activities whose forward execution succeeded, in order.
    ///
    /// Includes steps that were later compensated.
    pub fn completed_activities(&self) -> Vec<&str> {
        self.activities
            .iter()
            .filter(|a| {
                matches!(
                    a.status,
                    ExecutionStatus::Completed | ExecutionStatus::Compensated
                )
            })
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Returns the first activity that failed, if any.
    pub fn failed_activity(&self) -> Option<&ActivityExecution<P>> {
        self.activities
            .iter()
            .find(|a| a.status == ExecutionStatus::Failed)
    }

    pub(crate) fn mark_compensated(&mut self, index: usize) {
        if let Some(record) = self.activities.get_mut(index) {
            record.status = ExecutionStatus::Compensated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: ExecutionStatus) -> ActivityExecution<u32> {
        ActivityExecution {
            name: name.to_string(),
            status,
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
            input: 0,
            output: None,
            error: None,
            attempts: 1,
        }
    }

    #[test]
    fn test_start_is_running_with_fresh_id() {
        let a = ExecutionContext::start("checkout", 1u32);
        let b = ExecutionContext::start("checkout", 1u32);

        assert_eq!(a.status, ExecutionStatus::Running);
        assert_ne!(a.execution_id, b.execution_id);
        assert!(a.end_time.is_none());
        assert!(a.duration().is_none());
    }

    #[test]
    fn test_completed_activities_include_compensated() {
        let mut ctx = ExecutionContext::start("checkout", 0u32);
        ctx.activities.push(record("reserve", ExecutionStatus::Completed));
        ctx.activities.push(record("charge", ExecutionStatus::Completed));
        ctx.activities.push(record("ship", ExecutionStatus::Failed));

        ctx.mark_compensated(1);

        assert_eq!(ctx.completed_activities(), vec!["reserve", "charge"]);
        assert_eq!(
            ctx.activity("charge").map(|a| a.status),
            Some(ExecutionStatus::Compensated)
        );
        assert_eq!(ctx.failed_activity().map(|a| a.name.as_str()), Some("ship"));
    }
}
