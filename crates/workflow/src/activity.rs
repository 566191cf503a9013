//! The activity contract: one step of a workflow.

use std::sync::Arc;

use async_trait::async_trait;
use common::ExecutionId;
use tokio_util::sync::CancellationToken;

use crate::error::ActivityError;
use crate::observability::Span;

/// Per-call context handed to an activity.
///
/// Carries the cancellation token for the run (already bound to the workflow
/// timeout) and the span the call is traced under. Activities that block on
/// I/O should select on [`ActivityContext::cancelled`] so they return
/// promptly when the run is aborted.
#[derive(Clone)]
pub struct ActivityContext {
    pub workflow_id: String,
    pub execution_id: ExecutionId,
    pub activity: String,
    /// 1-based attempt number. Always 1 during compensation.
    pub attempt: u32,
    pub cancellation: CancellationToken,
    pub span: Arc<dyn Span>,
}

impl ActivityContext {
    /// Returns true once the run has been cancelled or has timed out.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes when the run is cancelled or times out.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Returns a copy of this context scoped to a nested activity.
    pub fn for_activity(&self, activity: &str, span: Arc<dyn Span>) -> Self {
        Self {
            activity: activity.to_string(),
            span,
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityContext")
            .field("workflow_id", &self.workflow_id)
            .field("execution_id", &self.execution_id)
            .field("activity", &self.activity)
            .field("attempt", &self.attempt)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A named unit of work with forward and compensating logic.
///
/// One instance may serve many concurrent executions, so implementations keep
/// no per-run state: everything a run needs travels in the payload `P`.
///
/// `execute` may be called more than once for the same logical step when the
/// engine retries, and must not apply its side effect twice.
///
/// `compensate` is called with the workflow's original input for every step
/// whose `execute` succeeded. It must work out for itself whether there is
/// anything to undo and succeed quietly when there is not.
#[async_trait]
pub trait Activity<P>: Send + Sync
where
    P: Send + Sync,
{
    /// Unique name of the step within its workflow.
    fn name(&self) -> &str;

    /// Performs the step and returns the payload for the next step.
    async fn execute(&self, ctx: &ActivityContext, input: &P) -> Result<P, ActivityError>;

    /// Reverses a successful `execute`. Read-only steps keep the default.
    async fn compensate(&self, _ctx: &ActivityContext, _input: &P) -> Result<(), ActivityError> {
        Ok(())
    }
}

/// Shared handle to an activity, as stored in a workflow definition.
pub type ActivityRef<P> = Arc<dyn Activity<P>>;
