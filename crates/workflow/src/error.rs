//! Workflow error types.

use thiserror::Error;

use crate::context::ExecutionContext;

/// Why a run stopped before its activities finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The workflow-level timeout elapsed.
    DeadlineExceeded,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "cancelled"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Errors produced by the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Invalid definition or registration input. Always a caller bug.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No workflow is registered under the requested ID.
    #[error("Workflow not found: {0}")]
    NotFound(String),

    /// An activity failed on every attempt it was allowed.
    #[error("Activity '{activity}' failed after {attempts} attempt(s): {reason}")]
    Step {
        activity: String,
        attempts: u32,
        reason: String,
    },

    /// `activity` rejected its input payload. Never retried.
    #[error("Activity '{activity}' rejected its input: {reason}")]
    InvalidPayload { activity: String, reason: String },

    /// The run was cancelled or timed out while `activity` was in flight.
    #[error("Activity '{activity}' aborted: {reason}")]
    Cancelled {
        activity: String,
        reason: CancelReason,
    },

    /// Rolling back `activity` failed. `cause` is the forward error that
    /// triggered the rollback.
    #[error("Compensation of '{activity}' failed: {reason} (after: {cause})")]
    Compensation {
        activity: String,
        reason: String,
        cause: Box<WorkflowError>,
    },
}

impl WorkflowError {
    /// Returns true if this error came from cancellation or a timeout.
    pub fn is_cancellation(&self) -> bool {
        match self {
            WorkflowError::Cancelled { .. } => true,
            WorkflowError::Compensation { cause, .. } => cause.is_cancellation(),
            _ => false,
        }
    }

    /// Returns the activity the error is attributed to, if any.
    pub fn activity(&self) -> Option<&str> {
        match self {
            WorkflowError::Step { activity, .. }
            | WorkflowError::InvalidPayload { activity, .. }
            | WorkflowError::Cancelled { activity, .. } => Some(activity),
            WorkflowError::Compensation { cause, .. } => cause.activity(),
            WorkflowError::Configuration(_) | WorkflowError::NotFound(_) => None,
        }
    }

    /// Returns the forward error, unwrapping a compensation failure.
    pub fn root_cause(&self) -> &WorkflowError {
        match self {
            WorkflowError::Compensation { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// Errors an activity reports back to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivityError {
    /// The step failed. The engine retries it per the workflow's policy.
    #[error("{0}")]
    Failed(String),

    /// The payload is missing data this step needs. Never retried.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The step observed cancellation and gave up. Never retried.
    #[error("cancelled")]
    Cancelled,
}

impl ActivityError {
    /// Creates a retryable failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        ActivityError::Failed(reason.into())
    }

    /// Creates a non-retryable payload validation failure.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        ActivityError::InvalidPayload(reason.into())
    }

    /// Returns true if the engine may try the step again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ActivityError::Failed(_))
    }
}

/// A failed `Engine::execute` call.
///
/// `context` is absent only when the run never started (unknown workflow).
/// Otherwise it holds the finished execution record, including the per-step
/// audit trail.
#[derive(Debug)]
pub struct ExecutionError<P> {
    pub error: WorkflowError,
    pub context: Option<Box<ExecutionContext<P>>>,
}

impl<P> ExecutionError<P> {
    pub(crate) fn not_started(error: WorkflowError) -> Self {
        Self {
            error,
            context: None,
        }
    }

    pub(crate) fn with_context(error: WorkflowError, context: ExecutionContext<P>) -> Self {
        Self {
            error,
            context: Some(Box::new(context)),
        }
    }
}

impl<P> std::fmt::Display for ExecutionError<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl<P: std::fmt::Debug> std::error::Error for ExecutionError<P> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<P> From<ExecutionError<P>> for WorkflowError {
    fn from(err: ExecutionError<P>) -> Self {
        err.error
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
