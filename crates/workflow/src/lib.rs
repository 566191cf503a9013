//! Linear saga engine.
//!
//! A workflow is an ordered list of [`Activity`] steps run one after another
//! against a payload. Each step's output becomes the next step's input. A
//! failing step is retried with a fixed delay; once it runs out of attempts,
//! every step that already succeeded is compensated in reverse order, using
//! the workflow's original input.
//!
//! ```text
//! execute ──► A ──► B ──► C ✗
//!                         │
//!             A⁻¹ ◄── B⁻¹ ◄┘   (compensation, reverse order)
//! ```
//!
//! Runs are bounded by an optional timeout and a caller-supplied
//! cancellation token. Logging, metrics and tracing go through the ports in
//! [`observability`], so the engine carries no opinion about backends.

pub mod activity;
pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod observability;
pub mod parallel;
pub mod state;

pub use activity::{Activity, ActivityContext, ActivityRef};
pub use context::{ActivityExecution, ExecutionContext};
pub use definition::{WorkflowBuilder, WorkflowDefinition, WorkflowOptions};
pub use engine::{DEFAULT_CANCELLATION_GRACE, Engine};
pub use error::{ActivityError, CancelReason, ExecutionError, WorkflowError};
pub use observability::{
    Logger, MetricsRecorder, NoopLogger, NoopMetrics, NoopTracer, Observability,
    PrometheusMetrics, Span, Tracer, TracingLogger, TracingTracer,
};
pub use parallel::ParallelActivity;
pub use state::ExecutionStatus;

pub use tokio_util::sync::CancellationToken;
