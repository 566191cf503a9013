//! Observability ports consumed by the engine, plus the adapters that ship
//! with it.
//!
//! The engine never talks to a logging, metrics or tracing backend directly.
//! It calls the [`Logger`], [`MetricsRecorder`] and [`Tracer`] traits, and the
//! application chooses the implementation when it builds the engine. The
//! default bundle routes logs and spans through `tracing` and metrics through
//! the `metrics` facade, which the API binary exports to Prometheus.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::state::ExecutionStatus;

/// A structured log field.
pub type Field<'a> = (&'a str, serde_json::Value);

/// Structured logger port.
pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str, fields: &[Field<'_>]);
    fn info(&self, msg: &str, fields: &[Field<'_>]);
    fn warn(&self, msg: &str, fields: &[Field<'_>]);
    fn error(&self, msg: &str, fields: &[Field<'_>]);
}

/// Metrics port.
pub trait MetricsRecorder: Send + Sync {
    /// Records the duration and outcome of one whole workflow run.
    fn record_workflow_execution(&self, workflow: &str, duration: Duration, status: ExecutionStatus);

    /// Records the duration and outcome of one activity slot (all attempts).
    fn record_activity_execution(
        &self,
        workflow: &str,
        activity: &str,
        duration: Duration,
        status: ExecutionStatus,
    );

    fn increment_workflow_counter(&self, workflow: &str, status: ExecutionStatus);

    fn increment_activity_counter(&self, workflow: &str, activity: &str, status: ExecutionStatus);
}

/// A unit of traced work.
///
/// Methods take `&self` so a span can be shared with the activity that runs
/// inside it.
pub trait Span: Send + Sync {
    fn set_attribute(&self, key: &str, value: serde_json::Value);

    fn record_error(&self, error: &dyn std::error::Error);

    /// Marks the span finished. Calling it twice has no further effect.
    fn end(&self);

    /// Lets a tracer recover its own span type from a parent handle.
    fn as_any(&self) -> &dyn Any;
}

/// Span factory port.
pub trait Tracer: Send + Sync {
    fn start_span(&self, name: &str, parent: Option<&dyn Span>) -> Arc<dyn Span>;
}

/// The three ports bundled together for engine construction.
#[derive(Clone)]
pub struct Observability {
    pub logger: Arc<dyn Logger>,
    pub metrics: Arc<dyn MetricsRecorder>,
    pub tracer: Arc<dyn Tracer>,
}

impl Observability {
    /// Adapters that discard everything.
    pub fn noop() -> Self {
        Self {
            logger: Arc::new(NoopLogger),
            metrics: Arc::new(NoopMetrics),
            tracer: Arc::new(NoopTracer),
        }
    }
}

impl Default for Observability {
    fn default() -> Self {
        Self {
            logger: Arc::new(TracingLogger),
            metrics: Arc::new(PrometheusMetrics),
            tracer: Arc::new(TracingTracer),
        }
    }
}

impl std::fmt::Debug for Observability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observability").finish_non_exhaustive()
    }
}

// -- tracing adapters --

/// Emits log lines as `tracing` events.
///
/// The correlation keys (`workflow_id`, `execution_id`, `activity`,
/// `status`, `error`) become first-class event fields so subscribers can
/// filter on them. Any other fields are rendered together as one JSON object
/// under `fields`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

/// Log fields split into the keys the subscriber sees directly and the rest.
#[derive(Debug, Default, PartialEq)]
struct LogRecord {
    workflow_id: Option<String>,
    execution_id: Option<String>,
    activity: Option<String>,
    status: Option<String>,
    error: Option<String>,
    rest: Option<String>,
}

impl LogRecord {
    fn from_fields(fields: &[Field<'_>]) -> Self {
        let mut record = Self::default();
        let mut rest = serde_json::Map::new();
        for (key, value) in fields {
            let slot = match *key {
                "workflow_id" => &mut record.workflow_id,
                "execution_id" => &mut record.execution_id,
                "activity" => &mut record.activity,
                "status" => &mut record.status,
                "error" => &mut record.error,
                other => {
                    rest.insert(other.to_string(), value.clone());
                    continue;
                }
            };
            *slot = Some(match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }
        if !rest.is_empty() {
            record.rest = Some(serde_json::Value::Object(rest).to_string());
        }
        record
    }
}

macro_rules! emit {
    ($level:expr, $msg:expr, $fields:expr) => {{
        let record = LogRecord::from_fields($fields);
        tracing::event!(
            $level,
            workflow_id = record.workflow_id.as_deref(),
            execution_id = record.execution_id.as_deref(),
            activity = record.activity.as_deref(),
            status = record.status.as_deref(),
            error = record.error.as_deref(),
            fields = record.rest.as_deref(),
            "{}",
            $msg
        );
    }};
}

impl Logger for TracingLogger {
    fn debug(&self, msg: &str, fields: &[Field<'_>]) {
        emit!(tracing::Level::DEBUG, msg, fields);
    }

    fn info(&self, msg: &str, fields: &[Field<'_>]) {
        emit!(tracing::Level::INFO, msg, fields);
    }

    fn warn(&self, msg: &str, fields: &[Field<'_>]) {
        emit!(tracing::Level::WARN, msg, fields);
    }

    fn error(&self, msg: &str, fields: &[Field<'_>]) {
        emit!(tracing::Level::ERROR, msg, fields);
    }
}

/// Opens `tracing` spans. The dynamic span name goes into `otel.name`.
///
/// Only the fields declared on the span can be recorded: `workflow.id`,
/// `workflow.name`, `execution.id`, `activity`, `attempt`, `status`, `error`.
/// Other attribute keys are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

/// Span produced by [`TracingTracer`].
#[derive(Debug)]
pub struct TracingSpan {
    span: tracing::Span,
    started: Instant,
    ended: AtomicBool,
}

impl TracingSpan {
    /// Returns the underlying `tracing` span.
    pub fn inner(&self) -> &tracing::Span {
        &self.span
    }
}

impl Tracer for TracingTracer {
    fn start_span(&self, name: &str, parent: Option<&dyn Span>) -> Arc<dyn Span> {
        let parent_id = parent
            .and_then(|p| p.as_any().downcast_ref::<TracingSpan>())
            .and_then(|p| p.span.id());

        let span = tracing::info_span!(
            parent: parent_id,
            "workflow",
            otel.name = %name,
            otel.status_code = tracing::field::Empty,
            workflow.id = tracing::field::Empty,
            workflow.name = tracing::field::Empty,
            execution.id = tracing::field::Empty,
            activity = tracing::field::Empty,
            attempt = tracing::field::Empty,
            status = tracing::field::Empty,
            error = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        Arc::new(TracingSpan {
            span,
            started: Instant::now(),
            ended: AtomicBool::new(false),
        })
    }
}

impl Span for TracingSpan {
    fn set_attribute(&self, key: &str, value: serde_json::Value) {
        match value {
            serde_json::Value::String(s) => self.span.record(key, s.as_str()),
            serde_json::Value::Bool(b) => self.span.record(key, b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => self.span.record(key, i),
                None => self.span.record(key, tracing::field::display(&n)),
            },
            other => self.span.record(key, tracing::field::display(&other)),
        };
    }

    fn record_error(&self, error: &dyn std::error::Error) {
        self.span.record("otel.status_code", "ERROR");
        self.span.record("error", tracing::field::display(error));
    }

    fn end(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            self.span
                .record("duration_ms", self.started.elapsed().as_millis() as u64);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// -- metrics adapter --

/// Records engine metrics through the `metrics` facade.
///
/// Metric names:
/// - `workflow_executions_total{workflow, status}`
/// - `workflow_duration_seconds{workflow, status}`
/// - `workflow_activity_executions_total{workflow, activity, status}`
/// - `workflow_activity_duration_seconds{workflow, activity, status}`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl MetricsRecorder for PrometheusMetrics {
    fn record_workflow_execution(&self, workflow: &str, duration: Duration, status: ExecutionStatus) {
        metrics::histogram!(
            "workflow_duration_seconds",
            "workflow" => workflow.to_string(),
            "status" => status.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn record_activity_execution(
        &self,
        workflow: &str,
        activity: &str,
        duration: Duration,
        status: ExecutionStatus,
    ) {
        metrics::histogram!(
            "workflow_activity_duration_seconds",
            "workflow" => workflow.to_string(),
            "activity" => activity.to_string(),
            "status" => status.as_str()
        )
        .record(duration.as_secs_f64());
    }

    fn increment_workflow_counter(&self, workflow: &str, status: ExecutionStatus) {
        metrics::counter!(
            "workflow_executions_total",
            "workflow" => workflow.to_string(),
            "status" => status.as_str()
        )
        .increment(1);
    }

    fn increment_activity_counter(&self, workflow: &str, activity: &str, status: ExecutionStatus) {
        metrics::counter!(
            "workflow_activity_executions_total",
            "workflow" => workflow.to_string(),
            "activity" => activity.to_string(),
            "status" => status.as_str()
        )
        .increment(1);
    }
}

// -- no-op adapters --

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _msg: &str, _fields: &[Field<'_>]) {}
    fn info(&self, _msg: &str, _fields: &[Field<'_>]) {}
    fn warn(&self, _msg: &str, _fields: &[Field<'_>]) {}
    fn error(&self, _msg: &str, _fields: &[Field<'_>]) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {
    fn record_workflow_execution(&self, _: &str, _: Duration, _: ExecutionStatus) {}
    fn record_activity_execution(&self, _: &str, _: &str, _: Duration, _: ExecutionStatus) {}
    fn increment_workflow_counter(&self, _: &str, _: ExecutionStatus) {}
    fn increment_activity_counter(&self, _: &str, _: &str, _: ExecutionStatus) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpan;

impl Tracer for NoopTracer {
    fn start_span(&self, _name: &str, _parent: Option<&dyn Span>) -> Arc<dyn Span> {
        Arc::new(NoopSpan)
    }
}

impl Span for NoopSpan {
    fn set_attribute(&self, _key: &str, _value: serde_json::Value) {}
    fn record_error(&self, _error: &dyn std::error::Error) {}
    fn end(&self) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_keys_are_lifted_out_of_fields() {
        let record = LogRecord::from_fields(&[
            ("workflow_id", "checkout".into()),
            ("execution_id", "e-1".into()),
            ("activity", "reserve_inventory".into()),
            ("attempt", 2.into()),
            ("duration_ms", 15.into()),
        ]);

        assert_eq!(record.workflow_id.as_deref(), Some("checkout"));
        assert_eq!(record.execution_id.as_deref(), Some("e-1"));
        assert_eq!(record.activity.as_deref(), Some("reserve_inventory"));
        assert_eq!(record.status, None);

        let rest: serde_json::Value = serde_json::from_str(record.rest.as_deref().unwrap()).unwrap();
        assert_eq!(rest, serde_json::json!({"attempt": 2, "duration_ms": 15}));
    }

    #[test]
    fn test_non_string_correlation_values_are_stringified() {
        let record = LogRecord::from_fields(&[("status", "completed".into()), ("error", 42.into())]);
        assert_eq!(record.status.as_deref(), Some("completed"));
        assert_eq!(record.error.as_deref(), Some("42"));
        assert_eq!(record.rest, None);
    }

    #[test]
    fn test_tracing_logger_emits_without_subscriber() {
        TracingLogger.info("workflow started", &[("workflow_id", "checkout".into())]);
        TracingLogger.error("boom", &[]);
    }

    #[test]
    fn test_tracing_span_end_is_idempotent() {
        let span = TracingTracer.start_span("root", None);
        span.set_attribute("workflow.id", "checkout".into());
        span.end();
        span.end();
        let concrete = span.as_any().downcast_ref::<TracingSpan>().unwrap();
        assert!(concrete.ended.load(Ordering::SeqCst));
    }

    #[test]
    fn test_child_span_accepts_foreign_parent() {
        let parent = NoopTracer.start_span("root", None);
        let child = TracingTracer.start_span("child", Some(parent.as_ref()));
        child.end();
    }
}
