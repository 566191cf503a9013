//! The workflow engine: registry, sequential execution with retries and
//! timeouts, and reverse-order compensation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use common::ExecutionId;
use tokio_util::sync::CancellationToken;

use crate::activity::{ActivityContext, ActivityRef};
use crate::context::{ActivityExecution, ExecutionContext};
use crate::definition::WorkflowDefinition;
use crate::error::{ActivityError, CancelReason, ExecutionError, Result, WorkflowError};
use crate::observability::{Field, Observability, Span};
use crate::state::ExecutionStatus;

/// How long an aborted step may keep running to clean up after itself.
pub const DEFAULT_CANCELLATION_GRACE: Duration = Duration::from_secs(5);

/// Registry and runner for workflows over the payload type `P`.
///
/// Each `execute` call runs its activities one after another on the calling
/// task. Independent calls may run concurrently; they share only the
/// read-mostly registry.
pub struct Engine<P> {
    workflows: RwLock<HashMap<String, Arc<WorkflowDefinition<P>>>>,
    observability: Observability,
    cancellation_grace: Duration,
}

impl<P> Default for Engine<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by every step of one run.
struct Run {
    caller: CancellationToken,
    /// Child of `caller`; also cancelled when the deadline passes.
    token: CancellationToken,
    deadline: Option<tokio::time::Instant>,
    grace: Duration,
    root: Arc<dyn Span>,
    execution_id: ExecutionId,
}

/// Result of racing a future against the run's cancellation.
enum Guarded<T> {
    Done(T),
    /// The run was already aborted; the future was never polled.
    Skipped(CancelReason),
    /// The run was aborted. `late` is what the future returned while it was
    /// draining, if it finished within the grace period.
    Aborted {
        reason: CancelReason,
        late: Option<T>,
    },
}

/// How one activity slot ended.
enum StepOutcome<P> {
    Completed(P),
    /// The step succeeded while draining after an abort. Its side effects
    /// stand, so it must be compensated.
    CompletedAfterAbort(WorkflowError),
    Failed(WorkflowError),
}

impl Run {
    fn abort_reason(&self) -> CancelReason {
        let expired = self
            .deadline
            .is_some_and(|at| tokio::time::Instant::now() >= at);
        if expired && !self.caller.is_cancelled() {
            CancelReason::DeadlineExceeded
        } else {
            CancelReason::Cancelled
        }
    }

    /// Races `fut` against cancellation and the run deadline.
    ///
    /// On abort the run token is cancelled. With `drain` set, `fut` is then
    /// polled for up to the grace period so the step can observe the
    /// cancellation and release what it holds; otherwise it is dropped.
    async fn guard<F: Future>(&self, fut: F, drain: bool) -> Guarded<F::Output> {
        if self.token.is_cancelled() {
            return Guarded::Skipped(self.abort_reason());
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::pin!(fut);
        let reason = tokio::select! {
            biased;
            _ = self.token.cancelled() => self.abort_reason(),
            _ = deadline => {
                self.token.cancel();
                CancelReason::DeadlineExceeded
            }
            out = &mut fut => return Guarded::Done(out),
        };

        let late = if drain {
            tokio::time::timeout(self.grace, fut).await.ok()
        } else {
            None
        };
        Guarded::Aborted { reason, late }
    }
}

impl<P> Engine<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates an engine that logs and traces through `tracing` and records
    /// metrics through the `metrics` facade.
    pub fn new() -> Self {
        Self::with_observability(Observability::default())
    }

    /// Creates an engine with custom observability adapters.
    pub fn with_observability(observability: Observability) -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
            observability,
            cancellation_grace: DEFAULT_CANCELLATION_GRACE,
        }
    }

    /// Sets how long a cancelled or timed-out step may keep running to
    /// clean up before the engine stops waiting for it.
    pub fn with_cancellation_grace(mut self, grace: Duration) -> Self {
        self.cancellation_grace = grace;
        self
    }

    /// Registers a workflow under its ID.
    ///
    /// Fails with [`WorkflowError::Configuration`] if the ID is already taken
    /// or the definition is incomplete.
    pub fn register_workflow(&self, definition: WorkflowDefinition<P>) -> Result<()> {
        definition.validate()?;

        let mut workflows = self
            .workflows
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if workflows.contains_key(definition.id()) {
            return Err(WorkflowError::Configuration(format!(
                "workflow '{}' is already registered",
                definition.id()
            )));
        }

        self.observability.logger.info(
            "workflow registered",
            &[
                ("workflow_id", definition.id().into()),
                ("activities", definition.activities().len().into()),
            ],
        );
        workflows.insert(definition.id().to_string(), Arc::new(definition));
        Ok(())
    }

    /// Looks up a registered workflow.
    pub fn get_workflow(&self, id: &str) -> Option<Arc<WorkflowDefinition<P>>> {
        self.workflows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Returns every registered workflow, sorted by ID.
    pub fn list_workflows(&self) -> Vec<Arc<WorkflowDefinition<P>>> {
        let mut all: Vec<_> = self
            .workflows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// Runs a registered workflow to completion.
    ///
    /// Returns `Ok` only when every activity succeeded. On failure the error
    /// carries the finished [`ExecutionContext`]: its status is `Compensated`
    /// when every completed step was rolled back and `Failed` otherwise. The
    /// returned error is the forward failure, or a
    /// [`WorkflowError::Compensation`] wrapping it when rollback broke too.
    ///
    /// Cancelling `cancellation`, or reaching the workflow timeout, cancels
    /// the step in flight and skips any remaining retries. The engine keeps
    /// waiting on that step for the grace period so it can clean up; if it
    /// finishes successfully anyway it is compensated like any other
    /// completed step.
    pub async fn execute(
        &self,
        cancellation: &CancellationToken,
        workflow_id: &str,
        input: P,
    ) -> std::result::Result<ExecutionContext<P>, ExecutionError<P>> {
        let Some(definition) = self.get_workflow(workflow_id) else {
            self.observability
                .logger
                .warn("workflow not found", &[("workflow_id", workflow_id.into())]);
            return Err(ExecutionError::not_started(WorkflowError::NotFound(
                workflow_id.to_string(),
            )));
        };

        let started = Instant::now();
        let mut ctx = ExecutionContext::start(definition.id(), input);
        ctx.metadata
            .insert("workflow_name".to_string(), definition.name().to_string());

        let root = self
            .observability
            .tracer
            .start_span(&format!("workflow.{}", definition.id()), None);
        root.set_attribute("workflow.id", definition.id().into());
        root.set_attribute("workflow.name", definition.name().into());
        root.set_attribute("execution.id", ctx.execution_id.to_string().into());

        let options = definition.options();
        let run = Run {
            caller: cancellation.clone(),
            token: cancellation.child_token(),
            deadline: options
                .deadline()
                .map(|timeout| tokio::time::Instant::now() + timeout),
            grace: self.cancellation_grace,
            root,
            execution_id: ctx.execution_id,
        };

        self.observability.logger.info(
            "workflow started",
            &self.run_fields(&definition, &run, &[]),
        );

        let (executed, forward) = self.run_forward(&run, &definition, &mut ctx).await;

        let outcome = match forward {
            Ok(output) => {
                ctx.status = ExecutionStatus::Completed;
                ctx.output = Some(output);
                Ok(())
            }
            Err(error) => {
                ctx.error = Some(error.clone());
                if let Some(name) = error.activity() {
                    ctx.metadata
                        .insert("failed_activity".to_string(), name.to_string());
                }

                if options.compensate_on_failure {
                    ctx.status = ExecutionStatus::Compensating;
                    self.observability.logger.warn(
                        "workflow failed, compensating",
                        &self.run_fields(
                            &definition,
                            &run,
                            &[
                                ("error", error.to_string().into()),
                                ("to_compensate", executed.len().into()),
                            ],
                        ),
                    );

                    match self
                        .compensate(&run, &definition, &mut ctx, &executed, &error)
                        .await
                    {
                        Ok(()) => {
                            ctx.status = ExecutionStatus::Compensated;
                            Err(error)
                        }
                        Err(compensation) => {
                            ctx.status = ExecutionStatus::Failed;
                            ctx.compensation_error = Some(compensation.clone());
                            Err(compensation)
                        }
                    }
                } else {
                    ctx.status = ExecutionStatus::Failed;
                    Err(error)
                }
            }
        };

        ctx.end_time = Some(Utc::now());
        let elapsed = started.elapsed();

        run.root.set_attribute("status", ctx.status.as_str().into());
        if let Err(error) = &outcome {
            run.root.record_error(error);
        }
        run.root.end();

        let metrics = &self.observability.metrics;
        metrics.record_workflow_execution(definition.id(), elapsed, ctx.status);
        metrics.increment_workflow_counter(definition.id(), ctx.status);

        let fields = self.run_fields(
            &definition,
            &run,
            &[
                ("status", ctx.status.as_str().into()),
                ("duration_ms", (elapsed.as_millis() as u64).into()),
            ],
        );
        match ctx.status {
            ExecutionStatus::Completed => {
                self.observability.logger.info("workflow completed", &fields)
            }
            ExecutionStatus::Compensated => self
                .observability
                .logger
                .warn("workflow compensated", &fields),
            _ => self.observability.logger.error("workflow failed", &fields),
        }

        match outcome {
            Ok(()) => Ok(ctx),
            Err(error) => Err(ExecutionError::with_context(error, ctx)),
        }
    }

    /// Runs every activity in order, threading each output into the next
    /// step. Returns the steps that succeeded, as (audit index, activity),
    /// alongside the final payload or the error that stopped the run.
    async fn run_forward(
        &self,
        run: &Run,
        definition: &WorkflowDefinition<P>,
        ctx: &mut ExecutionContext<P>,
    ) -> (Vec<(usize, ActivityRef<P>)>, Result<P>) {
        let mut executed = Vec::with_capacity(definition.activities().len());
        let mut current = ctx.input.clone();

        for activity in definition.activities() {
            let index = ctx.activities.len();
            match self
                .run_activity(run, definition, ctx, activity, &current)
                .await
            {
                StepOutcome::Completed(output) => {
                    executed.push((index, activity.clone()));
                    current = output;
                }
                StepOutcome::CompletedAfterAbort(error) => {
                    executed.push((index, activity.clone()));
                    return (executed, Err(error));
                }
                StepOutcome::Failed(error) => return (executed, Err(error)),
            }
        }

        (executed, Ok(current))
    }

    /// Runs one activity slot with retries and appends its audit record.
    async fn run_activity(
        &self,
        run: &Run,
        definition: &WorkflowDefinition<P>,
        ctx: &mut ExecutionContext<P>,
        activity: &ActivityRef<P>,
        input: &P,
    ) -> StepOutcome<P> {
        let name = activity.name().to_string();
        let options = definition.options();
        let max_attempts = options.max_attempts();
        let start_time = Utc::now();
        let started = Instant::now();

        let mut attempts = 0;
        // Err carries the output of a step that finished after the abort.
        let result: std::result::Result<P, (WorkflowError, Option<P>)> = loop {
            attempts += 1;

            let span = self
                .observability
                .tracer
                .start_span(&format!("activity.{name}"), Some(run.root.as_ref()));
            span.set_attribute("workflow.id", definition.id().into());
            span.set_attribute("execution.id", run.execution_id.to_string().into());
            span.set_attribute("activity", name.as_str().into());
            span.set_attribute("attempt", attempts.into());

            let actx = ActivityContext {
                workflow_id: definition.id().to_string(),
                execution_id: run.execution_id,
                activity: name.clone(),
                attempt: attempts,
                cancellation: run.token.clone(),
                span: span.clone(),
            };

            let error = match run.guard(activity.execute(&actx, input), true).await {
                Guarded::Done(Ok(output)) => {
                    span.set_attribute("status", ExecutionStatus::Completed.as_str().into());
                    span.end();
                    break Ok(output);
                }
                Guarded::Done(Err(error)) => {
                    span.record_error(&error);
                    span.end();
                    error
                }
                Guarded::Skipped(reason) => {
                    let error = WorkflowError::Cancelled {
                        activity: name.clone(),
                        reason,
                    };
                    span.record_error(&error);
                    span.end();
                    break Err((error, None));
                }
                Guarded::Aborted { reason, late } => {
                    let error = WorkflowError::Cancelled {
                        activity: name.clone(),
                        reason,
                    };
                    span.record_error(&error);
                    span.end();

                    let late = match late {
                        Some(Ok(output)) => Some(output),
                        Some(Err(_)) => None,
                        None => {
                            self.observability.logger.error(
                                "activity did not stop within the cancellation grace period",
                                &self.run_fields(
                                    definition,
                                    run,
                                    &[
                                        ("activity", name.as_str().into()),
                                        ("grace_ms", (run.grace.as_millis() as u64).into()),
                                    ],
                                ),
                            );
                            None
                        }
                    };
                    break Err((error, late));
                }
            };

            if run.token.is_cancelled() || error == ActivityError::Cancelled {
                let reason = run.abort_reason();
                break Err((
                    WorkflowError::Cancelled {
                        activity: name.clone(),
                        reason,
                    },
                    None,
                ));
            }

            if let ActivityError::InvalidPayload(reason) = error {
                break Err((
                    WorkflowError::InvalidPayload {
                        activity: name.clone(),
                        reason,
                    },
                    None,
                ));
            }

            let step_error = WorkflowError::Step {
                activity: name.clone(),
                attempts,
                reason: error.to_string(),
            };
            if !error.is_retryable() || attempts >= max_attempts {
                break Err((step_error, None));
            }

            self.observability.logger.warn(
                "activity attempt failed, retrying",
                &self.run_fields(
                    definition,
                    run,
                    &[
                        ("activity", name.as_str().into()),
                        ("attempt", attempts.into()),
                        ("max_attempts", max_attempts.into()),
                        ("error", error.to_string().into()),
                    ],
                ),
            );

            let delay = tokio::time::sleep(options.retry_delay);
            if let Guarded::Skipped(reason) | Guarded::Aborted { reason, .. } =
                run.guard(delay, false).await
            {
                break Err((
                    WorkflowError::Cancelled {
                        activity: name.clone(),
                        reason,
                    },
                    None,
                ));
            }
        };

        let elapsed = started.elapsed();
        let (status, output, error) = match &result {
            Ok(output) => (ExecutionStatus::Completed, Some(output.clone()), None),
            Err((error, Some(late))) => (
                ExecutionStatus::Completed,
                Some(late.clone()),
                Some(error.to_string()),
            ),
            Err((error, None)) => (ExecutionStatus::Failed, None, Some(error.to_string())),
        };

        ctx.activities.push(ActivityExecution {
            name: name.clone(),
            status,
            start_time,
            end_time: Some(Utc::now()),
            input: input.clone(),
            output,
            error,
            attempts,
        });

        let metrics = &self.observability.metrics;
        metrics.record_activity_execution(definition.id(), &name, elapsed, status);
        metrics.increment_activity_counter(definition.id(), &name, status);

        let mut fields = vec![
            ("activity", name.as_str().into()),
            ("attempts", attempts.into()),
            ("duration_ms", (elapsed.as_millis() as u64).into()),
        ];
        match result {
            Ok(output) => {
                self.observability.logger.info(
                    "activity completed",
                    &self.run_fields(definition, run, &fields),
                );
                StepOutcome::Completed(output)
            }
            Err((error, late)) => {
                fields.push(("error", error.to_string().into()));
                let message = if late.is_some() {
                    "activity completed after the run was aborted"
                } else {
                    "activity failed"
                };
                self.observability
                    .logger
                    .warn(message, &self.run_fields(definition, run, &fields));
                match late {
                    Some(_) => StepOutcome::CompletedAfterAbort(error),
                    None => StepOutcome::Failed(error),
                }
            }
        }
    }

    /// Rolls back `executed` in reverse order against the original input,
    /// stopping at the first compensation that fails.
    ///
    /// Compensation runs under a fresh cancellation token: a run that was
    /// cancelled or timed out still gets its side effects undone.
    async fn compensate(
        &self,
        run: &Run,
        definition: &WorkflowDefinition<P>,
        ctx: &mut ExecutionContext<P>,
        executed: &[(usize, ActivityRef<P>)],
        cause: &WorkflowError,
    ) -> Result<()> {
        let original = ctx.input.clone();
        let token = CancellationToken::new();
        let mut compensated = 0usize;

        for (index, activity) in executed.iter().rev() {
            let name = activity.name();
            let span = self
                .observability
                .tracer
                .start_span(&format!("compensate.{name}"), Some(run.root.as_ref()));
            span.set_attribute("workflow.id", definition.id().into());
            span.set_attribute("execution.id", run.execution_id.to_string().into());
            span.set_attribute("activity", name.into());

            let actx = ActivityContext {
                workflow_id: definition.id().to_string(),
                execution_id: run.execution_id,
                activity: name.to_string(),
                attempt: 1,
                cancellation: token.clone(),
                span: span.clone(),
            };

            let started = Instant::now();
            let result = activity.compensate(&actx, &original).await;
            let elapsed = started.elapsed();

            match result {
                Ok(()) => {
                    span.set_attribute("status", ExecutionStatus::Compensated.as_str().into());
                    span.end();
                    ctx.mark_compensated(*index);
                    compensated += 1;

                    self.observability.metrics.record_activity_execution(
                        definition.id(),
                        name,
                        elapsed,
                        ExecutionStatus::Compensated,
                    );
                    self.observability.logger.info(
                        "activity compensated",
                        &self.run_fields(definition, run, &[("activity", name.into())]),
                    );
                }
                Err(error) => {
                    span.record_error(&error);
                    span.end();

                    self.observability.metrics.record_activity_execution(
                        definition.id(),
                        name,
                        elapsed,
                        ExecutionStatus::Failed,
                    );
                    self.observability.logger.error(
                        "compensation failed, side effects left unreconciled",
                        &self.run_fields(
                            definition,
                            run,
                            &[
                                ("activity", name.into()),
                                ("error", error.to_string().into()),
                                ("cause", cause.to_string().into()),
                                ("compensated", compensated.into()),
                                ("remaining", (executed.len() - compensated - 1).into()),
                            ],
                        ),
                    );
                    ctx.metadata
                        .insert("compensated_activities".to_string(), compensated.to_string());

                    return Err(WorkflowError::Compensation {
                        activity: name.to_string(),
                        reason: error.to_string(),
                        cause: Box::new(cause.clone()),
                    });
                }
            }
        }

        ctx.metadata
            .insert("compensated_activities".to_string(), compensated.to_string());
        Ok(())
    }

    fn run_fields<'a>(
        &self,
        definition: &'a WorkflowDefinition<P>,
        run: &Run,
        extra: &[Field<'a>],
    ) -> Vec<Field<'a>> {
        let mut fields = Vec::with_capacity(extra.len() + 2);
        fields.push(("workflow_id", definition.id().into()));
        fields.push(("execution_id", run.execution_id.to_string().into()));
        fields.extend_from_slice(extra);
        fields
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::activity::Activity;

    struct Append(&'static str);

    #[async_trait]
    impl Activity<Vec<String>> for Append {
        fn name(&self) -> &str {
            self.0
        }

        async fn execute(
            &self,
            _ctx: &ActivityContext,
            input: &Vec<String>,
        ) -> std::result::Result<Vec<String>, ActivityError> {
            let mut out = input.clone();
            out.push(self.0.to_string());
            Ok(out)
        }
    }

    struct Flaky {
        failures_left: Mutex<u32>,
    }

    #[async_trait]
    impl Activity<Vec<String>> for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn execute(
            &self,
            _ctx: &ActivityContext,
            input: &Vec<String>,
        ) -> std::result::Result<Vec<String>, ActivityError> {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(ActivityError::failed("transient"));
            }
            Ok(input.clone())
        }
    }

    fn engine() -> Engine<Vec<String>> {
        Engine::with_observability(Observability::noop())
    }

    fn definition(id: &str) -> WorkflowDefinition<Vec<String>> {
        WorkflowDefinition::builder()
            .id(id)
            .name("Letters")
            .activity(Append("a"))
            .activity(Append("b"))
            .retry_delay(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let engine = engine();
        engine.register_workflow(definition("zeta")).unwrap();
        engine.register_workflow(definition("alpha")).unwrap();

        assert!(engine.get_workflow("zeta").is_some());
        assert!(engine.get_workflow("missing").is_none());

        let ids: Vec<String> = engine
            .list_workflows()
            .iter()
            .map(|w| w.id().to_string())
            .collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let engine = engine();
        engine.register_workflow(definition("letters")).unwrap();

        let err = engine.register_workflow(definition("letters")).unwrap_err();
        assert!(matches!(err, WorkflowError::Configuration(_)));
        assert_eq!(engine.list_workflows().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_workflow_is_not_found() {
        let engine = engine();
        let err = engine
            .execute(&CancellationToken::new(), "nope", vec![])
            .await
            .unwrap_err();

        assert_eq!(err.error, WorkflowError::NotFound("nope".to_string()));
        assert!(err.context.is_none());
    }

    #[tokio::test]
    async fn test_outputs_thread_through_steps() {
        let engine = engine();
        engine.register_workflow(definition("letters")).unwrap();

        let ctx = engine
            .execute(&CancellationToken::new(), "letters", vec!["start".to_string()])
            .await
            .unwrap();

        assert_eq!(ctx.output, Some(vec!["start".into(), "a".into(), "b".into()]));
        assert_eq!(ctx.activities[1].input, vec!["start".to_string(), "a".to_string()]);
        assert_eq!(ctx.metadata.get("workflow_name").map(String::as_str), Some("Letters"));
        assert!(ctx.end_time.is_some());
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_within_budget() {
        let engine = engine();
        engine
            .register_workflow(
                WorkflowDefinition::builder()
                    .id("flaky")
                    .name("Flaky")
                    .activity(Flaky {
                        failures_left: Mutex::new(2),
                    })
                    .max_retries(2)
                    .retry_delay(Duration::from_millis(1))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let ctx = engine
            .execute(&CancellationToken::new(), "flaky", vec![])
            .await
            .unwrap();

        assert_eq!(ctx.status, ExecutionStatus::Completed);
        assert_eq!(ctx.activities[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_already_cancelled_caller_runs_nothing() {
        let engine = engine();
        engine.register_workflow(definition("letters")).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = engine.execute(&token, "letters", vec![]).await.unwrap_err();

        assert_eq!(
            err.error,
            WorkflowError::Cancelled {
                activity: "a".to_string(),
                reason: CancelReason::Cancelled,
            }
        );
        let ctx = err.context.unwrap();
        assert_eq!(ctx.status, ExecutionStatus::Compensated);
        assert_eq!(ctx.activities[0].attempts, 1);
        assert!(ctx.output.is_none());
    }

    struct GivesUp;

    #[async_trait]
    impl Activity<Vec<String>> for GivesUp {
        fn name(&self) -> &str {
            "gives_up"
        }

        async fn execute(
            &self,
            _ctx: &ActivityContext,
            _input: &Vec<String>,
        ) -> std::result::Result<Vec<String>, ActivityError> {
            Err(ActivityError::Cancelled)
        }
    }

    #[tokio::test]
    async fn test_self_cancelled_step_without_deadline_reports_cancelled() {
        let engine = engine();
        engine
            .register_workflow(
                WorkflowDefinition::builder()
                    .id("gives_up")
                    .name("Gives up")
                    .activity(GivesUp)
                    .timeout(Duration::ZERO)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let err = engine
            .execute(&CancellationToken::new(), "gives_up", vec![])
            .await
            .unwrap_err();

        assert_eq!(
            err.error,
            WorkflowError::Cancelled {
                activity: "gives_up".to_string(),
                reason: CancelReason::Cancelled,
            }
        );
    }

    #[tokio::test]
    async fn test_self_cancelled_step_before_deadline_reports_cancelled() {
        let engine = engine();
        engine
            .register_workflow(
                WorkflowDefinition::builder()
                    .id("gives_up")
                    .name("Gives up")
                    .activity(GivesUp)
                    .timeout(Duration::from_secs(60))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let err = engine
            .execute(&CancellationToken::new(), "gives_up", vec![])
            .await
            .unwrap_err();

        assert_eq!(err.error.activity(), Some("gives_up"));
        assert!(matches!(
            err.error,
            WorkflowError::Cancelled {
                reason: CancelReason::Cancelled,
                ..
            }
        ));
    }
}
