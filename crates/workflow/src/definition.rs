//! Workflow definitions and their builder.

use std::sync::Arc;
use std::time::Duration;

use crate::activity::{Activity, ActivityRef};
use crate::error::{Result, WorkflowError};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default timeout for a whole run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Execution policy for a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Retries after the first attempt; each step gets `max_retries + 1` tries.
    pub max_retries: u32,
    /// Fixed delay between attempts of the same step.
    pub retry_delay: Duration,
    /// Deadline for the whole run. `Duration::ZERO` disables it.
    pub timeout: Duration,
    /// Roll back completed steps when a step fails for good.
    pub compensate_on_failure: bool,
}

impl WorkflowOptions {
    /// Total attempts each step is allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the run deadline, if one is set.
    pub fn deadline(&self) -> Option<Duration> {
        (!self.timeout.is_zero()).then_some(self.timeout)
    }
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            compensate_on_failure: true,
        }
    }
}

/// A validated, immutable workflow: an ordered list of activities plus the
/// policy used to run them.
pub struct WorkflowDefinition<P> {
    id: String,
    name: String,
    description: String,
    activities: Vec<ActivityRef<P>>,
    options: WorkflowOptions,
}

impl<P> WorkflowDefinition<P>
where
    P: Send + Sync,
{
    /// Starts building a definition.
    pub fn builder() -> WorkflowBuilder<P> {
        WorkflowBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Activities in execution order.
    pub fn activities(&self) -> &[ActivityRef<P>] {
        &self.activities
    }

    /// Activity names in execution order.
    pub fn activity_names(&self) -> Vec<&str> {
        self.activities.iter().map(|a| a.name()).collect()
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    /// Checks the invariants every registered workflow must hold.
    pub(crate) fn validate(&self) -> Result<()> {
        validate_parts(&self.id, &self.name, self.activities.len())
    }
}

impl<P> std::fmt::Debug for WorkflowDefinition<P>
where
    P: Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("activities", &self.activity_names())
            .field("options", &self.options)
            .finish()
    }
}

fn validate_parts(id: &str, name: &str, activity_count: usize) -> Result<()> {
    if id.trim().is_empty() {
        return Err(WorkflowError::Configuration(
            "workflow id is required".to_string(),
        ));
    }
    if name.trim().is_empty() {
        return Err(WorkflowError::Configuration(format!(
            "workflow '{id}' has no name"
        )));
    }
    if activity_count == 0 {
        return Err(WorkflowError::Configuration(format!(
            "workflow '{id}' has no activities"
        )));
    }
    Ok(())
}

/// Builder for [`WorkflowDefinition`].
///
/// ```ignore
/// let checkout = WorkflowDefinition::builder()
///     .id("checkout")
///     .name("Checkout")
///     .activity(ReserveInventory::new(inventory))
///     .activity(AuthorizePayment::new(payments))
///     .max_retries(2)
///     .build()?;
/// ```
pub struct WorkflowBuilder<P> {
    id: String,
    name: String,
    description: String,
    activities: Vec<ActivityRef<P>>,
    options: WorkflowOptions,
}

impl<P> Default for WorkflowBuilder<P> {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            activities: Vec::new(),
            options: WorkflowOptions::default(),
        }
    }
}

impl<P> WorkflowBuilder<P>
where
    P: Send + Sync,
{
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends one activity.
    pub fn activity(self, activity: impl Activity<P> + 'static) -> Self {
        self.activity_ref(Arc::new(activity))
    }

    /// Appends an already shared activity.
    pub fn activity_ref(mut self, activity: ActivityRef<P>) -> Self {
        self.activities.push(activity);
        self
    }

    /// Appends several activities, keeping their order.
    pub fn activities(mut self, activities: impl IntoIterator<Item = ActivityRef<P>>) -> Self {
        self.activities.extend(activities);
        self
    }

    /// Replaces the whole policy at once.
    pub fn options(mut self, options: WorkflowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.options.retry_delay = retry_delay;
        self
    }

    /// Sets the run deadline. `Duration::ZERO` disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn compensate_on_failure(mut self, compensate: bool) -> Self {
        self.options.compensate_on_failure = compensate;
        self
    }

    /// Validates and freezes the definition.
    pub fn build(self) -> Result<WorkflowDefinition<P>> {
        validate_parts(&self.id, &self.name, self.activities.len())?;
        Ok(WorkflowDefinition {
            id: self.id,
            name: self.name,
            description: self.description,
            activities: self.activities,
            options: self.options,
        })
    }
}
