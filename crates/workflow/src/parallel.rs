//! Composite activity that runs several branches concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::activity::{Activity, ActivityContext, ActivityRef};
use crate::error::ActivityError;

/// Folds branch outputs back into the input payload.
pub type MergeFn<P> = Arc<dyn Fn(P, Vec<P>) -> P + Send + Sync>;

/// Runs its branches concurrently on the same input and joins on the first
/// error.
///
/// To the engine this is one ordinary activity. When a branch fails, the
/// remaining branches are signalled through a child cancellation token, the
/// branches that already succeeded are compensated in reverse order, and the
/// first real (non-cancellation) error is returned. On success the branch
/// outputs, in registration order, are folded into the input with the merge
/// function. Without one, the input passes through unchanged.
pub struct ParallelActivity<P> {
    name: String,
    branches: Vec<ActivityRef<P>>,
    merge: MergeFn<P>,
}

impl<P> ParallelActivity<P>
where
    P: Clone + Send + Sync + 'static,
{
    /// Creates an empty parallel group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
            merge: Arc::new(|input, _| input),
        }
    }

    /// Adds a branch.
    pub fn branch(self, activity: impl Activity<P> + 'static) -> Self {
        self.branch_ref(Arc::new(activity))
    }

    /// Adds an already shared branch.
    pub fn branch_ref(mut self, activity: ActivityRef<P>) -> Self {
        self.branches.push(activity);
        self
    }

    /// Sets how branch outputs are combined.
    pub fn merge_with(mut self, merge: impl Fn(P, Vec<P>) -> P + Send + Sync + 'static) -> Self {
        self.merge = Arc::new(merge);
        self
    }

    /// Returns the branch names in registration order.
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.name()).collect()
    }

    async fn rollback(
        &self,
        ctx: &ActivityContext,
        input: &P,
        succeeded: &[&ActivityRef<P>],
    ) -> Result<(), ActivityError> {
        // Undo must run to completion even when the group was aborted.
        let detached = CancellationToken::new();
        for branch in succeeded.iter().rev() {
            let mut branch_ctx = ctx.for_activity(branch.name(), ctx.span.clone());
            branch_ctx.cancellation = detached.clone();
            if let Err(e) = branch.compensate(&branch_ctx, input).await {
                tracing::error!(
                    group = %self.name,
                    branch = branch.name(),
                    error = %e,
                    "parallel branch compensation failed"
                );
                return Err(ActivityError::failed(format!(
                    "compensation of branch '{}' failed: {e}",
                    branch.name()
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<P> Activity<P> for ParallelActivity<P>
where
    P: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &ActivityContext, input: &P) -> Result<P, ActivityError> {
        let group = ctx.cancellation.child_token();

        let runs = self.branches.iter().map(|branch| {
            let mut branch_ctx = ctx.for_activity(branch.name(), ctx.span.clone());
            branch_ctx.cancellation = group.clone();
            let group = group.clone();
            async move {
                let result = branch.execute(&branch_ctx, input).await;
                if result.is_err() {
                    group.cancel();
                }
                result
            }
        });
        let results = join_all(runs).await;

        let mut outputs = Vec::with_capacity(results.len());
        let mut succeeded = Vec::new();
        let mut first_error: Option<ActivityError> = None;

        for (branch, result) in self.branches.iter().zip(results) {
            match result {
                Ok(output) => {
                    succeeded.push(branch);
                    outputs.push(output);
                }
                Err(e) => {
                    let replace = match &first_error {
                        None => true,
                        Some(ActivityError::Cancelled) => e != ActivityError::Cancelled,
                        Some(_) => false,
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            tracing::warn!(
                group = %self.name,
                succeeded = succeeded.len(),
                error = %err,
                "parallel branch failed, rolling back siblings"
            );
            self.rollback(ctx, input, &succeeded).await?;
            return Err(err);
        }

        Ok((self.merge)(input.clone(), outputs))
    }

    async fn compensate(&self, ctx: &ActivityContext, input: &P) -> Result<(), ActivityError> {
        let all: Vec<&ActivityRef<P>> = self.branches.iter().collect();
        self.rollback(ctx, input, &all).await
    }
}
