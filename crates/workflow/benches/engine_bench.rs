use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{Criterion, criterion_group, criterion_main};
use workflow::{
    Activity, ActivityContext, ActivityError, CancellationToken, Engine, Observability,
    ParallelActivity, WorkflowDefinition,
};

struct Increment(String);

#[async_trait]
impl Activity<u64> for Increment {
    fn name(&self) -> &str {
        &self.0
    }

    async fn execute(&self, _ctx: &ActivityContext, input: &u64) -> Result<u64, ActivityError> {
        Ok(input + 1)
    }
}

struct Fail;

#[async_trait]
impl Activity<u64> for Fail {
    fn name(&self) -> &str {
        "fail"
    }

    async fn execute(&self, _ctx: &ActivityContext, _input: &u64) -> Result<u64, ActivityError> {
        Err(ActivityError::failed("always"))
    }
}

fn steps(count: usize) -> Vec<workflow::ActivityRef<u64>> {
    (0..count)
        .map(|i| Arc::new(Increment(format!("step_{i}"))) as workflow::ActivityRef<u64>)
        .collect()
}

fn bench_sequential(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = Engine::with_observability(Observability::noop());
    engine
        .register_workflow(
            WorkflowDefinition::builder()
                .id("ten_steps")
                .name("Ten steps")
                .activities(steps(10))
                .build()
                .unwrap(),
        )
        .unwrap();
    let token = CancellationToken::new();

    c.bench_function("engine/sequential_10_steps", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.execute(&token, "ten_steps", 0).await.unwrap();
            });
        });
    });
}

fn bench_compensation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = Engine::with_observability(Observability::noop());
    engine
        .register_workflow(
            WorkflowDefinition::builder()
                .id("rollback")
                .name("Rollback")
                .activities(steps(10))
                .activity(Fail)
                .max_retries(0)
                .retry_delay(Duration::ZERO)
                .build()
                .unwrap(),
        )
        .unwrap();
    let token = CancellationToken::new();

    c.bench_function("engine/fail_and_compensate_10_steps", |b| {
        b.iter(|| {
            rt.block_on(async {
                let _ = engine.execute(&token, "rollback", 0).await;
            });
        });
    });
}

fn bench_parallel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = Engine::with_observability(Observability::noop());
    let fan_out = steps(8)
        .into_iter()
        .fold(ParallelActivity::new("fan_out"), |group, step| {
            group.branch_ref(step)
        })
        .merge_with(|input, outputs| input + outputs.len() as u64);
    engine
        .register_workflow(
            WorkflowDefinition::builder()
                .id("fan_out")
                .name("Fan out")
                .activity(fan_out)
                .build()
                .unwrap(),
        )
        .unwrap();
    let token = CancellationToken::new();

    c.bench_function("engine/parallel_8_branches", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.execute(&token, "fan_out", 0).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_sequential, bench_compensation, bench_parallel);
criterion_main!(benches);
