// tests/runner.rs

mod common;
use crate::common::builders::{WorkflowBuilder, diamond_workflow, linear_workflow};
use crate::common::{PipelineFixture, init_tracing};

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use pipedag::engine::{Runner, RunnerOptions};
use pipedag::errors::{EngineError, StoreError};
use pipedag::pipeline::{Job, JobOutcome, Pipeline};
use pipedag::processor::ProcessorRegistry;
use pipedag::store::{InMemoryStore, JobStore};
use pipedag::types::{JobStatus, PipelineStatus};
use pipedag::workflow::{ConfigValue, Workflow};
use pipedag_test_utils::fake_processor::{
    FailingProcessor, PanickingProcessor, RecordingProcessor,
};

type TestResult = Result<(), Box<dyn Error>>;

/// Registry where every listed type records into `executed`.
fn recording_registry(
    types: &[&str],
    executed: &Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
) -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    for t in types {
        let processor = match delay {
            Some(d) => RecordingProcessor::with_delay(Arc::clone(executed), d),
            None => RecordingProcessor::new(Arc::clone(executed)),
        };
        registry.register(t, Arc::new(processor));
    }
    registry
}

fn runner_for(fx: &PipelineFixture, registry: ProcessorRegistry, workers: usize) -> Runner {
    Runner::new(fx.store.clone(), Arc::new(registry), RunnerOptions { workers })
}

#[tokio::test]
async fn runs_linear_workflow_in_dependency_order() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let fx = PipelineFixture::generated(linear_workflow());
    let runner = runner_for(
        &fx,
        recording_registry(&["input", "merge", "output"], &executed, None),
        4,
    );

    let status = timeout(Duration::from_secs(5), runner.run(&fx.pipeline_id)).await??;

    assert_eq!(status, PipelineStatus::Completed);
    assert_eq!(
        *executed.lock().unwrap(),
        vec!["input1", "process1", "output1"]
    );

    let pipeline = fx.store.pipeline(&fx.pipeline_id)?;
    assert_eq!(pipeline.status, PipelineStatus::Completed);
    assert!(pipeline.jobs.iter().all(|j| j.status == JobStatus::Completed));
    assert_eq!(fx.job("output1").output, Some(json!("output1")));
    Ok(())
}

#[tokio::test]
async fn builtin_processors_pass_data_downstream() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("data")
        .node_with_config("name", "input", "key", ConfigValue::String("name".into()))
        .node_with_config("greeting", "constant", "value", ConfigValue::String("hi".into()))
        .node("combine", "merge")
        .node("out", "output")
        .edge("name", "combine")
        .edge("greeting", "combine")
        .edge("combine", "out")
        .build_validated();

    let registry = ProcessorRegistry::with_builtins();
    registry.validate_workflow(&wf)?;

    let fx = PipelineFixture::with_input(wf, json!({ "name": "flow" }));
    fx.generate()?;
    let runner = runner_for(&fx, registry, 2);

    let status = timeout(Duration::from_secs(5), runner.run(&fx.pipeline_id)).await??;
    assert_eq!(status, PipelineStatus::Completed);
    assert_eq!(
        fx.job("out").output,
        Some(json!({ "name": "flow", "greeting": "hi" }))
    );
    Ok(())
}

#[tokio::test]
async fn failure_blocks_dependents_and_fails_pipeline() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut registry = recording_registry(&["input", "output"], &executed, None);
    registry.register("boom", Arc::new(FailingProcessor));

    let wf = WorkflowBuilder::new("failing")
        .node("a", "input")
        .node("explode", "boom")
        .node("never", "output")
        .node("side", "output")
        .chain(&["a", "explode", "never"])
        .edge("a", "side")
        .build_validated();

    let fx = PipelineFixture::generated(wf);
    let runner = runner_for(&fx, registry, 4);

    let status = timeout(Duration::from_secs(5), runner.run(&fx.pipeline_id)).await??;

    assert_eq!(status, PipelineStatus::Failed);
    assert_eq!(fx.job("explode").status, JobStatus::Failed);
    assert!(
        fx.job("explode")
            .error
            .as_deref()
            .unwrap()
            .contains("intentional failure")
    );
    assert_eq!(fx.job("never").status, JobStatus::Pending);
    assert_eq!(fx.job("side").status, JobStatus::Completed);
    assert!(!executed.lock().unwrap().contains(&"never".to_string()));
    Ok(())
}

#[tokio::test]
async fn panicking_processor_fails_its_job() -> TestResult {
    init_tracing();

    let mut registry = ProcessorRegistry::new();
    registry.register("panic", Arc::new(PanickingProcessor));

    let wf = WorkflowBuilder::new("panics").node("p", "panic").build_validated();
    let fx = PipelineFixture::generated(wf);

    let status = timeout(
        Duration::from_secs(5),
        runner_for(&fx, registry, 1).run(&fx.pipeline_id),
    )
    .await??;

    assert_eq!(status, PipelineStatus::Failed);
    assert!(fx.job("p").error.as_deref().unwrap().contains("panicked"));
    Ok(())
}

#[tokio::test]
async fn unregistered_node_type_fails_job() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("unknown").node("x", "mystery").build_validated();
    let fx = PipelineFixture::generated(wf);

    let status = runner_for(&fx, ProcessorRegistry::new(), 1)
        .run(&fx.pipeline_id)
        .await?;

    assert_eq!(status, PipelineStatus::Failed);
    assert!(fx.job("x").error.as_deref().unwrap().contains("mystery"));
    Ok(())
}

#[tokio::test]
async fn single_worker_follows_priority_order() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let wf: Workflow = WorkflowBuilder::new("prio")
        .node_with_priority("low", "t", 30)
        .node_with_priority("high", "t", 10)
        .node_with_priority("mid", "t", 20)
        .build_validated();

    let fx = PipelineFixture::generated(wf);
    let runner = runner_for(&fx, recording_registry(&["t"], &executed, None), 1);
    runner.run(&fx.pipeline_id).await?;

    assert_eq!(*executed.lock().unwrap(), vec!["high", "mid", "low"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runners_execute_each_job_once() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let mut builder = WorkflowBuilder::new("wide").node("root", "t").node("sink", "t");
    for i in 0..12 {
        let leaf = format!("leaf{i:02}");
        builder = builder
            .node(&leaf, "t")
            .edge("root", &leaf)
            .edge(&leaf, "sink");
    }
    let fx = PipelineFixture::generated(builder.build_validated());

    let registry = recording_registry(&["t"], &executed, Some(Duration::from_millis(10)));
    let a = runner_for(&fx, registry.clone(), 3);
    let b = runner_for(&fx, registry, 3);

    let (ra, rb) = timeout(
        Duration::from_secs(10),
        async { tokio::join!(a.run(&fx.pipeline_id), b.run(&fx.pipeline_id)) },
    )
    .await?;
    ra?;
    rb?;

    let mut seen = executed.lock().unwrap().clone();
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(total, seen.len(), "a job executed more than once");
    assert_eq!(total, 14);

    let pipeline = fx.store.pipeline(&fx.pipeline_id)?;
    assert_eq!(pipeline.status, PipelineStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn cancelled_pipeline_dispatches_nothing() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let fx = PipelineFixture::generated(diamond_workflow());
    fx.store
        .set_pipeline_status(&fx.pipeline_id, PipelineStatus::Running)?;
    fx.store
        .set_pipeline_status(&fx.pipeline_id, PipelineStatus::Cancelled)?;

    let runner = runner_for(
        &fx,
        recording_registry(&["input", "merge", "output"], &executed, None),
        2,
    );
    let status = runner.run(&fx.pipeline_id).await?;

    assert_eq!(status, PipelineStatus::Cancelled);
    assert!(executed.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn finished_pipeline_is_not_rerun() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let fx = PipelineFixture::generated(linear_workflow());
    let runner = runner_for(
        &fx,
        recording_registry(&["input", "merge", "output"], &executed, None),
        2,
    );

    assert_eq!(runner.run(&fx.pipeline_id).await?, PipelineStatus::Completed);
    assert_eq!(runner.run(&fx.pipeline_id).await?, PipelineStatus::Completed);
    assert_eq!(executed.lock().unwrap().len(), 3);
    Ok(())
}

/// Delegates to an `InMemoryStore`, but rejects `finish_job` once for one node.
#[derive(Debug)]
struct FlakyFinishStore {
    inner: Arc<InMemoryStore>,
    fail_once_for: Mutex<Option<String>>,
}

impl JobStore for FlakyFinishStore {
    fn create_pipeline(
        &self,
        workflow_id: &str,
        input_data: serde_json::Value,
    ) -> Result<Pipeline, StoreError> {
        self.inner.create_pipeline(workflow_id, input_data)
    }

    fn pipeline(&self, pipeline_id: &str) -> Result<Pipeline, StoreError> {
        self.inner.pipeline(pipeline_id)
    }

    fn insert_jobs(&self, pipeline_id: &str, jobs: Vec<Job>) -> Result<(), StoreError> {
        self.inner.insert_jobs(pipeline_id, jobs)
    }

    fn transition_job(
        &self,
        pipeline_id: &str,
        node_id: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, StoreError> {
        self.inner.transition_job(pipeline_id, node_id, from, to)
    }

    fn finish_job(
        &self,
        pipeline_id: &str,
        node_id: &str,
        outcome: JobOutcome,
    ) -> Result<bool, StoreError> {
        let mut target = self.fail_once_for.lock().unwrap();
        if target.as_deref() == Some(node_id) {
            *target = None;
            return Err(StoreError::Poisoned);
        }
        drop(target);
        self.inner.finish_job(pipeline_id, node_id, outcome)
    }

    fn set_pipeline_status(
        &self,
        pipeline_id: &str,
        status: PipelineStatus,
    ) -> Result<(), StoreError> {
        self.inner.set_pipeline_status(pipeline_id, status)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn store_error_drains_in_flight_jobs() -> TestResult {
    init_tracing();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let wf = WorkflowBuilder::new("flaky")
        .node("fast", "fast")
        .node("slow", "slow")
        .node("sink", "fast")
        .edge("fast", "sink")
        .edge("slow", "sink")
        .build_validated();
    let fx = PipelineFixture::generated(wf);

    let mut registry = ProcessorRegistry::new();
    registry.register("fast", Arc::new(RecordingProcessor::new(Arc::clone(&executed))));
    registry.register(
        "slow",
        Arc::new(RecordingProcessor::with_delay(
            Arc::clone(&executed),
            Duration::from_millis(200),
        )),
    );
    let registry = Arc::new(registry);

    let flaky = Arc::new(FlakyFinishStore {
        inner: fx.store.clone(),
        fail_once_for: Mutex::new(Some("fast".to_string())),
    });
    let first = Runner::new(flaky, Arc::clone(&registry), RunnerOptions { workers: 2 });

    let result = timeout(Duration::from_secs(5), first.run(&fx.pipeline_id)).await?;
    assert!(matches!(result, Err(EngineError::Store(StoreError::Poisoned))));

    // Nothing this runner claimed is left running.
    assert_eq!(fx.job("fast").status, JobStatus::Completed);
    assert_eq!(fx.job("slow").status, JobStatus::Completed);
    assert_eq!(fx.job("sink").status, JobStatus::Pending);

    let second = Runner::new(fx.store.clone(), registry, RunnerOptions { workers: 2 });
    let status = timeout(Duration::from_secs(5), second.run(&fx.pipeline_id)).await??;

    assert_eq!(status, PipelineStatus::Completed);
    assert_eq!(fx.job("sink").status, JobStatus::Completed);
    assert_eq!(executed.lock().unwrap().len(), 3);
    Ok(())
}

#[tokio::test]
async fn pipeline_without_jobs_is_not_run() -> TestResult {
    init_tracing();

    let fx = PipelineFixture::new(linear_workflow());
    let runner = runner_for(&fx, ProcessorRegistry::with_builtins(), 1);

    let result = runner.run(&fx.pipeline_id).await;
    assert!(matches!(result, Err(EngineError::NotGenerated(id)) if id == fx.pipeline_id));
    assert_eq!(
        fx.store.pipeline(&fx.pipeline_id)?.status,
        PipelineStatus::Pending
    );
    Ok(())
}
