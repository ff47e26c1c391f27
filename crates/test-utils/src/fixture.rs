#![allow(dead_code)]

use std::sync::Arc;

use pipedag::errors::GenerationError;
use pipedag::pipeline::{GenerationOptions, Job, JobGenerator, JobOutcome, ReadinessTracker};
use pipedag::store::{InMemoryStore, JobStore};
use pipedag::types::JobStatus;
use pipedag::workflow::Workflow;

/// An `InMemoryStore` holding one workflow and one pipeline for it.
///
/// Jobs are not generated until [`PipelineFixture::generate`] is called.
pub struct PipelineFixture {
    pub store: Arc<InMemoryStore>,
    pub pipeline_id: String,
    pub generator: JobGenerator,
    pub tracker: ReadinessTracker,
}

impl PipelineFixture {
    pub fn new(workflow: Workflow) -> Self {
        Self::with_input(workflow, serde_json::Value::Null)
    }

    pub fn with_input(workflow: Workflow, input: serde_json::Value) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let workflow_id = workflow.id.clone();
        store.add_workflow(workflow).expect("add workflow");
        let pipeline = store
            .create_pipeline(&workflow_id, input)
            .expect("create pipeline");

        let generator =
            JobGenerator::new(store.clone(), store.clone(), GenerationOptions::default());
        let tracker = ReadinessTracker::new(store.clone());

        Self {
            store,
            pipeline_id: pipeline.id,
            generator,
            tracker,
        }
    }

    /// Fixture with jobs already generated.
    pub fn generated(workflow: Workflow) -> Self {
        let fixture = Self::new(workflow);
        fixture.generate().expect("generate jobs");
        fixture
    }

    pub fn generate(&self) -> Result<Vec<Job>, GenerationError> {
        self.generator.generate_jobs(&self.pipeline_id)
    }

    pub fn ready_ids(&self) -> Vec<String> {
        self.tracker
            .get_ready_jobs(&self.pipeline_id)
            .expect("ready jobs")
            .into_iter()
            .map(|j| j.node_id)
            .collect()
    }

    pub fn job(&self, node_id: &str) -> Job {
        self.store
            .pipeline(&self.pipeline_id)
            .expect("pipeline")
            .job(node_id)
            .cloned()
            .expect("job exists")
    }

    /// Claim a waiting job and report it completed.
    pub fn complete(&self, node_id: &str) {
        self.finish(node_id, JobOutcome::Completed(serde_json::json!(node_id)));
    }

    /// Claim a waiting job and report it failed.
    pub fn fail(&self, node_id: &str) {
        self.finish(node_id, JobOutcome::Failed(format!("{node_id} exploded")));
    }

    fn finish(&self, node_id: &str, outcome: JobOutcome) {
        let current = self.job(node_id).status;
        assert!(
            self.store
                .transition_job(&self.pipeline_id, node_id, current, JobStatus::Running)
                .expect("transition"),
            "could not claim {node_id}"
        );
        assert!(
            self.store
                .finish_job(&self.pipeline_id, node_id, outcome)
                .expect("finish"),
            "could not finish {node_id}"
        );
    }
}
