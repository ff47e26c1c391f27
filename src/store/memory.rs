// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::errors::StoreError;
use crate::pipeline::{Job, JobOutcome, Pipeline};
use crate::store::{JobStore, WorkflowProvider};
use crate::types::{JobStatus, PipelineStatus};
use crate::workflow::Workflow;

#[derive(Debug, Default)]
struct MemoryState {
    workflows: HashMap<String, Workflow>,
    pipelines: BTreeMap<String, Pipeline>,
    pipeline_counter: u64,
}

/// Mutex-guarded store for workflows, pipelines and jobs.
///
/// Every operation takes the lock once, so compare-and-set transitions are
/// atomic with respect to each other.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a workflow definition.
    pub fn add_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        debug!(workflow = %workflow.id, "registering workflow");
        state.workflows.insert(workflow.id.clone(), workflow);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn job_mut<'a>(
    state: &'a mut MemoryState,
    pipeline_id: &str,
    node_id: &str,
) -> Result<&'a mut Job, StoreError> {
    let pipeline = state
        .pipelines
        .get_mut(pipeline_id)
        .ok_or_else(|| StoreError::PipelineNotFound(pipeline_id.to_string()))?;

    pipeline
        .jobs
        .iter_mut()
        .find(|j| j.node_id == node_id)
        .ok_or_else(|| StoreError::JobNotFound {
            pipeline_id: pipeline_id.to_string(),
            node_id: node_id.to_string(),
        })
}

impl WorkflowProvider for InMemoryStore {
    fn workflow(&self, workflow_id: &str) -> Result<Workflow, StoreError> {
        self.lock()?
            .workflows
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| StoreError::WorkflowNotFound(workflow_id.to_string()))
    }
}

impl JobStore for InMemoryStore {
    fn create_pipeline(
        &self,
        workflow_id: &str,
        input_data: serde_json::Value,
    ) -> Result<Pipeline, StoreError> {
        let mut state = self.lock()?;
        if !state.workflows.contains_key(workflow_id) {
            return Err(StoreError::WorkflowNotFound(workflow_id.to_string()));
        }

        state.pipeline_counter += 1;
        let pipeline = Pipeline {
            id: format!("pipeline-{}", state.pipeline_counter),
            workflow_id: workflow_id.to_string(),
            status: PipelineStatus::Pending,
            jobs: Vec::new(),
            input_data,
        };

        debug!(pipeline_id = %pipeline.id, workflow = %workflow_id, "created pipeline");
        state.pipelines.insert(pipeline.id.clone(), pipeline.clone());
        Ok(pipeline)
    }

    fn pipeline(&self, pipeline_id: &str) -> Result<Pipeline, StoreError> {
        self.lock()?
            .pipelines
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| StoreError::PipelineNotFound(pipeline_id.to_string()))
    }

    fn insert_jobs(&self, pipeline_id: &str, mut jobs: Vec<Job>) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let pipeline = state
            .pipelines
            .get_mut(pipeline_id)
            .ok_or_else(|| StoreError::PipelineNotFound(pipeline_id.to_string()))?;

        if !pipeline.jobs.is_empty() {
            return Err(StoreError::JobsAlreadyExist {
                pipeline_id: pipeline_id.to_string(),
                existing: pipeline.jobs.len(),
            });
        }

        jobs.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.node_id.cmp(&b.node_id)));
        pipeline.jobs = jobs;
        Ok(())
    }

    fn transition_job(
        &self,
        pipeline_id: &str,
        node_id: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let job = job_mut(&mut state, pipeline_id, node_id)?;

        if job.status != from {
            return Ok(false);
        }
        job.status = to;
        Ok(true)
    }

    fn finish_job(
        &self,
        pipeline_id: &str,
        node_id: &str,
        outcome: JobOutcome,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let job = job_mut(&mut state, pipeline_id, node_id)?;

        if job.status != JobStatus::Running {
            return Ok(false);
        }

        job.status = outcome.status();
        match outcome {
            JobOutcome::Completed(output) => job.output = Some(output),
            JobOutcome::Failed(message) => job.error = Some(message),
        }
        Ok(true)
    }

    fn set_pipeline_status(
        &self,
        pipeline_id: &str,
        status: PipelineStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let pipeline = state
            .pipelines
            .get_mut(pipeline_id)
            .ok_or_else(|| StoreError::PipelineNotFound(pipeline_id.to_string()))?;
        pipeline.status = status;
        Ok(())
    }
}
