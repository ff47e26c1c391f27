// src/store/mod.rs

//! Storage collaborators.
//!
//! The scheduling core never owns storage; it is handed a
//! [`WorkflowProvider`] (read-only workflow definitions) and a [`JobStore`]
//! (pipelines, jobs, atomic status transitions) at construction time.
//! [`InMemoryStore`] implements both and is what the CLI and tests use.

use std::fmt::Debug;

use crate::errors::StoreError;
use crate::pipeline::{Job, JobOutcome, Pipeline};
use crate::types::{JobStatus, PipelineStatus};
use crate::workflow::Workflow;

pub mod memory;

pub use memory::InMemoryStore;

/// Supplies workflow definitions by id.
pub trait WorkflowProvider: Send + Sync + Debug {
    fn workflow(&self, workflow_id: &str) -> Result<Workflow, StoreError>;
}

/// Persists pipelines and jobs.
///
/// Implementations must apply [`JobStore::transition_job`] and
/// [`JobStore::finish_job`] atomically: of two callers racing to move the
/// same job out of the same status, exactly one observes `true`.
pub trait JobStore: Send + Sync + Debug {
    /// Create an empty pipeline for a workflow run.
    fn create_pipeline(
        &self,
        workflow_id: &str,
        input_data: serde_json::Value,
    ) -> Result<Pipeline, StoreError>;

    /// Snapshot of a pipeline and all of its jobs.
    fn pipeline(&self, pipeline_id: &str) -> Result<Pipeline, StoreError>;

    /// Store generated jobs. Fails with [`StoreError::JobsAlreadyExist`] if
    /// the pipeline already has any.
    fn insert_jobs(&self, pipeline_id: &str, jobs: Vec<Job>) -> Result<(), StoreError>;

    fn jobs(&self, pipeline_id: &str) -> Result<Vec<Job>, StoreError> {
        Ok(self.pipeline(pipeline_id)?.jobs)
    }

    /// Compare-and-set on a job's status. Returns `false` if the job was not
    /// in `from`.
    fn transition_job(
        &self,
        pipeline_id: &str,
        node_id: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, StoreError>;

    /// Move a `Running` job to its final status, recording output or error.
    /// Returns `false` if the job was not running.
    fn finish_job(
        &self,
        pipeline_id: &str,
        node_id: &str,
        outcome: JobOutcome,
    ) -> Result<bool, StoreError>;

    fn set_pipeline_status(
        &self,
        pipeline_id: &str,
        status: PipelineStatus,
    ) -> Result<(), StoreError>;
}
