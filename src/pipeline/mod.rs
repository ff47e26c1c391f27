// src/pipeline/mod.rs

//! Pipelines and their jobs.
//!
//! - [`job`] defines the [`Job`] record.
//! - [`materializer`] generates one job per workflow node.
//! - [`readiness`] computes which pending jobs may run now.

pub mod job;
pub mod materializer;
pub mod readiness;

use serde::{Deserialize, Serialize};

pub use job::{Job, JobOutcome};
pub use materializer::{GenerationOptions, JobGenerator, default_priority};
pub use readiness::{ReadinessTracker, blocked_jobs, ready_jobs, terminal_status};

use crate::types::{PipelineId, PipelineStatus};

/// One execution instance of a workflow. Owns its jobs exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub workflow_id: String,
    pub status: PipelineStatus,
    /// Ordered by rank, then node id.
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub input_data: serde_json::Value,
}

impl Pipeline {
    pub fn job(&self, node_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.node_id == node_id)
    }

    /// Jobs no other job depends on.
    pub fn sink_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|job| {
            !self
                .jobs
                .iter()
                .any(|other| other.dependencies.contains(&job.node_id))
        })
    }
}
