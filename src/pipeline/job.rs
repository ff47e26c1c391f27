// src/pipeline/job.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, JobStatus, NodeId, PipelineId};
use crate::workflow::NodeConfig;

/// One schedulable unit: a workflow node inside one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub pipeline_id: PipelineId,
    pub node_id: NodeId,
    pub node_type: String,
    pub status: JobStatus,
    /// Lower runs first.
    pub priority: i64,
    /// Topological rank of the node.
    pub rank: u32,
    /// Node ids this job waits on, within the same pipeline.
    pub dependencies: BTreeSet<NodeId>,
    /// Snapshot of the node's config at generation time.
    #[serde(default)]
    pub config: NodeConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn job_id(pipeline_id: &str, node_id: &str) -> JobId {
        format!("{pipeline_id}/{node_id}")
    }

    /// Key used to order jobs for dispatch: priority, then rank, then node id.
    pub fn dispatch_key(&self) -> (i64, u32, &str) {
        (self.priority, self.rank, self.node_id.as_str())
    }
}

/// How a running job ended, as reported by whoever executed it.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(serde_json::Value),
    Failed(String),
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Failed(_) => JobStatus::Failed,
        }
    }
}
