// src/types.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a workflow node, unique within its workflow.
pub type NodeId = String;

/// Identifier of a pipeline (one execution instance of a workflow).
pub type PipelineId = String;

/// Identifier of a job, unique across pipelines: `"{pipeline_id}/{node_id}"`.
pub type JobId = String;

/// Lifecycle of a single job.
///
/// The scheduler only reads this; transitions are applied by the runner
/// through the job store's compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Not yet started: eligible for readiness checks.
    pub fn is_waiting(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Ready)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Ready => "ready",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a pipeline as a whole.
///
/// - `Failed` also covers the "blocked" case: nothing is ready, nothing is
///   running, and not every job completed.
/// - `Cancelled` is set from outside; the runner stops dispatching when it
///   sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl PipelineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineStatus::Completed | PipelineStatus::Failed | PipelineStatus::Cancelled
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
