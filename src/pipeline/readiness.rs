// src/pipeline/readiness.rs

//! Readiness: which waiting jobs can run right now.
//!
//! Everything here reads a pipeline snapshot and never mutates it. Runners
//! re-query after every status transition to pick up newly unblocked jobs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::StoreError;
use crate::pipeline::{Job, Pipeline};
use crate::store::JobStore;
use crate::types::{JobStatus, PipelineStatus};

/// Read-only index of job statuses by node id.
struct StatusView<'a> {
    statuses: HashMap<&'a str, JobStatus>,
}

impl<'a> StatusView<'a> {
    fn new(jobs: &'a [Job]) -> Self {
        Self {
            statuses: jobs
                .iter()
                .map(|j| (j.node_id.as_str(), j.status))
                .collect(),
        }
    }

    /// Every dependency has a job in this pipeline and it completed.
    ///
    /// A dependency with no job at all never counts as satisfied.
    fn deps_satisfied(&self, job: &Job) -> bool {
        job.dependencies
            .iter()
            .all(|dep| self.statuses.get(dep.as_str()) == Some(&JobStatus::Completed))
    }

    fn is_ready(&self, job: &Job) -> bool {
        job.status.is_waiting() && self.deps_satisfied(job)
    }
}

/// Waiting jobs whose dependencies have all completed.
///
/// Sorted by priority, then rank, then node id.
pub fn ready_jobs(pipeline: &Pipeline) -> Vec<Job> {
    let view = StatusView::new(&pipeline.jobs);

    let mut ready: Vec<Job> = pipeline
        .jobs
        .iter()
        .filter(|job| view.is_ready(job))
        .cloned()
        .collect();
    ready.sort_by(|a, b| a.dispatch_key().cmp(&b.dispatch_key()));

    trace!(
        pipeline_id = %pipeline.id,
        ready = ready.len(),
        "computed ready jobs"
    );
    ready
}

/// Waiting jobs that can never become ready because a dependency failed,
/// directly or further upstream. Node ids, ascending.
pub fn blocked_jobs(pipeline: &Pipeline) -> Vec<String> {
    let mut by_rank: Vec<&Job> = pipeline.jobs.iter().collect();
    by_rank.sort_by_key(|j| j.rank);

    // Dependencies always have a lower rank, so one pass in rank order sees
    // every upstream verdict before it is needed.
    let mut doomed: HashSet<&str> = HashSet::new();
    for job in by_rank {
        let hit = job.status == JobStatus::Failed
            || (job.status.is_waiting()
                && job
                    .dependencies
                    .iter()
                    .any(|dep| doomed.contains(dep.as_str())));
        if hit {
            doomed.insert(job.node_id.as_str());
        }
    }

    let mut blocked: Vec<String> = pipeline
        .jobs
        .iter()
        .filter(|j| j.status.is_waiting() && doomed.contains(j.node_id.as_str()))
        .map(|j| j.node_id.clone())
        .collect();
    blocked.sort();
    blocked
}

/// Final status the pipeline should be settled into, if it is done.
///
/// - every job completed: `Completed`
/// - nothing running, nothing ready, some job not completed: `Failed`
/// - otherwise `None`, progress is still possible
///
/// A pipeline with no jobs is vacuously `Completed`; the runner refuses to
/// run one whose jobs were never generated.
pub fn terminal_status(pipeline: &Pipeline) -> Option<PipelineStatus> {
    if pipeline
        .jobs
        .iter()
        .all(|j| j.status == JobStatus::Completed)
    {
        return Some(PipelineStatus::Completed);
    }

    if pipeline.jobs.iter().any(|j| j.status == JobStatus::Running) {
        return None;
    }

    let view = StatusView::new(&pipeline.jobs);
    if pipeline.jobs.iter().any(|j| view.is_ready(j)) {
        return None;
    }

    Some(PipelineStatus::Failed)
}

/// Store-backed entry point for runners.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    store: Arc<dyn JobStore>,
}

impl ReadinessTracker {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Ready jobs of the pipeline's current snapshot.
    pub fn get_ready_jobs(&self, pipeline_id: &str) -> Result<Vec<Job>, StoreError> {
        let pipeline = self.store.pipeline(pipeline_id)?;
        let ready = ready_jobs(&pipeline);
        debug!(
            pipeline_id = %pipeline_id,
            ready = ?ready.iter().map(|j| j.node_id.as_str()).collect::<Vec<_>>(),
            "ready jobs"
        );
        Ok(ready)
    }

    /// See [`blocked_jobs`].
    pub fn get_blocked_jobs(&self, pipeline_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(blocked_jobs(&self.store.pipeline(pipeline_id)?))
    }
}
