// src/engine/runner.rs

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::engine::RunnerOptions;
use crate::errors::{EngineError, ProcessorError};
use crate::pipeline::{Job, JobOutcome, Pipeline, blocked_jobs, ready_jobs, terminal_status};
use crate::processor::{NodeInputs, NodeProcessor, ProcessorRegistry};
use crate::store::JobStore;
use crate::types::{JobStatus, NodeId, PipelineStatus};

/// Result of one job execution, sent back from a worker.
#[derive(Debug)]
struct JobFinished {
    node_id: NodeId,
    outcome: JobOutcome,
}

/// Drives a pipeline to completion.
///
/// Several runners may work on the same pipeline at once: jobs are claimed
/// through [`JobStore::transition_job`], so each job executes at most once.
#[derive(Debug, Clone)]
pub struct Runner {
    store: Arc<dyn JobStore>,
    registry: Arc<ProcessorRegistry>,
    options: RunnerOptions,
}

impl Runner {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: Arc<ProcessorRegistry>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            store,
            registry,
            options,
        }
    }

    /// Run every job of the pipeline that can run, then settle its status.
    ///
    /// Returns the pipeline status when this runner stops. That is `Running`
    /// if another runner still holds in-flight jobs of the same pipeline.
    ///
    /// A pipeline without jobs is rejected with [`EngineError::NotGenerated`].
    /// On a store or worker error, jobs already in flight are still drained
    /// and recorded before the error is returned.
    pub async fn run(&self, pipeline_id: &str) -> Result<PipelineStatus, EngineError> {
        let initial = self.store.pipeline(pipeline_id)?;
        if initial.status.is_terminal() {
            info!(
                pipeline_id = %pipeline_id,
                status = %initial.status,
                "pipeline already finished; nothing to run"
            );
            return Ok(initial.status);
        }
        if initial.jobs.is_empty() {
            return Err(EngineError::NotGenerated(pipeline_id.to_string()));
        }
        if initial.status == PipelineStatus::Pending {
            self.store
                .set_pipeline_status(pipeline_id, PipelineStatus::Running)?;
        }

        info!(
            pipeline_id = %pipeline_id,
            jobs = initial.jobs.len(),
            workers = self.options.workers,
            "runner started"
        );

        let workers = self.options.workers.max(1);
        let mut in_flight: JoinSet<JobFinished> = JoinSet::new();
        let mut claimed: BTreeSet<NodeId> = BTreeSet::new();
        let mut unrecorded: Vec<JobFinished> = Vec::new();
        let mut failure: Option<EngineError> = None;

        // After the first error nothing new is dispatched, but every job
        // already claimed is still drained and recorded.
        loop {
            if failure.is_none() {
                if let Err(err) = self.dispatch(pipeline_id, workers, &mut in_flight, &mut claimed) {
                    warn!(
                        pipeline_id = %pipeline_id,
                        error = %err,
                        in_flight = in_flight.len(),
                        "dispatch failed; draining in-flight jobs"
                    );
                    failure = Some(err);
                }
            }

            match in_flight.join_next().await {
                Some(Ok(finished)) => match self.record(pipeline_id, &finished) {
                    Ok(()) => {
                        claimed.remove(&finished.node_id);
                    }
                    Err(err) => {
                        warn!(
                            pipeline_id = %pipeline_id,
                            node = %finished.node_id,
                            error = %err,
                            "could not record job outcome"
                        );
                        unrecorded.push(finished);
                        failure.get_or_insert(err);
                    }
                },
                Some(Err(err)) => {
                    warn!(pipeline_id = %pipeline_id, error = %err, "worker task lost");
                    failure.get_or_insert(err.into());
                }
                None => break,
            }
        }

        if let Some(err) = failure {
            self.release(pipeline_id, claimed, unrecorded, &err);
            return Err(err);
        }

        self.settle(pipeline_id)
    }

    /// Claim ready jobs until `workers` are in flight.
    fn dispatch(
        &self,
        pipeline_id: &str,
        workers: usize,
        in_flight: &mut JoinSet<JobFinished>,
        claimed: &mut BTreeSet<NodeId>,
    ) -> Result<(), EngineError> {
        let snapshot = self.store.pipeline(pipeline_id)?;

        if snapshot.status == PipelineStatus::Cancelled {
            debug!(
                pipeline_id = %pipeline_id,
                in_flight = in_flight.len(),
                "pipeline cancelled; draining in-flight jobs"
            );
            return Ok(());
        }

        for job in ready_jobs(&snapshot) {
            if in_flight.len() >= workers {
                break;
            }
            if !self
                .store
                .transition_job(pipeline_id, &job.node_id, job.status, JobStatus::Running)?
            {
                debug!(node = %job.node_id, "job claimed by another runner; skipping");
                continue;
            }
            claimed.insert(job.node_id.clone());

            info!(
                pipeline_id = %pipeline_id,
                node = %job.node_id,
                node_type = %job.node_type,
                priority = job.priority,
                "dispatching job"
            );

            let inputs = inputs_for(&snapshot, &job);
            let processor = self.registry.resolve(&job.node_type);
            in_flight.spawn_blocking(move || execute_job(job, processor, inputs));
        }
        Ok(())
    }

    fn record(&self, pipeline_id: &str, finished: &JobFinished) -> Result<(), EngineError> {
        match &finished.outcome {
            JobOutcome::Completed(_) => {
                info!(pipeline_id = %pipeline_id, node = %finished.node_id, "job completed");
            }
            JobOutcome::Failed(message) => {
                warn!(
                    pipeline_id = %pipeline_id,
                    node = %finished.node_id,
                    error = %message,
                    "job failed; dependents are blocked"
                );
            }
        }

        if !self
            .store
            .finish_job(pipeline_id, &finished.node_id, finished.outcome.clone())?
        {
            warn!(
                pipeline_id = %pipeline_id,
                node = %finished.node_id,
                "job was no longer running when its outcome arrived"
            );
        }
        Ok(())
    }

    /// Move every job this runner claimed out of `Running` before giving up.
    ///
    /// Outcomes that could not be stored are retried once. Claimed jobs with
    /// no outcome at all are failed, so a later run can settle the pipeline.
    fn release(
        &self,
        pipeline_id: &str,
        claimed: BTreeSet<NodeId>,
        unrecorded: Vec<JobFinished>,
        cause: &EngineError,
    ) {
        let lost: Vec<JobFinished> = claimed
            .iter()
            .filter(|node| !unrecorded.iter().any(|f| &f.node_id == *node))
            .map(|node| JobFinished {
                node_id: node.clone(),
                outcome: JobOutcome::Failed(format!("runner aborted: {cause}")),
            })
            .collect();

        for finished in unrecorded.into_iter().chain(lost) {
            if let Err(err) = self
                .store
                .finish_job(pipeline_id, &finished.node_id, finished.outcome)
            {
                warn!(
                    pipeline_id = %pipeline_id,
                    node = %finished.node_id,
                    error = %err,
                    "job left running after runner error"
                );
            }
        }
    }

    fn settle(&self, pipeline_id: &str) -> Result<PipelineStatus, EngineError> {
        let snapshot = self.store.pipeline(pipeline_id)?;
        if snapshot.status == PipelineStatus::Cancelled {
            info!(pipeline_id = %pipeline_id, "runner stopped: pipeline cancelled");
            return Ok(PipelineStatus::Cancelled);
        }

        match terminal_status(&snapshot) {
            Some(status) => {
                if status == PipelineStatus::Failed {
                    warn!(
                        pipeline_id = %pipeline_id,
                        blocked = ?blocked_jobs(&snapshot),
                        "pipeline cannot make progress; marking failed"
                    );
                }
                self.store.set_pipeline_status(pipeline_id, status)?;
                info!(pipeline_id = %pipeline_id, status = %status, "pipeline finished");
                Ok(status)
            }
            None => {
                debug!(
                    pipeline_id = %pipeline_id,
                    "other runners still hold jobs; leaving status untouched"
                );
                Ok(snapshot.status)
            }
        }
    }
}

/// Outputs of the job's direct dependencies plus the pipeline input.
fn inputs_for(pipeline: &Pipeline, job: &Job) -> NodeInputs {
    let upstream: BTreeMap<NodeId, serde_json::Value> = job
        .dependencies
        .iter()
        .filter_map(|dep| {
            pipeline
                .job(dep)
                .and_then(|j| j.output.clone())
                .map(|out| (dep.clone(), out))
        })
        .collect();

    NodeInputs {
        node_id: job.node_id.clone(),
        pipeline_input: pipeline.input_data.clone(),
        upstream,
    }
}

fn execute_job(
    job: Job,
    processor: Result<Arc<dyn NodeProcessor>, ProcessorError>,
    inputs: NodeInputs,
) -> JobFinished {
    let result = processor.and_then(|p| {
        catch_unwind(AssertUnwindSafe(|| p.execute(&inputs, &job.config))).unwrap_or_else(|_| {
            Err(ProcessorError::Execution {
                node: job.node_id.clone(),
                message: "processor panicked".to_string(),
            })
        })
    });

    let outcome = match result {
        Ok(output) => JobOutcome::Completed(output),
        Err(e) => JobOutcome::Failed(e.to_string()),
    };

    JobFinished {
        node_id: job.node_id,
        outcome,
    }
}
