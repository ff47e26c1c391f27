// tests/property/scheduler.rs

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use pipedag::dag::{build_dependency_graph, calculate_execution_order};
use pipedag::errors::GraphErrorKind;
use pipedag::types::JobStatus;
use pipedag::workflow::{Workflow, WorkflowEdge};
use pipedag_test_utils::builders::WorkflowBuilder;
use pipedag_test_utils::fixture::PipelineFixture;

// Acyclic by construction: node i may only depend on nodes 0..i.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1..=max_nodes).prop_flat_map(|n| {
        let edges = proptest::collection::vec((any::<usize>(), any::<usize>()), 0..(n * 2));
        edges.prop_map(move |raw| {
            let mut seen = HashSet::new();
            let cleaned: Vec<(usize, usize)> = raw
                .into_iter()
                .filter_map(|(a, b)| {
                    if n < 2 {
                        return None;
                    }
                    let target = 1 + b % (n - 1);
                    let source = a % target;
                    seen.insert((source, target)).then_some((source, target))
                })
                .collect();
            (n, cleaned)
        })
    })
}

fn name(i: usize) -> String {
    format!("n{i:02}")
}

fn to_edges(edges: &[(usize, usize)]) -> Vec<WorkflowEdge> {
    edges
        .iter()
        .map(|(s, t)| WorkflowEdge::new(name(*s), name(*t)))
        .collect()
}

fn to_workflow(n: usize, edges: &[(usize, usize)], priorities: &[i64]) -> Workflow {
    let mut builder = WorkflowBuilder::new("prop");
    for i in 0..n {
        builder = match priorities.get(i) {
            Some(p) if p % 3 == 0 => builder.node_with_priority(&name(i), "t", *p),
            _ => builder.node(&name(i), "t"),
        };
    }
    for (s, t) in edges {
        builder = builder.edge(&name(*s), &name(*t));
    }
    builder.build()
}

proptest! {
    #[test]
    fn ranks_respect_edges((n, edges) in dag_strategy(12)) {
        let ids: Vec<String> = (0..n).map(name).collect();
        let graph = build_dependency_graph(ids.iter().map(String::as_str), &to_edges(&edges)).unwrap();
        let order = calculate_execution_order(&graph).unwrap();

        prop_assert_eq!(order.len(), n);
        for (s, t) in &edges {
            prop_assert!(order.rank_of(&name(*s)).unwrap() < order.rank_of(&name(*t)).unwrap());
        }
    }

    #[test]
    fn back_edge_creates_cycle((n, edges) in dag_strategy(12), pick in any::<usize>()) {
        prop_assume!(!edges.is_empty());
        let (s, t) = edges[pick % edges.len()];

        let mut with_back = to_edges(&edges);
        with_back.push(WorkflowEdge::new(name(t), name(s)));

        let ids: Vec<String> = (0..n).map(name).collect();
        let graph = build_dependency_graph(ids.iter().map(String::as_str), &with_back).unwrap();
        let err = calculate_execution_order(&graph).unwrap_err();
        prop_assert_eq!(err.kind(), GraphErrorKind::CycleDetected);
    }

    #[test]
    fn graph_ignores_edge_order((n, edges) in dag_strategy(12)) {
        let ids: Vec<String> = (0..n).map(name).collect();
        let forward = to_edges(&edges);
        let mut backward = forward.clone();
        backward.reverse();

        let g1 = build_dependency_graph(ids.iter().map(String::as_str), &forward).unwrap();
        let g2 = build_dependency_graph(ids.iter().rev().map(String::as_str), &backward).unwrap();
        prop_assert_eq!(g1, g2);
    }

    // Drive a pipeline to the end, failing some jobs along the way:
    // - ready output is always priority-sorted
    // - nothing downstream of a failure ever becomes ready
    #[test]
    fn readiness_simulation(
        (n, edges) in dag_strategy(10),
        priorities in proptest::collection::vec(-20i64..20, 10),
        failing in proptest::collection::btree_set(0..10usize, 0..3),
    ) {
        let fx = PipelineFixture::generated(to_workflow(n, &edges, &priorities));
        let failing: BTreeSet<String> = failing.into_iter().filter(|i| *i < n).map(name).collect();

        let mut doomed: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut steps = 0;

        loop {
            steps += 1;
            prop_assert!(steps <= n + 1, "simulation did not terminate");

            let ready = fx.tracker.get_ready_jobs(&fx.pipeline_id).unwrap();
            prop_assert!(ready.windows(2).all(|w| w[0].priority <= w[1].priority));

            for job in &ready {
                prop_assert!(!doomed.contains(&job.node_id), "{} ready after upstream failure", job.node_id);
            }

            let Some(next) = ready.first() else { break };
            if failing.contains(&next.node_id) {
                fx.fail(&next.node_id);
                failed.insert(next.node_id.clone());
                doomed.insert(next.node_id.clone());
            } else {
                fx.complete(&next.node_id);
            }

            // propagate doom to everything downstream
            let jobs = fx.store_jobs();
            let mut changed = true;
            while changed {
                changed = false;
                for job in &jobs {
                    if !doomed.contains(&job.node_id) && job.dependencies.iter().any(|d| doomed.contains(d)) {
                        doomed.insert(job.node_id.clone());
                        changed = true;
                    }
                }
            }
        }

        let jobs = fx.store_jobs();
        for job in &jobs {
            if failed.contains(&job.node_id) {
                prop_assert_eq!(job.status, JobStatus::Failed);
            } else if doomed.contains(&job.node_id) {
                prop_assert_eq!(job.status, JobStatus::Pending);
            } else {
                prop_assert_eq!(job.status, JobStatus::Completed);
            }
        }
        if failing.is_empty() {
            prop_assert!(jobs.iter().all(|j| j.status == JobStatus::Completed));
        }
    }
}

trait StoreJobs {
    fn store_jobs(&self) -> Vec<pipedag::pipeline::Job>;
}

impl StoreJobs for PipelineFixture {
    fn store_jobs(&self) -> Vec<pipedag::pipeline::Job> {
        use pipedag::store::JobStore;
        self.store.jobs(&self.pipeline_id).unwrap()
    }
}
