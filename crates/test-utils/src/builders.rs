#![allow(dead_code)]

use pipedag::workflow::{ConfigValue, Workflow, WorkflowEdge, WorkflowNode};

/// Builder for `Workflow` to simplify test setup.
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            workflow: Workflow::new(id),
        }
    }

    /// Add a node of the given type.
    pub fn node(self, id: &str, node_type: &str) -> Self {
        self.with_node(WorkflowNode::new(id, node_type))
    }

    pub fn node_with_priority(self, id: &str, node_type: &str, priority: i64) -> Self {
        self.with_node(WorkflowNode::new(id, node_type).with_priority(priority))
    }

    pub fn node_with_config(self, id: &str, node_type: &str, key: &str, value: ConfigValue) -> Self {
        self.with_node(WorkflowNode::new(id, node_type).with_config(key, value))
    }

    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.workflow.nodes.push(node);
        self
    }

    /// `target` depends on `source`.
    pub fn edge(mut self, source: &str, target: &str) -> Self {
        self.workflow.edges.push(WorkflowEdge::new(source, target));
        self
    }

    /// Consecutive edges `ids[0] -> ids[1] -> ...`.
    pub fn chain(mut self, ids: &[&str]) -> Self {
        for pair in ids.windows(2) {
            self.workflow.edges.push(WorkflowEdge::new(pair[0], pair[1]));
        }
        self
    }

    /// The workflow as written, without validation.
    pub fn build(self) -> Workflow {
        self.workflow
    }

    pub fn build_validated(self) -> Workflow {
        self.workflow
            .validate()
            .expect("Failed to build valid workflow from builder");
        self.workflow
    }
}

/// `input1 -> process1 -> output1`
pub fn linear_workflow() -> Workflow {
    WorkflowBuilder::new("linear")
        .node("input1", "input")
        .node("process1", "merge")
        .node("output1", "output")
        .chain(&["input1", "process1", "output1"])
        .build_validated()
}

/// `a -> {b, c} -> d`
pub fn diamond_workflow() -> Workflow {
    WorkflowBuilder::new("diamond")
        .node("a", "input")
        .node("b", "merge")
        .node("c", "merge")
        .node("d", "output")
        .edge("a", "b")
        .edge("a", "c")
        .edge("b", "d")
        .edge("c", "d")
        .build_validated()
}
