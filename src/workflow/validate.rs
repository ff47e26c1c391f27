// src/workflow/validate.rs

use std::collections::HashSet;

use crate::dag::{build_dependency_graph, calculate_execution_order};
use crate::errors::WorkflowError;
use crate::workflow::model::Workflow;

impl Workflow {
    /// Boundary validation for a workflow definition.
    ///
    /// Checks node metadata first, then runs the graph builder and the
    /// sequencer so that unknown edge endpoints, self-edges and cycles are
    /// rejected before a pipeline is ever created.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        ensure_has_id(self)?;
        validate_nodes(self)?;

        let graph = build_dependency_graph(self.node_ids(), &self.edges)?;
        calculate_execution_order(&graph)?;
        Ok(())
    }
}

fn ensure_has_id(wf: &Workflow) -> Result<(), WorkflowError> {
    if wf.id.trim().is_empty() {
        return Err(WorkflowError::Invalid(
            "workflow id must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_nodes(wf: &Workflow) -> Result<(), WorkflowError> {
    let mut seen = HashSet::new();

    for node in &wf.nodes {
        if node.id.trim().is_empty() {
            return Err(WorkflowError::Invalid(format!(
                "workflow '{}' contains a node with an empty id",
                wf.id
            )));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(WorkflowError::Invalid(format!(
                "node id '{}' is declared more than once",
                node.id
            )));
        }
        if node.data.node_type.trim().is_empty() {
            return Err(WorkflowError::Invalid(format!(
                "node '{}' has an empty `type`",
                node.id
            )));
        }
        for (key, value) in &node.data.config {
            if !value.is_finite() {
                return Err(WorkflowError::Invalid(format!(
                    "node '{}' config key '{}' contains a non-finite number",
                    node.id, key
                )));
            }
        }
    }

    Ok(())
}
