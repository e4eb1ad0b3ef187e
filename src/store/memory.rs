//! In-memory workflow store.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};

use super::{WorkflowStore, validate_id};
use crate::model::Graph;

/// Keeps graphs in a map. Saved graphs are cloned, so later edits to the
/// caller's copy do not leak into the store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    graphs: BTreeMap<String, Graph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

impl WorkflowStore for MemoryStore {
    fn load_workflow(&mut self, id: &str) -> Result<Graph> {
        self.graphs
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("Workflow '{}' not found", id))
    }

    fn save_workflow(&mut self, id: &str, graph: &Graph) -> Result<()> {
        validate_id(id)?;
        self.graphs.insert(id.to_string(), graph.clone());
        Ok(())
    }

    fn list_workflows(&mut self) -> Result<Vec<String>> {
        Ok(self.graphs.keys().cloned().collect())
    }
}
