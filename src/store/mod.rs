//! Workflow persistence.
//!
//! The editor core never does I/O itself. It talks to a [`WorkflowStore`],
//! which is the save/load boundary towards whatever backend keeps the
//! workflows:
//!
//! - [`fs`] – one JSON file per workflow in a directory
//! - [`memory`] – in-process map, for tests and embedding

pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use anyhow::{Result, bail};

use crate::model::Graph;

/// Save/load API for workflow graphs, keyed by workflow id.
pub trait WorkflowStore {
    /// Load the graph stored under `id`.
    fn load_workflow(&mut self, id: &str) -> Result<Graph>;
    /// Store `graph` under `id`, replacing any previous version.
    fn save_workflow(&mut self, id: &str, graph: &Graph) -> Result<()>;
    /// Ids of all stored workflows, sorted.
    fn list_workflows(&mut self) -> Result<Vec<String>>;
}

/// Reject ids that cannot be used as a file stem.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("Workflow id must not be empty");
    }
    if id.starts_with('.') || id.chars().any(|c| matches!(c, '/' | '\\' | ':') || c.is_control()) {
        bail!("Invalid workflow id '{}'", id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids() {
        assert!(validate_id("support-bot_2").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("../etc").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id(".hidden").is_err());
    }
}
