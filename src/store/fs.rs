//! Directory-backed workflow store: `<dir>/<id>.json` per workflow.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use super::{WorkflowStore, validate_id};
use crate::model::{Graph, WorkflowDoc};

/// Stores each workflow as a pretty-printed [`WorkflowDoc`].
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: Utf8PathBuf,
}

impl FsStore {
    /// Use `dir` as the store root. The directory is created on first save.
    pub fn new(dir: impl AsRef<Utf8Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// File holding workflow `id`.
    pub fn path_for(&self, id: &str) -> Result<Utf8PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.json")))
    }

    /// Read the whole document, including its display name.
    pub fn load_doc(&self, id: &str) -> Result<WorkflowDoc> {
        let path = self.path_for(id)?;
        let doc = WorkflowDoc::load_from_json(&path).with_context(|| format!("Failed to load {}", path))?;
        info!(%path, blocks = doc.graph.blocks.len(), connections = doc.graph.connections.len(), "loaded workflow");
        Ok(doc)
    }

    /// Write a whole document. The file is replaced atomically.
    pub fn save_doc(&self, doc: &WorkflowDoc) -> Result<()> {
        let path = self.path_for(&doc.id)?;
        std::fs::create_dir_all(&self.dir).with_context(|| format!("Create dir {}", self.dir))?;
        let tmp = path.with_extension("json.tmp");
        doc.save_to_json(&tmp).with_context(|| format!("Failed to write {}", tmp))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path))?;
        info!(%path, "saved workflow");
        Ok(())
    }
}

impl WorkflowStore for FsStore {
    fn load_workflow(&mut self, id: &str) -> Result<Graph> {
        Ok(self.load_doc(id)?.graph)
    }

    fn save_workflow(&mut self, id: &str, graph: &Graph) -> Result<()> {
        // Keep the display name of an existing document.
        let name = self
            .path_for(id)
            .ok()
            .filter(|p| p.is_file())
            .and_then(|_| self.load_doc(id).ok())
            .map(|d| d.name)
            .unwrap_or_default();
        self.save_doc(&WorkflowDoc {
            id: id.to_string(),
            name,
            graph: graph.clone(),
        })
    }

    fn list_workflows(&mut self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir).with_context(|| format!("Read dir {}", self.dir))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if path.extension() != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().filter(|s| validate_id(s).is_ok()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
