//! Editor configuration.
//!
//! Read from a JSON file passed with `--config`. Every field is optional;
//! missing fields take the defaults below.
//!
//! ```json
//! {
//!   "snapToGrid": true,
//!   "gridSize": 20,
//!   "noticeDurationMs": 2500,
//!   "colors": { "end": { "accent": "#ff0000" } },
//!   "zoomLimits": [0.5, 2.0]
//! }
//! ```

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::editor::palette::{BlockColors, BlockStyleOverride};
use crate::model::BlockType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Round the reconciled position of a dragged block to the grid.
    pub snap_to_grid: bool,
    /// Grid spacing in canvas units.
    pub grid_size: f32,
    /// How long a transient notice stays visible.
    pub notice_duration_ms: u64,
    /// Per-type colour overrides merged over the palette defaults.
    pub colors: HashMap<BlockType, BlockStyleOverride>,
    /// Minimum and maximum zoom factor.
    pub zoom_limits: (f32, f32),
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_to_grid: true,
            grid_size: 10.0,
            notice_duration_ms: 3000,
            colors: HashMap::new(),
            zoom_limits: (0.25, 4.0),
        }
    }
}

impl EditorConfig {
    /// Load and validate a config file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        let config: EditorConfig =
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path))?;
        config.validate().with_context(|| format!("Invalid config {}", path))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Utf8Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grid_size > 0.0) {
            bail!("gridSize must be positive, got {}", self.grid_size);
        }
        let (lo, hi) = self.zoom_limits;
        if !(lo > 0.0 && lo <= hi) {
            bail!("zoomLimits must satisfy 0 < min <= max, got [{lo}, {hi}]");
        }
        Ok(())
    }

    /// The palette colours with this config's overrides applied.
    pub fn block_colors(&self) -> BlockColors {
        BlockColors::with_overrides(&self.colors)
    }

    pub fn notice_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.notice_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    #[test]
    fn partial_file_keeps_defaults() {
        let c: EditorConfig =
            serde_json::from_str(r#"{"gridSize": 20, "colors": {"userResponse": {"border": "black"}}}"#).unwrap();
        assert_eq!(c.grid_size, 20.0);
        assert!(c.snap_to_grid);
        assert_eq!(c.notice_duration_ms, 3000);
        assert_eq!(c.block_colors().style(BlockType::UserResponse).border, Rgb(0, 0, 0));
    }

    #[test]
    fn validation() {
        let mut c = EditorConfig::default();
        assert!(c.validate().is_ok());
        c.grid_size = 0.0;
        assert!(c.validate().is_err());
        c.grid_size = 5.0;
        c.zoom_limits = (2.0, 1.0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("cfg.json")).unwrap();
        std::fs::write(&path, r#"{"snapToGrid": false, "zoomLimits": [0.5, 2.0]}"#).unwrap();
        let c = EditorConfig::load(&path).unwrap();
        assert!(!c.snap_to_grid);
        assert_eq!(c.zoom_limits, (0.5, 2.0));

        std::fs::write(&path, r#"{"gridSize": -1}"#).unwrap();
        assert!(EditorConfig::load(&path).is_err());

        std::fs::write(&path, r##"{"colors": {"end": {"accent": "#aéxyz"}}}"##).unwrap();
        assert!(EditorConfig::load(&path).is_err());
        assert!(EditorConfig::load_or_default(None).is_ok());
    }
}
