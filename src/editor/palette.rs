//! Insertable block catalog and per-type colours.
//!
//! The palette lists every block kind a user can drop onto the canvas, with
//! the label, message and options a fresh block starts with. [`BlockColors`]
//! is the `blockColors` table handed to each block view; the defaults can be
//! overridden per type from [`crate::config::EditorConfig`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use chatflow::editor::palette::{get_palette, BlockColors};
//!
//! let entry = get_palette().iter().find(|e| e.matches_query("option")).unwrap();
//! let block = entry.create(Position::new(40.0, 80.0));
//! let colors = BlockColors::default();
//! let style = colors.style(block.block_type);
//! ```

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::model::{Block, BlockType, Position};

/// A single entry in the block palette.
#[derive(Debug, Clone)]
pub struct PaletteEntry {
    pub block_type: BlockType,
    /// Human-readable name shown on the palette button.
    pub display_name: &'static str,
    /// Brief description shown as hover text.
    pub description: &'static str,
    default_message: &'static str,
    default_options: &'static [&'static str],
}

impl PaletteEntry {
    /// Case-insensitive substring match on type, display name or description.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        self.block_type.as_str().to_lowercase().contains(&q)
            || self.display_name.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
    }

    /// A new block of this kind with a fresh id.
    pub fn create(&self, position: Position) -> Block {
        let mut block = Block::new(self.block_type, self.display_name, position);
        block.message = self.default_message.to_string();
        block.options = self.default_options.iter().map(|s| s.to_string()).collect();
        block
    }
}

static PALETTE: Lazy<Vec<PaletteEntry>> = Lazy::new(build_palette);

/// Get the full palette, in display order.
pub fn get_palette() -> &'static [PaletteEntry] {
    &PALETTE
}

/// Palette entry for a block type.
pub fn palette_entry(block_type: BlockType) -> Option<&'static PaletteEntry> {
    PALETTE.iter().find(|e| e.block_type == block_type)
}

fn build_palette() -> Vec<PaletteEntry> {
    vec![
        PaletteEntry {
            block_type: BlockType::Start,
            display_name: "Start",
            description: "Entry point; the first message the bot sends",
            default_message: "Hi! How can I help you today?",
            default_options: &[],
        },
        PaletteEntry {
            block_type: BlockType::Message,
            display_name: "Message",
            description: "Bot sends a message and continues",
            default_message: "",
            default_options: &[],
        },
        PaletteEntry {
            block_type: BlockType::Option,
            display_name: "Options",
            description: "Offer the user a choice; each option is its own branch",
            default_message: "",
            default_options: &["Option 1"],
        },
        PaletteEntry {
            block_type: BlockType::Condition,
            display_name: "Condition",
            description: "Branch on the option the user picked earlier",
            default_message: "",
            default_options: &[],
        },
        PaletteEntry {
            block_type: BlockType::UserResponse,
            display_name: "User Response",
            description: "Wait for free-text input from the user",
            default_message: "",
            default_options: &[],
        },
        PaletteEntry {
            block_type: BlockType::End,
            display_name: "End",
            description: "Closing message; ends the conversation",
            default_message: "Thanks for chatting!",
            default_options: &[],
        },
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Colours
// ────────────────────────────────────────────────────────────────────────────

/// Visual style of one block type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStyle {
    /// Header / accent colour.
    pub accent: Rgb,
    /// Body fill.
    pub background: Rgb,
    /// Outline.
    pub border: Rgb,
}

/// A partial [`BlockStyle`] as written in a config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockStyleOverride {
    pub accent: Option<Rgb>,
    pub background: Option<Rgb>,
    pub border: Option<Rgb>,
}

impl BlockStyle {
    fn merged(mut self, o: &BlockStyleOverride) -> Self {
        if let Some(c) = o.accent {
            self.accent = c;
        }
        if let Some(c) = o.background {
            self.background = c;
        }
        if let Some(c) = o.border {
            self.border = c;
        }
        self
    }
}

fn default_style(block_type: BlockType) -> BlockStyle {
    let accent = match block_type {
        BlockType::Start => Rgb(34, 197, 94),
        BlockType::Message => Rgb(59, 130, 246),
        BlockType::Option => Rgb(168, 85, 247),
        BlockType::Condition => Rgb(245, 158, 11),
        BlockType::UserResponse => Rgb(20, 184, 166),
        BlockType::End => Rgb(239, 68, 68),
    };
    BlockStyle {
        accent,
        background: Rgb(255, 255, 255),
        border: Rgb(209, 213, 219),
    }
}

/// Per-type colour table.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockColors {
    styles: HashMap<BlockType, BlockStyle>,
}

impl Default for BlockColors {
    fn default() -> Self {
        Self {
            styles: BlockType::ALL.iter().map(|t| (*t, default_style(*t))).collect(),
        }
    }
}

impl BlockColors {
    /// Defaults with the given overrides applied on top.
    pub fn with_overrides(overrides: &HashMap<BlockType, BlockStyleOverride>) -> Self {
        let mut colors = Self::default();
        for (t, o) in overrides {
            let base = colors.style(*t);
            colors.styles.insert(*t, base.merged(o));
        }
        colors
    }

    pub fn style(&self, block_type: BlockType) -> BlockStyle {
        self.styles
            .get(&block_type)
            .copied()
            .unwrap_or_else(|| default_style(block_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_covers_every_type_once() {
        for t in BlockType::ALL {
            assert_eq!(get_palette().iter().filter(|e| e.block_type == t).count(), 1, "{t}");
        }
    }

    #[test]
    fn search() {
        assert!(palette_entry(BlockType::UserResponse).unwrap().matches_query("free-text"));
        assert!(palette_entry(BlockType::Option).unwrap().matches_query("OPTION"));
        assert!(!palette_entry(BlockType::End).unwrap().matches_query("branch"));
    }

    #[test]
    fn created_blocks_get_defaults() {
        let b = palette_entry(BlockType::Option).unwrap().create(Position::new(5.0, 6.0));
        assert_eq!(b.options, vec!["Option 1".to_string()]);
        assert_eq!(b.position, Position::new(5.0, 6.0));
        let other = palette_entry(BlockType::Option).unwrap().create(Position::default());
        assert_ne!(b.id, other.id);
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let mut o = HashMap::new();
        o.insert(
            BlockType::End,
            BlockStyleOverride {
                accent: Some(Rgb(1, 2, 3)),
                ..Default::default()
            },
        );
        let colors = BlockColors::with_overrides(&o);
        assert_eq!(colors.style(BlockType::End).accent, Rgb(1, 2, 3));
        assert_eq!(colors.style(BlockType::End).background, Rgb(255, 255, 255));
        assert_eq!(colors.style(BlockType::Start), BlockColors::default().style(BlockType::Start));
    }
}
