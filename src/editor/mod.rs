//! Workflow graph editor.
//!
//! Toolkit-agnostic core plus an optional egui front end:
//!
//! - **Block views**: derived per-block display state and staged inline edits
//! - **Connections**: two-click handle pairing checked by [`crate::rules`]
//! - **Dragging**: direct handle writes during a drag, one commit at the end
//! - **Palette**: insertable block kinds and per-type colours
//! - **Canvas** (feature `egui`): painting, pointer and keyboard handling

pub mod block_view;
pub mod drag;
pub mod palette;
pub mod state;
pub mod viewport;
#[cfg(feature = "egui")]
pub mod ui;

pub use block_view::{
    BlockEditor, BlockIntent, BlockProps, BlockView, ConditionSelect, DraftField, EditKey, OptionRow,
    PointerTarget,
};
pub use drag::{DragEngine, HandleRegistry, PositionHandle, Reconciliation};
pub use palette::{BlockColors, BlockStyle, PaletteEntry, get_palette, palette_entry};
pub use state::{EditorState, Notice, PointerMode};
#[cfg(feature = "egui")]
pub use ui::{EditorApp, editor_update};
pub use viewport::{ScreenPos, Viewport};
