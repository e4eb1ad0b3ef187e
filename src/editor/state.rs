//! Editor state management.
//!
//! [`EditorState`] is the canvas-level controller and the single writer of
//! the workflow graph. Block views only ever see read-only slices of it and
//! send [`BlockIntent`]s back; every mutation happens synchronously in one of
//! the handlers below.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info};

use super::block_view::{BlockEditor, BlockIntent, BlockProps, BlockView, PointerTarget};
use super::drag::{DragEngine, HandleRegistry, PositionHandle, Reconciliation};
use super::palette::{BlockColors, palette_entry};
use super::viewport::{ScreenPos, Viewport, snap};
use crate::config::EditorConfig;
use crate::error::GraphError;
use crate::graph::{self, BlockUpdate};
use crate::integrity::{IntegrityWarning, sanitize};
use crate::model::{Block, BlockType, Graph, Handle, Position};
use crate::rules::can_connect;
use crate::store::WorkflowStore;

// ────────────────────────────────────────────────────────────────────────────
// Notices
// ────────────────────────────────────────────────────────────────────────────

/// A transient, non-blocking message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

/// What the canvas is doing with the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PointerMode {
    #[default]
    Idle,
    /// A block is being dragged; see [`DragEngine`].
    DraggingBlock,
    /// The empty canvas is being dragged.
    Panning { last: ScreenPos },
}

// ────────────────────────────────────────────────────────────────────────────
// EditorState
// ────────────────────────────────────────────────────────────────────────────

/// The complete state of the workflow editor.
///
/// # Example
///
/// ```rust,ignore
/// use chatflow::editor::EditorState;
///
/// let mut state = EditorState::new(graph, EditorConfig::default());
/// state.on_connection_click(Handle::output("start"), Instant::now());
/// state.on_connection_click(Handle::input("end"), Instant::now());
/// ```
pub struct EditorState {
    graph: Graph,
    pub config: EditorConfig,
    pub colors: BlockColors,
    pub viewport: Viewport,
    /// The first handle of a two-click connection.
    pending: Option<Handle>,
    pub selected_block: Option<String>,
    pub drag: DragEngine,
    pub handles: HandleRegistry,
    pub pointer_mode: PointerMode,
    /// Staged inline edits, per block.
    pub editors: HashMap<String, BlockEditor>,
    pub notice: Option<Notice>,
    /// Repairs made when the current graph was loaded.
    pub load_warnings: Vec<IntegrityWarning>,
    /// Whether the graph has been modified since last save.
    pub dirty: bool,
    /// Workflow id the graph was loaded from, if any.
    pub workflow_id: Option<String>,
}

impl EditorState {
    /// Take ownership of `graph`, repairing it first.
    pub fn new(mut graph: Graph, config: EditorConfig) -> Self {
        let load_warnings = sanitize(&mut graph);
        let (lo, hi) = config.zoom_limits;
        Self {
            graph,
            colors: config.block_colors(),
            viewport: Viewport::with_zoom_limits(lo, hi),
            config,
            pending: None,
            selected_block: None,
            drag: DragEngine::new(),
            handles: HandleRegistry::default(),
            pointer_mode: PointerMode::Idle,
            editors: HashMap::new(),
            notice: None,
            load_warnings,
            dirty: false,
            workflow_id: None,
        }
    }

    /// Load workflow `id` from `store`.
    pub fn load_from(store: &mut dyn WorkflowStore, id: &str, config: EditorConfig) -> Result<Self> {
        let graph = store.load_workflow(id)?;
        let mut state = Self::new(graph, config);
        state.workflow_id = Some(id.to_string());
        if !state.load_warnings.is_empty() {
            info!(workflow = %id, repairs = state.load_warnings.len(), "repaired workflow on load");
        }
        Ok(state)
    }

    /// Save the graph back under the id it was loaded from.
    pub fn save_to(&mut self, store: &mut dyn WorkflowStore) -> Result<()> {
        let id = self
            .workflow_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Workflow has no id; use save_as"))?;
        self.save_as(store, &id)
    }

    pub fn save_as(&mut self, store: &mut dyn WorkflowStore, id: &str) -> Result<()> {
        store.save_workflow(id, &self.graph)?;
        self.workflow_id = Some(id.to_string());
        self.dirty = false;
        Ok(())
    }

    /// Read-only view of the graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn pending(&self) -> Option<&Handle> {
        self.pending.as_ref()
    }

    /// Derive the view of block `id`.
    pub fn block_view(&self, id: &str) -> Option<BlockView> {
        let block = self.graph.block(id)?;
        Some(BlockView::derive(BlockProps {
            block,
            graph: &self.graph,
            is_selected: self.selected_block.as_deref() == Some(id),
            colors: &self.colors,
            pending: self.pending.as_ref(),
            is_being_dragged: self.drag.is_dragging(id),
        }))
    }

    /// Views of all blocks, in graph order.
    pub fn block_views(&self) -> Vec<BlockView> {
        self.graph
            .blocks
            .iter()
            .filter_map(|b| self.block_view(&b.id))
            .collect()
    }

    // ── Notices ─────────────────────────────────────────────────────────────

    pub fn show_notice(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        debug!(%message, "notice");
        self.notice = Some(Notice {
            message,
            expires_at: now + self.config.notice_duration(),
        });
    }

    /// The visible notice at `now`; expired notices are dropped.
    pub fn current_notice(&mut self, now: Instant) -> Option<&str> {
        if self.notice.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.notice = None;
        }
        self.notice.as_ref().map(|n| n.message.as_str())
    }

    // ── Intents ─────────────────────────────────────────────────────────────

    /// Route one block intent to its handler.
    pub fn dispatch(&mut self, intent: BlockIntent, now: Instant) {
        match intent {
            BlockIntent::Update(id, update) => self.on_update(&id, update, now),
            BlockIntent::Delete(id) => self.on_delete(&id, now),
            BlockIntent::ConnectionClick(handle) => self.on_connection_click(handle, now),
            BlockIntent::MouseDown {
                block_id,
                target,
                pointer,
            } => self.on_mouse_down(&block_id, target, pointer),
        }
    }

    /// Apply a partial update, surfacing refusals as a notice.
    pub fn on_update(&mut self, id: &str, update: BlockUpdate, now: Instant) {
        if update.is_empty() {
            return;
        }
        match graph::apply_block_update(&mut self.graph, id, update) {
            Ok(()) => self.dirty = true,
            Err(e) => self.show_notice(e.to_string(), now),
        }
    }

    /// Delete block `id` and everything hanging off it.
    pub fn on_delete(&mut self, id: &str, now: Instant) {
        if let Err(e) = self.delete_block(id) {
            self.show_notice(e.to_string(), now);
        }
    }

    fn delete_block(&mut self, id: &str) -> Result<(), GraphError> {
        let block = self
            .graph
            .block(id)
            .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;
        if block.block_type == BlockType::Start {
            return Err(GraphError::StartNotDeletable);
        }
        graph::delete_block(&mut self.graph, id)?;
        if self.pending.as_ref().is_some_and(|h| h.block_id == id) {
            self.pending = None;
        }
        if self.selected_block.as_deref() == Some(id) {
            self.selected_block = None;
        }
        self.editors.remove(id);
        // The block is unmounted; a drag in flight must not reconcile onto it.
        self.set_ref(id, None);
        self.dirty = true;
        Ok(())
    }

    /// Two-click connection protocol.
    ///
    /// The first click arms `handle`. Clicking the armed handle again cancels.
    /// Any other click tries to connect the two; the pending state is cleared
    /// whether or not the connection was accepted.
    pub fn on_connection_click(&mut self, handle: Handle, now: Instant) {
        let Some(first) = self.pending.take() else {
            debug!(block = %handle.block_id, kind = ?handle.kind, option = ?handle.option_index, "armed handle");
            self.pending = Some(handle);
            return;
        };
        if first == handle {
            debug!(block = %handle.block_id, "cancelled pending connection");
            return;
        }
        match can_connect(&self.graph, &first, &handle) {
            Ok(connection) => {
                graph::connect(&mut self.graph, connection);
                self.dirty = true;
            }
            Err(reason) => self.show_notice(reason.to_string(), now),
        }
    }

    /// Remove one connection by id.
    pub fn disconnect(&mut self, connection_id: &str, now: Instant) {
        match graph::disconnect(&mut self.graph, connection_id) {
            Ok(_) => self.dirty = true,
            Err(e) => self.show_notice(e.to_string(), now),
        }
    }

    /// Cancel a pending connection without connecting anything.
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    // ── Pointer ─────────────────────────────────────────────────────────────

    /// Mouse-down on a block. Selects it; on the plain surface also starts a
    /// drag.
    pub fn on_mouse_down(&mut self, block_id: &str, target: PointerTarget, pointer: ScreenPos) {
        let Some(block) = self.graph.block(block_id) else {
            return;
        };
        self.selected_block = Some(block_id.to_string());
        if !target.starts_drag() {
            return;
        }
        let block_screen = self.viewport.to_screen(block.position);
        if self.drag.begin(&self.handles, block_id, pointer, block_screen) {
            self.pointer_mode = PointerMode::DraggingBlock;
        }
    }

    /// Mouse-down on the empty canvas: clear selection and start panning.
    pub fn on_canvas_mouse_down(&mut self, pointer: ScreenPos) {
        self.selected_block = None;
        self.pointer_mode = PointerMode::Panning { last: pointer };
    }

    pub fn on_pointer_move(&mut self, pointer: ScreenPos) {
        match self.pointer_mode {
            PointerMode::Idle => {}
            PointerMode::DraggingBlock => self.drag.pointer_move(pointer),
            PointerMode::Panning { last } => {
                let (dx, dy) = pointer.offset_from(last);
                self.viewport.pan_by(dx, dy);
                self.pointer_mode = PointerMode::Panning { last: pointer };
            }
        }
    }

    /// Pointer released. Ends a block drag with its single position commit.
    pub fn on_pointer_up(&mut self, pointer: ScreenPos) {
        let mode = std::mem::take(&mut self.pointer_mode);
        if mode != PointerMode::DraggingBlock {
            return;
        }
        let Some(Reconciliation { block_id, position }) = self.drag.end(&self.handles, &self.viewport, pointer)
        else {
            return;
        };
        let position = if self.config.snap_to_grid {
            snap(position, self.config.grid_size)
        } else {
            position
        };
        if self.graph.block(&block_id).is_none() {
            return;
        }
        debug!(block = %block_id, x = position.x, y = position.y, "reconciled drag");
        if graph::apply_block_update(&mut self.graph, &block_id, BlockUpdate::position(position)).is_ok() {
            self.dirty = true;
        }
    }

    /// Register or deregister the positionable element of a block.
    pub fn set_ref(&mut self, id: &str, handle: Option<PositionHandle>) {
        self.handles.set_ref(id, handle);
    }

    /// Position a renderer should draw block `id` at: the drag override while
    /// dragged, the graph position otherwise.
    pub fn screen_position(&self, id: &str) -> Option<ScreenPos> {
        let block = self.graph.block(id)?;
        let overridden = self
            .handles
            .get(id)
            .and_then(|h| h.read())
            .filter(|_| self.drag.is_dragging(id));
        Some(overridden.unwrap_or_else(|| self.viewport.to_screen(block.position)))
    }

    // ── Palette ─────────────────────────────────────────────────────────────

    /// Insert a fresh block of `block_type` at `position`.
    ///
    /// Refuses a second start block. Returns the new block's id.
    pub fn insert_block(&mut self, block_type: BlockType, position: Position) -> Result<String, GraphError> {
        if block_type == BlockType::Start && self.graph.start_block().is_some() {
            return Err(GraphError::SecondStart);
        }
        let position = if self.config.snap_to_grid {
            snap(position, self.config.grid_size)
        } else {
            position
        };
        let block = match palette_entry(block_type) {
            Some(entry) => entry.create(position),
            None => Block::new(block_type, block_type.as_str(), position),
        };
        let id = block.id.clone();
        graph::add_block(&mut self.graph, block);
        self.selected_block = Some(id.clone());
        self.dirty = true;
        debug!(block = %id, %block_type, "inserted block");
        Ok(id)
    }

    /// Like [`insert_block`](Self::insert_block) but reports refusal as a notice.
    pub fn insert_block_or_notify(&mut self, block_type: BlockType, position: Position, now: Instant) -> Option<String> {
        match self.insert_block(block_type, position) {
            Ok(id) => Some(id),
            Err(e) => {
                self.show_notice(e.to_string(), now);
                None
            }
        }
    }

    /// Drop handles and editors of blocks that no longer exist.
    pub fn prune_unmounted(&mut self) {
        let graph = &self.graph;
        self.handles.retain(|id| graph.block(id).is_some());
        self.editors.retain(|id, _| graph.block(id).is_some());
    }

    pub fn notice_duration(&self) -> Duration {
        self.config.notice_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> EditorState {
        let p = Position::default();
        let mut g = Graph::new();
        g.blocks.push(Block::with_id("s", BlockType::Start, "Start", p));
        g.blocks.push(Block::with_id("m", BlockType::Message, "Msg", Position::new(100.0, 40.0)));
        g.blocks.push(Block::with_id("e", BlockType::End, "End", p));
        let config = EditorConfig {
            snap_to_grid: false,
            ..EditorConfig::default()
        };
        EditorState::new(g, config)
    }

    #[test]
    fn two_click_connect_and_cancel() {
        let now = Instant::now();
        let mut st = state();
        st.on_connection_click(Handle::output("s"), now);
        assert_eq!(st.pending(), Some(&Handle::output("s")));
        st.on_connection_click(Handle::output("s"), now);
        assert_eq!(st.pending(), None);
        assert!(st.graph().connections.is_empty());

        st.on_connection_click(Handle::input("m"), now);
        st.on_connection_click(Handle::output("s"), now);
        assert_eq!(st.pending(), None);
        assert_eq!(st.graph().connections.len(), 1);
        assert!(st.dirty);
    }

    #[test]
    fn rejected_connect_shows_notice_and_clears_pending() {
        let now = Instant::now();
        let mut st = state();
        st.on_connection_click(Handle::output("m"), now);
        st.on_connection_click(Handle::input("s"), now);
        assert_eq!(st.pending(), None);
        assert!(st.graph().connections.is_empty());
        assert_eq!(st.current_notice(now), Some("start blocks accept no input"));
        let later = now + st.notice_duration();
        assert_eq!(st.current_notice(later), None);
    }

    #[test]
    fn start_cannot_be_deleted_or_duplicated() {
        let now = Instant::now();
        let mut st = state();
        st.on_delete("s", now);
        assert!(st.graph().block("s").is_some());
        assert_eq!(st.current_notice(now), Some("The start block cannot be deleted"));
        assert_eq!(st.insert_block(BlockType::Start, Position::default()), Err(GraphError::SecondStart));
        let id = st.insert_block(BlockType::Option, Position::new(3.0, 4.0)).unwrap();
        assert_eq!(st.graph().block(&id).unwrap().options.len(), 1);
        assert_eq!(st.selected_block.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn delete_clears_pending_and_selection() {
        let now = Instant::now();
        let mut st = state();
        st.selected_block = Some("m".into());
        st.on_connection_click(Handle::output("m"), now);
        st.on_delete("m", now);
        assert_eq!(st.pending(), None);
        assert_eq!(st.selected_block, None);
    }

    #[test]
    fn drag_reconciles_once_with_snap() {
        let mut st = state();
        st.config.snap_to_grid = true;
        st.set_ref("m", Some(PositionHandle::new()));
        st.on_mouse_down("m", PointerTarget::Surface, ScreenPos::new(110.0, 50.0));
        assert_eq!(st.pointer_mode, PointerMode::DraggingBlock);
        for i in 0..10 {
            st.on_pointer_move(ScreenPos::new(110.0 + i as f32, 50.0 + i as f32));
            assert_eq!(st.graph().block("m").unwrap().position, Position::new(100.0, 40.0));
        }
        assert_eq!(st.screen_position("m"), Some(ScreenPos::new(109.0, 49.0)));
        st.on_pointer_up(ScreenPos::new(143.0, 77.0));
        assert_eq!(st.graph().block("m").unwrap().position, Position::new(130.0, 70.0));
        assert_eq!(st.pointer_mode, PointerMode::Idle);
        assert_eq!(st.screen_position("m"), Some(ScreenPos::new(130.0, 70.0)));
    }

    #[test]
    fn mouse_down_on_field_selects_without_drag() {
        let mut st = state();
        st.set_ref("m", Some(PositionHandle::new()));
        st.on_mouse_down("m", PointerTarget::Field, ScreenPos::new(110.0, 50.0));
        assert_eq!(st.selected_block.as_deref(), Some("m"));
        assert_eq!(st.drag.dragging(), None);
        assert_eq!(st.pointer_mode, PointerMode::Idle);
    }

    #[test]
    fn panning_moves_viewport() {
        let mut st = state();
        st.on_canvas_mouse_down(ScreenPos::new(0.0, 0.0));
        st.on_pointer_move(ScreenPos::new(10.0, 5.0));
        st.on_pointer_move(ScreenPos::new(15.0, 5.0));
        st.on_pointer_up(ScreenPos::new(15.0, 5.0));
        assert_eq!(st.viewport.pan, (15.0, 5.0));
        assert_eq!(st.pointer_mode, PointerMode::Idle);
    }

    #[test]
    fn failed_update_is_reported() {
        let now = Instant::now();
        let mut st = state();
        st.on_update("m", BlockUpdate::options(vec!["x".into()]), now);
        assert!(st.current_notice(now).is_some());
        assert!(!st.dirty);
    }

    #[test]
    fn inverted_zoom_limits_do_not_panic() {
        let config = EditorConfig {
            zoom_limits: (2.0, 1.0),
            ..EditorConfig::default()
        };
        let mut st = EditorState::new(Graph::new(), config);
        st.viewport.zoom_at(ScreenPos::new(50.0, 50.0), 0.1);
        assert_eq!(st.viewport.zoom, 1.0);
    }
}
