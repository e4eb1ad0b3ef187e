//! Drag-positioning engine.
//!
//! Dragging is a high-frequency event. While a drag is active the moving
//! block's screen position is written straight into its [`PositionHandle`]
//! and the graph is not touched. The renderer paints a block from its handle
//! whenever the handle holds an override, and from the graph otherwise.
//!
//! On pointer-up the engine reads the handle back, releases it to the graph,
//! and yields exactly one position for the caller to commit. Exactly one
//! owner holds the mutable position at any instant: the engine between
//! [`DragEngine::begin`] and [`DragEngine::end`], the graph otherwise.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use super::viewport::{ScreenPos, Viewport};
use crate::model::Position;

/// Imperative position setter of one rendered block.
///
/// Clones share the same slot; the renderer keeps one clone and registers
/// another through `set_ref`.
#[derive(Debug, Clone, Default)]
pub struct PositionHandle {
    slot: Rc<Cell<Option<ScreenPos>>>,
}

impl PositionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the on-screen position.
    pub fn write(&self, pos: ScreenPos) {
        self.slot.set(Some(pos));
    }

    /// Current override, if the block is being positioned imperatively.
    pub fn read(&self) -> Option<ScreenPos> {
        self.slot.get()
    }

    /// Hand control back to declarative rendering.
    pub fn release(&self) -> Option<ScreenPos> {
        self.slot.take()
    }

    pub fn same_as(&self, other: &PositionHandle) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

/// Handles of mounted blocks, keyed by block id.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    handles: HashMap<String, PositionHandle>,
}

impl HandleRegistry {
    /// Register (`Some`) or deregister (`None`) a block's handle.
    pub fn set_ref(&mut self, id: &str, handle: Option<PositionHandle>) {
        match handle {
            Some(h) => {
                self.handles.insert(id.to_string(), h);
            }
            None => {
                if let Some(old) = self.handles.remove(id) {
                    old.release();
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&PositionHandle> {
        self.handles.get(id)
    }

    /// Handle for `id`, registering a fresh one if the block has none yet.
    pub fn get_or_register(&mut self, id: &str) -> PositionHandle {
        self.handles.entry(id.to_string()).or_default().clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    /// Deregister every handle whose id `keep` rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.handles.retain(|id, h| {
            let k = keep(id);
            if !k {
                h.release();
            }
            k
        });
    }
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    block_id: String,
    /// Pointer minus block top-left, in screen space.
    grab: (f32, f32),
    handle: PositionHandle,
}

/// The outcome of a finished drag: the one authoritative position write.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub block_id: String,
    pub position: Position,
}

/// Tracks at most one block drag.
#[derive(Debug, Clone, Default)]
pub struct DragEngine {
    active: Option<ActiveDrag>,
}

impl DragEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dragging `block_id`, grabbed at `pointer` while its top-left is
    /// at `block_screen`. Returns false (and starts nothing) if the block has
    /// no registered handle.
    pub fn begin(
        &mut self,
        registry: &HandleRegistry,
        block_id: &str,
        pointer: ScreenPos,
        block_screen: ScreenPos,
    ) -> bool {
        let Some(handle) = registry.get(block_id) else {
            trace!(block = %block_id, "drag not started: block not mounted");
            return false;
        };
        if let Some(prev) = self.active.take() {
            prev.handle.release();
        }
        handle.write(block_screen);
        self.active = Some(ActiveDrag {
            block_id: block_id.to_string(),
            grab: pointer.offset_from(block_screen),
            handle: handle.clone(),
        });
        true
    }

    /// Follow the pointer. Only the handle is written.
    pub fn pointer_move(&mut self, pointer: ScreenPos) {
        if let Some(drag) = &self.active {
            drag.handle.write(pointer.translated(-drag.grab.0, -drag.grab.1));
        }
    }

    /// Finish the drag at `pointer`.
    ///
    /// Returns the position to commit, converted to canvas space, or `None`
    /// when nothing was being dragged or the block was unmounted meanwhile.
    /// The handle is released in every case.
    pub fn end(
        &mut self,
        registry: &HandleRegistry,
        viewport: &Viewport,
        pointer: ScreenPos,
    ) -> Option<Reconciliation> {
        let drag = self.active.take()?;
        let mounted = registry
            .get(&drag.block_id)
            .is_some_and(|h| h.same_as(&drag.handle));
        if !mounted {
            drag.handle.release();
            trace!(block = %drag.block_id, "dropped reconciliation of unmounted block");
            return None;
        }
        drag.handle.write(pointer.translated(-drag.grab.0, -drag.grab.1));
        let screen = drag.handle.release()?;
        Some(Reconciliation {
            block_id: drag.block_id,
            position: viewport.to_canvas(screen),
        })
    }

    /// Id of the block currently being dragged.
    pub fn dragging(&self) -> Option<&str> {
        self.active.as_ref().map(|d| d.block_id.as_str())
    }

    pub fn is_dragging(&self, block_id: &str) -> bool {
        self.dragging() == Some(block_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mounted(ids: &[&str]) -> HandleRegistry {
        let mut r = HandleRegistry::default();
        for id in ids {
            r.set_ref(id, Some(PositionHandle::new()));
        }
        r
    }

    #[test]
    fn moves_write_only_the_handle() {
        let reg = mounted(&["a", "b"]);
        let mut drag = DragEngine::new();
        assert!(drag.begin(&reg, "a", ScreenPos::new(15.0, 15.0), ScreenPos::new(10.0, 10.0)));
        drag.pointer_move(ScreenPos::new(25.0, 35.0));
        assert_eq!(reg.get("a").unwrap().read(), Some(ScreenPos::new(20.0, 30.0)));
        assert_eq!(reg.get("b").unwrap().read(), None);
        assert!(drag.is_dragging("a"));
        assert!(!drag.is_dragging("b"));
    }

    #[test]
    fn end_converts_and_releases() {
        let reg = mounted(&["a"]);
        let vp = Viewport {
            zoom: 2.0,
            ..Viewport::default()
        };
        let mut drag = DragEngine::new();
        drag.begin(&reg, "a", ScreenPos::new(5.0, 5.0), ScreenPos::new(0.0, 0.0));
        drag.pointer_move(ScreenPos::new(50.0, 50.0));
        let r = drag.end(&reg, &vp, ScreenPos::new(45.0, 25.0)).unwrap();
        assert_eq!(r.block_id, "a");
        assert_eq!(r.position, Position::new(20.0, 10.0));
        assert_eq!(reg.get("a").unwrap().read(), None);
        assert_eq!(drag.dragging(), None);
        assert!(drag.end(&reg, &vp, ScreenPos::default()).is_none());
    }

    #[test]
    fn unmounted_block_is_dropped() {
        let mut reg = mounted(&["a"]);
        let mut drag = DragEngine::new();
        drag.begin(&reg, "a", ScreenPos::default(), ScreenPos::default());
        reg.set_ref("a", None);
        drag.pointer_move(ScreenPos::new(3.0, 3.0));
        assert!(drag.end(&reg, &Viewport::default(), ScreenPos::new(3.0, 3.0)).is_none());
    }

    #[test]
    fn remounted_block_is_not_reconciled() {
        let mut reg = mounted(&["a"]);
        let mut drag = DragEngine::new();
        drag.begin(&reg, "a", ScreenPos::default(), ScreenPos::default());
        reg.set_ref("a", Some(PositionHandle::new()));
        assert!(drag.end(&reg, &Viewport::default(), ScreenPos::new(3.0, 3.0)).is_none());
    }

    #[test]
    fn unregistered_block_does_not_start() {
        let reg = mounted(&[]);
        let mut drag = DragEngine::new();
        assert!(!drag.begin(&reg, "a", ScreenPos::default(), ScreenPos::default()));
        assert_eq!(drag.dragging(), None);
    }
}
