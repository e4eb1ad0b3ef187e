//! Canvas ⇄ screen coordinate mapping.
//!
//! Screen coordinates are what the pointer reports and what a block's
//! position handle holds. Canvas coordinates are what blocks store.

use crate::model::Position;

/// A point in screen (pointer) space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset_from(self, other: ScreenPos) -> (f32, f32) {
        (self.x - other.x, self.y - other.y)
    }

    pub fn translated(self, dx: f32, dy: f32) -> ScreenPos {
        ScreenPos::new(self.x + dx, self.y + dy)
    }
}

/// Pan and zoom of the canvas.
///
/// `screen = origin + pan + canvas * zoom`, where `origin` is the top-left of
/// the canvas widget on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub origin: ScreenPos,
    pub pan: (f32, f32),
    pub zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            origin: ScreenPos::default(),
            pan: (0.0, 0.0),
            zoom: 1.0,
            min_zoom: 0.25,
            max_zoom: 4.0,
        }
    }
}

impl Viewport {
    /// Viewport limited to the given zoom range. The bounds may be given in
    /// either order.
    pub fn with_zoom_limits(min_zoom: f32, max_zoom: f32) -> Self {
        Self {
            min_zoom: min_zoom.min(max_zoom),
            max_zoom: min_zoom.max(max_zoom),
            ..Self::default()
        }
    }

    pub fn to_screen(&self, p: Position) -> ScreenPos {
        ScreenPos::new(
            self.origin.x + self.pan.0 + p.x * self.zoom,
            self.origin.y + self.pan.1 + p.y * self.zoom,
        )
    }

    pub fn to_canvas(&self, s: ScreenPos) -> Position {
        Position::new(
            (s.x - self.origin.x - self.pan.0) / self.zoom,
            (s.y - self.origin.y - self.pan.1) / self.zoom,
        )
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    /// Multiply the zoom by `factor`, keeping the canvas point under `anchor`
    /// fixed on screen.
    pub fn zoom_at(&mut self, anchor: ScreenPos, factor: f32) {
        let world = self.to_canvas(anchor);
        let (lo, hi) = (self.min_zoom.min(self.max_zoom), self.min_zoom.max(self.max_zoom));
        self.zoom = (self.zoom * factor).clamp(lo, hi);
        let moved = self.to_screen(world);
        self.pan.0 += anchor.x - moved.x;
        self.pan.1 += anchor.y - moved.y;
    }

    pub fn reset(&mut self) {
        self.pan = (0.0, 0.0);
        self.zoom = 1.0;
    }
}

/// Round `p` to the nearest multiple of `grid` on both axes.
pub fn snap(p: Position, grid: f32) -> Position {
    if grid <= 0.0 {
        return p;
    }
    Position::new((p.x / grid).round() * grid, (p.y / grid).round() * grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_inverse() {
        let vp = Viewport {
            origin: ScreenPos::new(100.0, 50.0),
            pan: (-20.0, 10.0),
            zoom: 2.0,
            ..Viewport::default()
        };
        let p = Position::new(30.0, -5.0);
        let s = vp.to_screen(p);
        assert_eq!(s, ScreenPos::new(140.0, 50.0));
        assert_eq!(vp.to_canvas(s), p);
    }

    #[test]
    fn zoom_keeps_anchor_fixed_and_clamps() {
        let mut vp = Viewport::default();
        let anchor = ScreenPos::new(200.0, 100.0);
        let before = vp.to_canvas(anchor);
        vp.zoom_at(anchor, 2.0);
        assert_eq!(vp.zoom, 2.0);
        let after = vp.to_canvas(anchor);
        assert!((before.x - after.x).abs() < 1e-4 && (before.y - after.y).abs() < 1e-4);

        vp.zoom_at(anchor, 100.0);
        assert_eq!(vp.zoom, 4.0);
    }

    #[test]
    fn inverted_zoom_limits_are_ordered() {
        let mut vp = Viewport::with_zoom_limits(2.0, 1.0);
        assert_eq!((vp.min_zoom, vp.max_zoom), (1.0, 2.0));
        vp.zoom_at(ScreenPos::new(10.0, 10.0), 10.0);
        assert_eq!(vp.zoom, 2.0);

        vp.min_zoom = 3.0;
        vp.max_zoom = 0.5;
        vp.zoom_at(ScreenPos::default(), 0.01);
        assert_eq!(vp.zoom, 0.5);
    }

    #[test]
    fn snapping() {
        assert_eq!(snap(Position::new(14.0, 16.0), 10.0), Position::new(10.0, 20.0));
        assert_eq!(snap(Position::new(14.0, 16.0), 0.0), Position::new(14.0, 16.0));
    }
}
