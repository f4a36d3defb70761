//! The floating data panel: vertical-only drag plus minimize/expand.
//!
//! The panel keeps its header when minimized, so it can always be dragged
//! and expanded again. Its state is independent of the viewport.

use serde::Serialize;

use crate::types::{Point, Rect};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FloatingPanel {
    offset_y: f64,
    minimized: bool,
    #[serde(skip)]
    drag_anchor_y: Option<f64>,
}

impl FloatingPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The panel offset. `x` is always zero.
    pub fn offset(&self) -> Point {
        Point::new(0.0, self.offset_y)
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor_y.is_some()
    }

    pub fn body_visible(&self) -> bool {
        !self.minimized
    }

    pub fn toggle_minimized(&mut self) {
        self.minimized = !self.minimized;
    }

    pub fn begin_drag(&mut self, pointer: Point) {
        self.drag_anchor_y = Some(pointer.y - self.offset_y);
    }

    /// Follow the pointer vertically. Horizontal motion is ignored.
    pub fn drag_to(&mut self, pointer: Point) -> bool {
        match self.drag_anchor_y {
            Some(anchor) => {
                self.offset_y = pointer.y - anchor;
                true
            }
            None => false,
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor_y = None;
    }

    /// The panel's on-screen frame given its resting frame.
    pub fn frame(&self, base: Rect) -> Rect {
        let height = if self.minimized {
            base.height.min(PANEL_HEADER_HEIGHT)
        } else {
            base.height
        };
        Rect::new(base.x, base.y + self.offset_y, base.width, height)
    }
}

/// Height of the panel header strip, in pixels.
pub const PANEL_HEADER_HEIGHT: f64 = 36.0;
