//! Pan and zoom state for the main visualization.
//!
//! Offset and scale are independent display parameters. The rendered
//! transform translates by the offset and scales about the visualization's
//! own center, so zooming never amplifies the pan offset.

use serde::Serialize;

use crate::types::Point;

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;
pub const SCALE_STEP: f64 = 0.1;
pub const DEFAULT_SCALE: f64 = 1.0;

/// Snap to one decimal place so repeated ±0.1 steps land on exact bounds.
fn snap(scale: f64) -> f64 {
    (scale * 10.0).round() / 10.0
}

/// Owned pan/zoom state. Only [`Viewport`]'s methods mutate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Viewport {
    offset: Point,
    scale: f64,
    /// Pointer position minus offset at drag start; `None` when not dragging.
    #[serde(skip)]
    drag_anchor: Option<Point>,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            offset: Point::ORIGIN,
            scale: DEFAULT_SCALE,
            drag_anchor: None,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    // ── Drag ─────────────────────────────────────────────────────────

    pub fn begin_drag(&mut self, pointer: Point) {
        self.drag_anchor = Some(pointer - self.offset);
    }

    /// Move the drag to `pointer`. Returns `false` (and changes nothing)
    /// when no drag is active.
    pub fn drag_to(&mut self, pointer: Point) -> bool {
        match self.drag_anchor {
            Some(anchor) => {
                self.offset = pointer - anchor;
                true
            }
            None => false,
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    // ── Zoom ─────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.scale = snap(self.scale + SCALE_STEP).min(MAX_SCALE);
    }

    pub fn zoom_out(&mut self) {
        self.scale = snap(self.scale - SCALE_STEP).max(MIN_SCALE);
    }

    /// Restore the default scale. The offset is left alone.
    pub fn reset_zoom(&mut self) {
        self.scale = DEFAULT_SCALE;
    }

    // ── Position ─────────────────────────────────────────────────────

    /// Whether the "reset position" control should be shown.
    pub fn can_reset_position(&self) -> bool {
        !self.offset.is_origin()
    }

    /// Recenter the visualization. The scale is left alone.
    pub fn reset_position(&mut self) {
        self.offset = Point::ORIGIN;
    }

    /// Back to `(0, 0)` at scale 1.0, used by a full simulation reset.
    pub fn reset(&mut self) {
        *self = Viewport::default();
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform {
            translate: self.offset,
            scale: self.scale,
        }
    }
}

/// The composed display transform: translate, then scale about the center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewTransform {
    pub translate: Point,
    pub scale: f64,
}

impl ViewTransform {
    /// Map a content-space point to screen space for content centered at `center`.
    pub fn apply(&self, p: Point, center: Point) -> Point {
        Point::new(
            center.x + (p.x - center.x) * self.scale + self.translate.x,
            center.y + (p.y - center.y) * self.scale + self.translate.y,
        )
    }

    /// CSS form, for hosts that render into a browser surface.
    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.translate.x, self.translate.y, self.scale
        )
    }
}
