//! Named interactive regions and pointer routing.
//!
//! A pointer-down goes to the first region that contains it, in fixed
//! priority order: panel header, then controls, then the panel body (which
//! swallows the event), then the canvas background. At most one of the
//! viewport and the panel is being dragged at any time, and pointer-up or
//! pointer-leave always ends both drags.

use serde::Serialize;

use crate::panel::{FloatingPanel, PANEL_HEADER_HEIGHT};
use crate::types::{Point, Rect};
use crate::viewport::Viewport;

/// Clickable controls that never start a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlId {
    Back,
    Reset,
    Advance,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ResetPosition,
    TogglePanel,
}

/// What a pointer position landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "control", rename_all = "snake_case")]
pub enum Hit {
    PanelHeader,
    Control(ControlId),
    PanelBody,
    Canvas,
}

// ── Layout ──────────────────────────────────────────────────────────

/// Width of the minimize/expand button at the right end of the panel header.
const TOGGLE_WIDTH: f64 = 36.0;

/// Resting geometry of the screen, before panel drag is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub canvas: Rect,
    /// Panel frame at offset zero, fully expanded.
    pub panel: Rect,
    /// Fixed controls. `ResetPosition` is only live while the viewport is off-center.
    pub controls: Vec<(ControlId, Rect)>,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            canvas: Rect::new(0.0, 0.0, 1280.0, 800.0),
            panel: Rect::new(860.0, 80.0, 400.0, 480.0),
            controls: vec![
                (ControlId::Back, Rect::new(16.0, 16.0, 140.0, 32.0)),
                (ControlId::Reset, Rect::new(1144.0, 16.0, 120.0, 32.0)),
                (ControlId::Advance, Rect::new(560.0, 740.0, 180.0, 40.0)),
                (ControlId::ZoomReset, Rect::new(1140.0, 700.0, 32.0, 32.0)),
                (ControlId::ZoomOut, Rect::new(1180.0, 700.0, 32.0, 32.0)),
                (ControlId::ZoomIn, Rect::new(1220.0, 700.0, 32.0, 32.0)),
                (ControlId::ResetPosition, Rect::new(1020.0, 700.0, 110.0, 32.0)),
            ],
        }
    }
}

impl Layout {
    /// Resting frame of a control.
    pub fn control(&self, id: ControlId) -> Option<Rect> {
        self.controls
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, rect)| *rect)
    }
}

/// Regions for one frame, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMap {
    regions: Vec<(Hit, Rect)>,
    canvas: Rect,
}

impl RegionMap {
    /// Build the region list for the current panel and viewport state.
    pub fn build(layout: &Layout, panel: &FloatingPanel, viewport: &Viewport) -> Self {
        let frame = panel.frame(layout.panel);
        let header_height = frame.height.min(PANEL_HEADER_HEIGHT);
        let handle_width = (frame.width - TOGGLE_WIDTH).max(0.0);

        let mut regions = vec![(
            Hit::PanelHeader,
            Rect::new(frame.x, frame.y, handle_width, header_height),
        )];
        regions.push((
            Hit::Control(ControlId::TogglePanel),
            Rect::new(frame.x + handle_width, frame.y, TOGGLE_WIDTH, header_height),
        ));
        for (id, rect) in &layout.controls {
            if *id == ControlId::ResetPosition && !viewport.can_reset_position() {
                continue;
            }
            regions.push((Hit::Control(*id), *rect));
        }
        if panel.body_visible() {
            regions.push((
                Hit::PanelBody,
                Rect::new(
                    frame.x,
                    frame.y + header_height,
                    frame.width,
                    frame.height - header_height,
                ),
            ));
        }

        RegionMap {
            regions,
            canvas: layout.canvas,
        }
    }

    /// First region containing `p`; `None` outside the tracked area.
    pub fn hit_test(&self, p: Point) -> Option<Hit> {
        self.regions
            .iter()
            .find(|(_, rect)| rect.contains(p))
            .map(|(hit, _)| *hit)
            .or_else(|| self.canvas.contains(p).then_some(Hit::Canvas))
    }
}

// ── Routing ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
    /// The pointer left the tracked area.
    Leave,
}

/// What the router did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Routed {
    PanelDragStarted,
    ViewportDragStarted,
    /// A control was pressed; the caller turns it into an intent.
    Control(ControlId),
    PanelMoved,
    ViewportMoved,
    DragEnded,
    /// Landed on a region that neither drags nor clicks.
    Absorbed,
    Ignored,
}

/// Dispatches pointer events to exactly one of the viewport or panel.
#[derive(Debug, Default)]
pub struct PointerRouter;

impl PointerRouter {
    pub fn new() -> Self {
        PointerRouter
    }

    pub fn route(
        &self,
        event: PointerEvent,
        regions: &RegionMap,
        viewport: &mut Viewport,
        panel: &mut FloatingPanel,
    ) -> Routed {
        match event {
            PointerEvent::Down(p) => {
                if viewport.is_dragging() || panel.is_dragging() {
                    return Routed::Ignored;
                }
                match regions.hit_test(p) {
                    Some(Hit::PanelHeader) => {
                        panel.begin_drag(p);
                        Routed::PanelDragStarted
                    }
                    Some(Hit::Control(id)) => Routed::Control(id),
                    Some(Hit::PanelBody) => Routed::Absorbed,
                    Some(Hit::Canvas) => {
                        viewport.begin_drag(p);
                        Routed::ViewportDragStarted
                    }
                    None => Routed::Ignored,
                }
            }
            PointerEvent::Move(p) => {
                if panel.drag_to(p) {
                    Routed::PanelMoved
                } else if viewport.drag_to(p) {
                    Routed::ViewportMoved
                } else {
                    Routed::Ignored
                }
            }
            PointerEvent::Up(_) | PointerEvent::Leave => {
                let was_dragging = viewport.is_dragging() || panel.is_dragging();
                viewport.end_drag();
                panel.end_drag();
                if was_dragging {
                    Routed::DragEnded
                } else {
                    Routed::Ignored
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        layout: Layout,
        viewport: Viewport,
        panel: FloatingPanel,
        router: PointerRouter,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                layout: Layout::default(),
                viewport: Viewport::new(),
                panel: FloatingPanel::new(),
                router: PointerRouter::new(),
            }
        }

        fn send(&mut self, event: PointerEvent) -> Routed {
            let regions = RegionMap::build(&self.layout, &self.panel, &self.viewport);
            self.router
                .route(event, &regions, &mut self.viewport, &mut self.panel)
        }
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down(Point::new(x, y))
    }

    fn mv(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move(Point::new(x, y))
    }

    #[test]
    fn header_drag_moves_only_the_panel() {
        let mut f = Fixture::new();
        assert_eq!(f.send(down(900.0, 90.0)), Routed::PanelDragStarted);
        assert_eq!(f.send(mv(400.0, 150.0)), Routed::PanelMoved);
        assert_eq!(f.send(PointerEvent::Up(Point::new(400.0, 150.0))), Routed::DragEnded);

        assert_eq!(f.panel.offset(), Point::new(0.0, 60.0));
        assert_eq!(f.viewport.offset(), Point::ORIGIN);
    }

    #[test]
    fn background_drag_moves_only_the_viewport() {
        let mut f = Fixture::new();
        assert_eq!(f.send(down(200.0, 300.0)), Routed::ViewportDragStarted);
        assert_eq!(f.send(mv(900.0, 100.0)), Routed::ViewportMoved);
        f.send(PointerEvent::Leave);

        assert_eq!(f.viewport.offset(), Point::new(700.0, -200.0));
        assert_eq!(f.panel.offset(), Point::ORIGIN);
    }

    #[test]
    fn controls_and_panel_body_never_start_a_drag() {
        let mut f = Fixture::new();
        assert_eq!(f.send(down(1230.0, 710.0)), Routed::Control(ControlId::ZoomIn));
        assert_eq!(f.send(down(600.0, 750.0)), Routed::Control(ControlId::Advance));
        assert_eq!(f.send(down(1250.0, 90.0)), Routed::Control(ControlId::TogglePanel));
        assert_eq!(f.send(down(1000.0, 300.0)), Routed::Absorbed);
        assert!(!f.viewport.is_dragging());
        assert!(!f.panel.is_dragging());
        assert_eq!(f.send(mv(10.0, 10.0)), Routed::Ignored);
    }

    #[test]
    fn reset_position_control_exists_only_off_center() {
        let mut f = Fixture::new();
        let p = Point::new(1050.0, 710.0);
        let regions = RegionMap::build(&f.layout, &f.panel, &f.viewport);
        assert_eq!(regions.hit_test(p), Some(Hit::Canvas));

        f.send(down(100.0, 100.0));
        f.send(mv(110.0, 100.0));
        f.send(PointerEvent::Up(Point::new(110.0, 100.0)));
        let regions = RegionMap::build(&f.layout, &f.panel, &f.viewport);
        assert_eq!(
            regions.hit_test(p),
            Some(Hit::Control(ControlId::ResetPosition))
        );
    }

    #[test]
    fn minimized_panel_exposes_canvas_below_header() {
        let mut f = Fixture::new();
        f.panel.toggle_minimized();
        assert_eq!(f.send(down(1000.0, 300.0)), Routed::ViewportDragStarted);
        f.send(PointerEvent::Leave);
        assert_eq!(f.send(down(1000.0, 90.0)), Routed::PanelDragStarted);
    }

    #[test]
    fn header_follows_panel_offset() {
        let mut f = Fixture::new();
        f.send(down(900.0, 90.0));
        f.send(mv(900.0, 290.0));
        f.send(PointerEvent::Up(Point::new(900.0, 290.0)));

        // The old header position is now panel body or canvas, the new one is the header.
        assert_eq!(f.send(down(900.0, 290.0)), Routed::PanelDragStarted);
        f.send(PointerEvent::Leave);
        assert_eq!(f.send(down(900.0, 90.0)), Routed::ViewportDragStarted);
    }

    #[test]
    fn overlapping_sequences_keep_offsets_isolated() {
        let mut f = Fixture::new();
        // Panel drag; a stray down over the canvas mid-drag is ignored.
        f.send(down(900.0, 90.0));
        assert_eq!(f.send(down(100.0, 100.0)), Routed::Ignored);
        f.send(mv(900.0, 120.0));
        f.send(PointerEvent::Leave);
        let panel_after = f.panel.offset();
        assert_eq!(f.viewport.offset(), Point::ORIGIN);

        // Viewport drag crossing over the panel header.
        f.send(down(100.0, 100.0));
        f.send(mv(900.0, 125.0));
        f.send(mv(950.0, 140.0));
        f.send(PointerEvent::Up(Point::new(950.0, 140.0)));
        assert_eq!(f.panel.offset(), panel_after);
        assert_eq!(f.viewport.offset(), Point::new(850.0, 40.0));
    }

    #[test]
    fn release_clears_both_drag_flags() {
        let mut f = Fixture::new();
        f.viewport.begin_drag(Point::ORIGIN);
        f.panel.begin_drag(Point::ORIGIN);
        assert_eq!(f.send(PointerEvent::Up(Point::ORIGIN)), Routed::DragEnded);
        assert!(!f.viewport.is_dragging());
        assert!(!f.panel.is_dragging());
        assert_eq!(f.send(PointerEvent::Leave), Routed::Ignored);
    }

    #[test]
    fn outside_tracked_area_is_ignored() {
        let mut f = Fixture::new();
        assert_eq!(f.send(down(-5.0, 10.0)), Routed::Ignored);
        assert_eq!(f.send(down(2000.0, 10.0)), Routed::Ignored);
    }
}
