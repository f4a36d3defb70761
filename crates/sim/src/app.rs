//! Routes user intents to the three independently owned state records.
//!
//! The session only ever sees session intents. Pointer events go through
//! the region router, which hands each one to exactly one of the viewport,
//! the panel, or a control. Zoom and panel controls are applied directly
//! and never wait on the service.

use lineage_core::{
    build_view, Activity, ControlId, ErrorBanner, FloatingPanel, Layout, PointerEvent,
    PointerRouter, RegionMap, Routed, View, ViewInput, Viewport,
};
use lineage_service::SimulationService;
use std::time::Duration;
use tracing::debug;

use crate::runtime::Runtime;
use crate::session::{Command, Completion, Session, Status};

/// Everything a user can ask for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Start,
    Advance,
    Reset,
    DismissError,
    /// Navigate away from the simulation.
    Leave,
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ResetPosition,
    TogglePanel,
    Pointer(PointerEvent),
}

impl From<ControlId> for Intent {
    fn from(id: ControlId) -> Self {
        match id {
            ControlId::Back => Intent::Leave,
            ControlId::Reset => Intent::Reset,
            ControlId::Advance => Intent::Advance,
            ControlId::ZoomIn => Intent::ZoomIn,
            ControlId::ZoomOut => Intent::ZoomOut,
            ControlId::ZoomReset => Intent::ZoomReset,
            ControlId::ResetPosition => Intent::ResetPosition,
            ControlId::TogglePanel => Intent::TogglePanel,
        }
    }
}

#[derive(Debug)]
pub struct App {
    session: Session,
    viewport: Viewport,
    panel: FloatingPanel,
    layout: Layout,
    router: PointerRouter,
    /// What the router did with the most recent pointer event.
    last_routed: Option<Routed>,
}

impl App {
    pub fn new(settle: Duration) -> Self {
        App {
            session: Session::new(settle),
            viewport: Viewport::new(),
            panel: FloatingPanel::new(),
            layout: Layout::default(),
            router: PointerRouter::new(),
            last_routed: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn panel(&self) -> &FloatingPanel {
        &self.panel
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn last_routed(&self) -> Option<Routed> {
        self.last_routed
    }

    /// Hit regions for the current panel and viewport state.
    pub fn regions(&self) -> RegionMap {
        RegionMap::build(&self.layout, &self.panel, &self.viewport)
    }

    pub fn dispatch(&mut self, intent: Intent) -> Vec<Command> {
        match intent {
            Intent::Start => self.session.start(),
            Intent::Advance => self.session.advance(),
            Intent::Reset => {
                let full = self.session.transaction_id().is_none();
                let commands = self.session.reset();
                if full && !commands.is_empty() {
                    self.viewport.reset();
                }
                commands
            }
            Intent::DismissError => self.session.dismiss_error(),
            Intent::Leave => {
                self.session.teardown();
                Vec::new()
            }
            Intent::ZoomIn => {
                self.viewport.zoom_in();
                Vec::new()
            }
            Intent::ZoomOut => {
                self.viewport.zoom_out();
                Vec::new()
            }
            Intent::ZoomReset => {
                self.viewport.reset_zoom();
                Vec::new()
            }
            Intent::ResetPosition => {
                self.viewport.reset_position();
                Vec::new()
            }
            Intent::TogglePanel => {
                self.panel.toggle_minimized();
                Vec::new()
            }
            Intent::Pointer(event) => {
                let regions = self.regions();
                let routed = self
                    .router
                    .route(event, &regions, &mut self.viewport, &mut self.panel);
                debug!(?event, ?routed, "pointer");
                self.last_routed = Some(routed);
                match routed {
                    Routed::Control(id) => self.dispatch(Intent::from(id)),
                    _ => Vec::new(),
                }
            }
        }
    }

    pub fn complete(&mut self, completion: Completion) -> Vec<Command> {
        self.session.apply(completion)
    }

    /// Execute `commands` and apply results until nothing is outstanding.
    pub async fn drive<S>(&mut self, runtime: &mut Runtime<S>, commands: Vec<Command>)
    where
        S: SimulationService + ?Sized,
    {
        runtime.execute(commands);
        while let Some(completion) = runtime.next_completion().await {
            let next = self.complete(completion);
            runtime.execute(next);
        }
    }

    pub fn activity(&self) -> Activity {
        match (self.session.status(), self.session.is_settling()) {
            (Status::Processing, true) => Activity::Settling,
            (Status::Processing, false) => Activity::InFlight,
            _ => Activity::Idle,
        }
    }

    pub fn view(&self) -> View {
        let s = &self.session;
        let input = ViewInput {
            loading: s.status() == Status::Loading,
            error: s.error().map(|e| ErrorBanner {
                message: e.to_string(),
                blocking: e.is_blocking(),
            }),
            transaction_id: s.transaction_id(),
            steps: s.steps(),
            current_step: s.current_step(),
            snapshot: s.snapshot(),
            transformations: s.transformations(),
            activity: self.activity(),
            viewport: &self.viewport,
            panel: &self.panel,
        };
        build_view(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::Point;
    use lineage_service::{CallKind, ScriptedService};
    use std::sync::Arc;

    async fn started(svc: Arc<ScriptedService>) -> (App, Runtime<ScriptedService>) {
        let mut app = App::new(Duration::ZERO);
        let mut rt = Runtime::new(svc);
        let cmds = app.dispatch(Intent::Start);
        app.drive(&mut rt, cmds).await;
        (app, rt)
    }

    fn center_of(rect: lineage_core::Rect) -> Point {
        Point::new(rect.x + rect.width / 2.0, rect.y + rect.height / 2.0)
    }

    #[tokio::test]
    async fn advance_control_drives_the_session() {
        let (mut app, mut rt) = started(Arc::new(ScriptedService::three_steps())).await;
        let button = center_of(app.layout().control(ControlId::Advance).unwrap());

        let cmds = app.dispatch(Intent::Pointer(PointerEvent::Down(button)));
        assert_eq!(app.last_routed(), Some(Routed::Control(ControlId::Advance)));
        assert_eq!(app.session().status(), Status::Processing);
        app.drive(&mut rt, cmds).await;

        assert_eq!(app.session().current_step(), 1);
        assert_eq!(app.session().status(), Status::Ready);
    }

    #[tokio::test]
    async fn zoom_and_drag_while_a_step_is_in_flight() {
        let svc = Arc::new(ScriptedService::three_steps().gated());
        let (mut app, mut rt) = started(svc.clone()).await;

        let cmds = app.dispatch(Intent::Advance);
        rt.execute(cmds);

        app.dispatch(Intent::ZoomIn);
        app.dispatch(Intent::Pointer(PointerEvent::Down(Point::new(100.0, 300.0))));
        app.dispatch(Intent::Pointer(PointerEvent::Move(Point::new(130.0, 340.0))));
        app.dispatch(Intent::Pointer(PointerEvent::Up(Point::new(130.0, 340.0))));
        assert_eq!(app.viewport().offset(), Point::new(30.0, 40.0));
        assert!((app.viewport().scale() - 1.1).abs() < 1e-9);
        assert_eq!(app.session().status(), Status::Processing);

        svc.release(1);
        while let Some(c) = rt.next_completion().await {
            let next = app.complete(c);
            rt.execute(next);
        }
        assert_eq!(app.session().current_step(), 1);
        assert_eq!(app.viewport().offset(), Point::new(30.0, 40.0));
    }

    #[tokio::test]
    async fn reset_with_transaction_keeps_viewport() {
        let svc = Arc::new(ScriptedService::three_steps());
        let (mut app, mut rt) = started(svc.clone()).await;
        app.dispatch(Intent::ZoomOut);

        let cmds = app.dispatch(Intent::Reset);
        app.drive(&mut rt, cmds).await;
        assert_eq!(svc.count(CallKind::Reset), 1);
        assert!((app.viewport().scale() - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn full_reset_also_resets_viewport() {
        let svc = Arc::new(ScriptedService::three_steps());
        svc.fail_next(CallKind::FetchSteps);
        let (mut app, mut rt) = started(svc.clone()).await;
        assert!(matches!(app.view(), View::Failed { .. }));

        app.dispatch(Intent::ZoomIn);
        let cmds = app.dispatch(Intent::Reset);
        assert_eq!(app.viewport().scale(), 1.0);
        app.drive(&mut rt, cmds).await;

        assert_eq!(app.session().status(), Status::Ready);
        assert_eq!(svc.count(CallKind::FetchSteps), 2);
        assert_eq!(svc.count(CallKind::Reset), 0);
    }

    #[tokio::test]
    async fn stale_step_result_after_reset_is_ignored() {
        let svc = Arc::new(ScriptedService::three_steps().gated());
        let (mut app, mut rt) = started(svc.clone()).await;

        rt.execute(app.dispatch(Intent::Advance));
        rt.execute(app.dispatch(Intent::Reset));
        svc.release(1);
        while let Some(c) = rt.next_completion().await {
            let next = app.complete(c);
            rt.execute(next);
        }

        assert_eq!(app.session().status(), Status::Ready);
        assert_eq!(app.session().current_step(), 0);
        assert!(app.session().transformations().is_empty());
    }

    #[tokio::test]
    async fn advance_after_reset_waits_for_the_abandoned_step_call() {
        let svc = Arc::new(ScriptedService::three_steps().gated());
        let (mut app, mut rt) = started(svc.clone()).await;

        rt.execute(app.dispatch(Intent::Advance));
        rt.execute(app.dispatch(Intent::Reset));
        // Only the reset can answer while the step call is held.
        let reset_done = rt.next_completion().await.unwrap();
        assert!(matches!(reset_done, Completion::ResetDone { .. }));
        rt.execute(app.complete(reset_done));
        assert_eq!(app.session().status(), Status::Ready);
        assert_eq!(rt.in_flight(), 1);

        assert!(app.dispatch(Intent::Advance).is_empty());
        assert_eq!(rt.in_flight(), 1);

        svc.release(1);
        let late = rt.next_completion().await.unwrap();
        assert!(app.complete(late).is_empty());
        assert_eq!(app.session().current_step(), 0);

        let cmds = app.dispatch(Intent::Advance);
        assert_eq!(cmds.len(), 1);
        svc.release(1);
        app.drive(&mut rt, cmds).await;
        assert_eq!(app.session().current_step(), 1);
        assert_eq!(svc.count(CallKind::Process), 2);
    }

    #[tokio::test]
    async fn back_control_tears_down() {
        let svc = Arc::new(ScriptedService::three_steps().gated());
        let (mut app, mut rt) = started(svc.clone()).await;
        rt.execute(app.dispatch(Intent::Advance));

        let back = center_of(app.layout().control(ControlId::Back).unwrap());
        app.dispatch(Intent::Pointer(PointerEvent::Down(back)));
        assert!(app.session().is_torn_down());

        svc.release(1);
        while let Some(c) = rt.next_completion().await {
            assert!(app.complete(c).is_empty());
        }
        assert_eq!(app.session().current_step(), 0);
    }

    #[tokio::test]
    async fn step_failure_shows_a_dismissable_notice() {
        let svc = Arc::new(ScriptedService::three_steps());
        let (mut app, mut rt) = started(svc.clone()).await;
        svc.fail_next(CallKind::Process);
        let cmds = app.dispatch(Intent::Advance);
        app.drive(&mut rt, cmds).await;

        match app.view() {
            View::Simulation { notice, .. } => {
                assert!(notice.unwrap().starts_with("Failed to process transaction step"))
            }
            other => panic!("expected simulation view, got {:?}", other),
        }
        app.dispatch(Intent::DismissError);
        let cmds = app.dispatch(Intent::Advance);
        app.drive(&mut rt, cmds).await;
        assert_eq!(app.session().current_step(), 1);
    }

    #[test]
    fn toggle_panel_control_minimizes() {
        let mut app = App::new(Duration::ZERO);
        app.dispatch(Intent::TogglePanel);
        assert!(app.panel().is_minimized());
        assert!(app.dispatch(Intent::TogglePanel).is_empty());
        assert!(!app.panel().is_minimized());
    }
}
