//! Runs the simulator end to end against the in-memory trade pipeline.

use std::sync::Arc;
use std::time::Duration;

use lineage_core::{render_text, View};
use lineage_service::TradePipeline;
use lineage_sim::{App, Intent, Runtime, Status};

async fn start() -> (App, Runtime<TradePipeline>) {
    let mut app = App::new(Duration::ZERO);
    let mut rt = Runtime::new(Arc::new(TradePipeline::new()));
    let cmds = app.dispatch(Intent::Start);
    app.drive(&mut rt, cmds).await;
    (app, rt)
}

#[tokio::test]
async fn walks_all_six_steps() {
    let (mut app, mut rt) = start().await;
    assert_eq!(app.session().status(), Status::Ready);
    assert_eq!(app.session().steps().len(), 6);

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let cmds = app.dispatch(Intent::Advance);
        app.drive(&mut rt, cmds).await;
        statuses.push((app.session().status(), app.session().current_step()));
    }

    assert_eq!(statuses[0], (Status::Ready, 1));
    assert_eq!(statuses[4], (Status::Completed, 5));
    assert_eq!(statuses[5], (Status::Completed, 5));

    let snapshot = app.session().snapshot();
    assert!(snapshot.contains_key("regulatoryId"));
    assert!(snapshot.contains_key("valueCurrency"));
    assert!(!snapshot.contains_key("currency"));

    let text = render_text(&app.view());
    assert!(text.contains("Transaction processing complete!"));
}

#[tokio::test]
async fn reset_returns_to_capture() {
    let (mut app, mut rt) = start().await;
    let initial = app.session().snapshot().clone();
    for _ in 0..3 {
        let cmds = app.dispatch(Intent::Advance);
        app.drive(&mut rt, cmds).await;
    }
    assert_eq!(app.session().current_step(), 3);

    let cmds = app.dispatch(Intent::Reset);
    app.drive(&mut rt, cmds).await;
    assert_eq!(app.session().current_step(), 0);
    assert_eq!(app.session().snapshot(), &initial);
    assert!(app.session().transformations().is_empty());
}

#[tokio::test]
async fn view_highlights_fields_added_by_the_last_step() {
    let (mut app, mut rt) = start().await;
    let cmds = app.dispatch(Intent::Advance);
    app.drive(&mut rt, cmds).await;

    let View::Simulation { panel, .. } = app.view() else {
        panic!("expected the simulation view");
    };
    let highlighted: Vec<&str> = panel
        .rows
        .iter()
        .filter(|r| r.highlighted)
        .map(|r| r.field.as_str())
        .collect();
    assert_eq!(highlighted, vec!["validationStatus", "validationTimestamp"]);
}
