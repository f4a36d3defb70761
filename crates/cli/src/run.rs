//! `lineage run` -- headless simulation from capture to completion.

use std::sync::Arc;
use std::time::Duration;

use lineage_core::render_text;
use lineage_service::SimulationService;
use lineage_sim::{App, Intent, Runtime, Status};
use tracing::info;

use crate::OutputFormat;

pub(crate) struct RunOptions {
    pub settle: Duration,
    /// Stop after this many advances; `None` runs to the last step.
    pub max_steps: Option<usize>,
    pub output: OutputFormat,
    pub quiet: bool,
}

/// Initialise a transaction and advance it. Returns the failure message
/// if the session ends in an error.
pub(crate) async fn run(
    service: Arc<dyn SimulationService>,
    opts: RunOptions,
) -> Result<(), String> {
    let mut app = App::new(opts.settle);
    let mut runtime: Runtime = Runtime::new(service);

    let commands = app.dispatch(Intent::Start);
    app.drive(&mut runtime, commands).await;
    print_frame(&app, &opts);

    let mut advanced = 0;
    while app.session().status() == Status::Ready
        && opts.max_steps.map_or(true, |max| advanced < max)
    {
        let commands = app.dispatch(Intent::Advance);
        if commands.is_empty() {
            break;
        }
        app.drive(&mut runtime, commands).await;
        advanced += 1;
        print_frame(&app, &opts);
    }
    info!(
        advanced,
        status = %app.session().status(),
        step = app.session().current_step(),
        "run finished"
    );

    if opts.output == OutputFormat::Json {
        let out = serde_json::json!({
            "session": app.session(),
            "view": app.view(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?
        );
    }

    match app.session().error() {
        Some(err) => Err(err.to_string()),
        None => Ok(()),
    }
}

fn print_frame(app: &App, opts: &RunOptions) {
    if opts.output == OutputFormat::Text && !opts.quiet {
        println!("{}", render_text(&app.view()));
    }
}
