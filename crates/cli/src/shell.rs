//! `lineage shell` -- interactive REPL over a live simulation.
//!
//! Lines from stdin become intents. Service calls run in the background,
//! so zoom, pan and panel commands keep working while a step is in flight.
//! Pointer commands go through the same region router a graphical front
//! end would use: a drag that starts on the panel header moves the panel,
//! one that starts on the background pans the view.

use std::sync::Arc;
use std::time::Duration;

use lineage_core::{render_text, Point, PointerEvent};
use lineage_service::SimulationService;
use lineage_sim::{App, Intent, Runtime, Status};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::OutputFormat;

/// What a line of input asked for.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Intent(Intent),
    View,
    Help,
    Quit,
}

fn parse_point(x: Option<&str>, y: Option<&str>) -> Result<Point, String> {
    let x = x.ok_or("missing x coordinate")?;
    let y = y.ok_or("missing y coordinate")?;
    let x: f64 = x.parse().map_err(|_| format!("invalid x coordinate '{}'", x))?;
    let y: f64 = y.parse().map_err(|_| format!("invalid y coordinate '{}'", y))?;
    Ok(Point::new(x, y))
}

fn parse(line: &str) -> Result<Input, String> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();

    let input = match (cmd.as_str(), arg) {
        ("next", _) | ("n", _) => Input::Intent(Intent::Advance),
        ("reset", _) => Input::Intent(Intent::Reset),
        ("dismiss", _) => Input::Intent(Intent::DismissError),
        ("back", _) => Input::Intent(Intent::Leave),
        ("zoom", Some("in")) => Input::Intent(Intent::ZoomIn),
        ("zoom", Some("out")) => Input::Intent(Intent::ZoomOut),
        ("zoom", Some("reset")) => Input::Intent(Intent::ZoomReset),
        ("zoom", _) => return Err("usage: zoom in|out|reset".into()),
        ("recenter", _) => Input::Intent(Intent::ResetPosition),
        ("panel", Some("toggle")) => Input::Intent(Intent::TogglePanel),
        ("panel", _) => return Err("usage: panel toggle".into()),
        ("down", x) => Input::Intent(Intent::Pointer(PointerEvent::Down(parse_point(
            x,
            parts.next(),
        )?))),
        ("move", x) => Input::Intent(Intent::Pointer(PointerEvent::Move(parse_point(
            x,
            parts.next(),
        )?))),
        ("up", None) => Input::Intent(Intent::Pointer(PointerEvent::Up(Point::ORIGIN))),
        ("up", x) => Input::Intent(Intent::Pointer(PointerEvent::Up(parse_point(
            x,
            parts.next(),
        )?))),
        ("leave", _) => Input::Intent(Intent::Pointer(PointerEvent::Leave)),
        ("view", _) => Input::View,
        ("help", _) | ("?", _) => Input::Help,
        ("quit", _) | ("exit", _) => Input::Quit,
        (other, _) => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(input)
}

fn print_help() {
    println!("  next                 process to the next step");
    println!("  reset                return the transaction to step 0");
    println!("  dismiss              clear a step or reset error");
    println!("  back                 leave the simulation (same as the Back control)");
    println!("  zoom in|out|reset    change the diagram scale");
    println!("  recenter             move the diagram back to the origin");
    println!("  panel toggle         minimize or expand the data panel");
    println!("  down X Y             press the pointer at (X, Y)");
    println!("  move X Y             move the pointer");
    println!("  up [X Y]             release the pointer");
    println!("  leave                pointer leaves the window");
    println!("  view                 print the full view");
    println!("  quit                 leave the simulation");
}

fn status_line(app: &App) -> String {
    let session = app.session();
    let step = session
        .steps()
        .get(session.current_step())
        .map(|s| s.name.as_str())
        .unwrap_or("-");
    let mut line = format!(
        "  [{}] step {}/{} {} | zoom {}% offset ({}, {}) | panel y={}{}",
        session.status(),
        session.current_step() + 1,
        session.steps().len().max(1),
        step,
        (app.viewport().scale() * 100.0).round(),
        app.viewport().offset().x,
        app.viewport().offset().y,
        app.panel().offset().y,
        if app.panel().is_minimized() {
            " (minimized)"
        } else {
            ""
        },
    );
    if let Some(err) = session.error() {
        line.push_str(&format!("\n  error: {}", err));
    }
    line
}

fn print_view(app: &App, output: OutputFormat) {
    match output {
        OutputFormat::Text => println!("{}", render_text(&app.view())),
        OutputFormat::Json => match serde_json::to_string_pretty(&app.view()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("error: {}", e),
        },
    }
}

pub(crate) async fn run_shell(
    service: Arc<dyn SimulationService>,
    settle: Duration,
    output: OutputFormat,
) -> Result<(), String> {
    let mut app = App::new(settle);
    let mut runtime: Runtime = Runtime::new(service);

    println!();
    println!("  Transaction Lineage Simulation");
    println!("  Commands: next, reset, dismiss, back, zoom, recenter, panel, down, move, up, leave, view, help, quit");
    println!();

    runtime.execute(app.dispatch(Intent::Start));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_status = app.session().status();

    loop {
        tokio::select! {
            Some(completion) = runtime.next_completion(), if !runtime.is_idle() => {
                let commands = app.complete(completion);
                runtime.execute(commands);
                let status = app.session().status();
                if status != last_status {
                    println!("{}", status_line(&app));
                    if status == Status::Completed {
                        println!("  Transaction processing complete!");
                    }
                    last_status = status;
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Piped input: let outstanding calls finish first.
                        while let Some(completion) = runtime.next_completion().await {
                            let commands = app.complete(completion);
                            runtime.execute(commands);
                        }
                        println!("{}", status_line(&app));
                        break;
                    }
                    Err(e) => return Err(format!("error reading input: {}", e)),
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match parse(trimmed) {
                    Ok(Input::Intent(intent)) => {
                        let commands = app.dispatch(intent);
                        runtime.execute(commands);
                        if let Some(routed) = app.last_routed().filter(|_| matches!(intent, Intent::Pointer(_))) {
                            println!("  pointer: {:?}", routed);
                        }
                        if app.session().is_torn_down() {
                            runtime.shutdown();
                            println!("  Left the simulation.");
                            break;
                        }
                        println!("{}", status_line(&app));
                        last_status = app.session().status();
                    }
                    Ok(Input::View) => print_view(&app, output),
                    Ok(Input::Help) => print_help(),
                    Ok(Input::Quit) => break,
                    Err(message) => eprintln!("  {}", message),
                }
            }
        }
    }

    app.dispatch(Intent::Leave);
    runtime.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_commands() {
        assert_eq!(parse("next"), Ok(Input::Intent(Intent::Advance)));
        assert_eq!(parse("RESET"), Ok(Input::Intent(Intent::Reset)));
        assert_eq!(parse("zoom out"), Ok(Input::Intent(Intent::ZoomOut)));
        assert_eq!(parse("panel toggle"), Ok(Input::Intent(Intent::TogglePanel)));
        assert_eq!(parse("back"), Ok(Input::Intent(Intent::Leave)));
        assert_eq!(parse("quit"), Ok(Input::Quit));
    }

    #[test]
    fn parses_pointer_commands() {
        assert_eq!(
            parse("down 10 20.5"),
            Ok(Input::Intent(Intent::Pointer(PointerEvent::Down(Point::new(
                10.0, 20.5
            )))))
        );
        assert_eq!(
            parse("up"),
            Ok(Input::Intent(Intent::Pointer(PointerEvent::Up(Point::ORIGIN))))
        );
        assert_eq!(
            parse("leave"),
            Ok(Input::Intent(Intent::Pointer(PointerEvent::Leave)))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse("zoom sideways").is_err());
        assert!(parse("down 1").is_err());
        assert!(parse("move a b").unwrap_err().contains("invalid x"));
        assert!(parse("fly").unwrap_err().contains("unknown command"));
    }
}
