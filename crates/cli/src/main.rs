mod config;
mod logging;
mod run;
mod serve;
mod shell;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use lineage_service::{HttpSimulationService, SimulationService, TradePipeline};
use tracing::debug;

use crate::config::Config;
use crate::logging::LogFormat;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Transaction lineage simulator.
#[derive(Parser)]
#[command(name = "lineage", version, about = "Transaction lineage simulator")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log format on stderr (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Where simulation calls go.
#[derive(clap::Args, Debug, Clone)]
struct ServiceArgs {
    /// Base URL of the simulation service
    #[arg(long, conflicts_with = "offline")]
    service_url: Option<String>,

    /// Use the built-in trade pipeline instead of a remote service
    #[arg(long)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reference simulation backend
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Requests per minute per client IP
        #[arg(long)]
        rate_limit: Option<u64>,
    },

    /// List the pipeline steps
    Steps {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Run a transaction through the pipeline without interaction
    Run {
        #[command(flatten)]
        service: ServiceArgs,
        /// Stop after this many steps
        #[arg(long)]
        steps: Option<usize>,
        /// Milliseconds the processing flag is held after each step
        #[arg(long)]
        settle_ms: Option<u64>,
    },

    /// Start an interactive simulation shell
    Shell {
        #[command(flatten)]
        service: ServiceArgs,
        /// Milliseconds the processing flag is held after each step
        #[arg(long)]
        settle_ms: Option<u64>,
    },
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", message);
    process::exit(1);
}

fn build_service(config: &Config, args: &ServiceArgs) -> Arc<dyn SimulationService> {
    if args.offline {
        debug!("using the built-in trade pipeline");
        return Arc::new(TradePipeline::new());
    }
    let url = args
        .service_url
        .clone()
        .unwrap_or_else(|| config.service.base_url.clone());
    debug!(%url, "using remote service");
    Arc::new(HttpSimulationService::new(&url).with_timeout(config.timeout()))
}

fn tokio_runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => fail(format!("failed to create tokio runtime: {}", e)),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_format, cli.quiet);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => fail(e),
    };

    match cli.command {
        Commands::Serve { port, rate_limit } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(limit) = rate_limit {
                config.server.rate_limit = limit;
            }
            let service: Arc<dyn SimulationService> = Arc::new(TradePipeline::new());
            let rt = tokio_runtime();
            if let Err(e) = rt.block_on(serve::start_server(
                config.server.port,
                config.server.rate_limit,
                service,
            )) {
                fail(format!("server error: {}", e));
            }
        }
        Commands::Steps { service } => {
            let service = build_service(&config, &service);
            let steps = match tokio_runtime().block_on(service.fetch_steps()) {
                Ok(steps) => steps,
                Err(e) => fail(e),
            };
            match cli.output {
                OutputFormat::Json => match serde_json::to_string_pretty(&steps) {
                    Ok(json) => println!("{}", json),
                    Err(e) => fail(e),
                },
                OutputFormat::Text => {
                    for (i, step) in steps.iter().enumerate() {
                        println!("{}. {} ({})", i + 1, step.name, step.department);
                        if !cli.quiet && !step.description.is_empty() {
                            println!("   {}", step.description);
                        }
                    }
                }
            }
        }
        Commands::Run {
            service,
            steps,
            settle_ms,
        } => {
            if let Some(ms) = settle_ms {
                config.simulation.settle_ms = ms;
            }
            let service = build_service(&config, &service);
            let opts = run::RunOptions {
                settle: config.settle(),
                max_steps: steps,
                output: cli.output,
                quiet: cli.quiet,
            };
            if let Err(e) = tokio_runtime().block_on(run::run(service, opts)) {
                fail(e);
            }
        }
        Commands::Shell { service, settle_ms } => {
            if let Some(ms) = settle_ms {
                config.simulation.settle_ms = ms;
            }
            let service = build_service(&config, &service);
            if let Err(e) = tokio_runtime().block_on(shell::run_shell(
                service,
                config.settle(),
                cli.output,
            )) {
                fail(e);
            }
        }
    }
}
