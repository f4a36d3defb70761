//! Tracing subscriber setup. Logs go to stderr so stdout stays clean for
//! rendered views and JSON output.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Install the global subscriber. `RUST_LOG` wins over the default filter.
pub(crate) fn init(format: LogFormat, quiet: bool) {
    let default = if quiet { "lineage=warn" } else { "lineage=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second init (tests) is harmless.
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
