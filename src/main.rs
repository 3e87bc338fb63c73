//! Panel daemon entry point.
//!
//! Parses arguments, initializes debug logging, loads configuration and
//! hands off to the supervisor, which owns the runtime and the background
//! tasks.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use trafficmask_panel::{cli::Cli, config::PanelConfig, supervisor};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;
    debug!("Parsed CLI arguments: {:?}", cli);

    let config =
        PanelConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Loaded configuration: {:?}", config);

    supervisor::run(&cli, config)
}

/// Initialize the tracing subscriber for debug/development logging.
///
/// # Verbosity Levels
/// - 0 (default): Only warnings and errors
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
