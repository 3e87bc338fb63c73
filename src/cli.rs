//! Command-line interface for the panel daemon.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Control-plane panel for a supervised tunnel process.
///
/// Runs the realtime WebSocket broadcaster and the command bridge to the
/// tunnel's control socket. The HTTP API is served by the embedding layer.
#[derive(Parser, Debug)]
#[command(name = "trafficmask-panel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the panel config file.
    ///
    /// When omitted, built-in defaults are used.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the realtime WebSocket listen address.
    #[arg(long = "listen", value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Override the tunnel control socket path.
    #[arg(long = "tunnel-socket", value_name = "PATH")]
    pub tunnel_socket: Option<PathBuf>,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
