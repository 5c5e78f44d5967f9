//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stream Relay - fixed-rate sample sender/receiver demo pair
#[derive(Parser, Debug)]
#[command(
    name = "stream-relay",
    author,
    version,
    about = "Fixed-rate sample relay over a streaming transport",
    long_about = "A demo pair for streaming multichannel samples at a fixed rate.\n\n\
                  The sender publishes a stream and pushes one synthesized sample \n\
                  per tick; the receiver resolves the stream, pulls samples, and \n\
                  fans them out to configured consumers."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STREAM_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STREAM_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish a stream and push synthesized samples at the configured rate
    Send(RunArgs),

    /// Resolve a stream, pull samples, and fan them out to consumers
    Receive(RunArgs),

    /// Run both roles in one process over a shared transport
    Relay(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments shared by the `send`, `receive`, and `relay` commands
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "STREAM_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Maximum number of ticks per role (0 = unlimited)
    #[arg(long, default_value = "0", env = "STREAM_RELAY_MAX_TICKS")]
    pub max_ticks: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STREAM_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Override the configured sampling rate in Hz
    #[arg(long)]
    pub rate: Option<f64>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", env = "STREAM_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-channel labels
    #[arg(long)]
    pub channels: bool,

    /// Show consumer configuration
    #[arg(long)]
    pub consumers: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
