//! `send`, `receive`, and `relay` command implementations.
//!
//! Without the `real-lsl` feature each invocation creates its own
//! in-process loopback hub, so `relay` is the command that demonstrates
//! the pair end to end; `send` and `receive` talk across processes only
//! on the real transport.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use contracts::RelayConfig;

use crate::cli::RunArgs;
use crate::driver;

/// Execute the `send` command
pub async fn run_send(args: &RunArgs) -> Result<()> {
    let Some(config) = prepare(args)? else {
        return Ok(());
    };

    let transport = build_transport();
    let stop = spawn_stop_signal(run_timeout(args));

    info!("Starting sender...");
    let stats = driver::run_sender(&transport, &config, args.max_ticks, stop)
        .await
        .context("Sender execution failed")?;

    println!("{}", stats.summary());
    info!("Stream relay finished");
    Ok(())
}

/// Execute the `receive` command
pub async fn run_receive(args: &RunArgs) -> Result<()> {
    let Some(config) = prepare(args)? else {
        return Ok(());
    };

    let transport = build_transport();
    let stop = spawn_stop_signal(run_timeout(args));

    info!("Starting receiver...");
    let stats = driver::run_receiver(&transport, &config, args.max_ticks, stop)
        .await
        .context("Receiver execution failed")?;

    println!("{}", stats.summary());
    info!("Stream relay finished");
    Ok(())
}

/// Execute the `relay` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    let Some(config) = prepare(args)? else {
        return Ok(());
    };

    let transport = build_transport();
    let stop = spawn_stop_signal(run_timeout(args));

    info!("Starting sender and receiver...");
    let (sender, receiver) = driver::run_relay(transport, &config, args.max_ticks, stop)
        .await
        .context("Relay execution failed")?;

    println!("{}", sender.summary());
    println!("{}", receiver.summary());
    info!("Stream relay finished");
    Ok(())
}

/// Load configuration and apply CLI overrides
///
/// Returns `None` for a dry run, which only validates and prints a summary.
fn prepare(args: &RunArgs) -> Result<Option<RelayConfig>> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(rate) = args.rate {
        if rate < 0.0 || !rate.is_finite() {
            anyhow::bail!("Invalid --rate override: {rate}");
        }
        info!(rate_hz = rate, "Overriding sampling rate from CLI");
        config.stream.rate_hz = rate;
    }

    info!(
        stream = %config.stream.name,
        stream_type = %config.stream.stream_type,
        channels = config.stream.channel_count,
        rate_hz = config.stream.rate_hz,
        consumers = config.consumers.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(None);
    }

    if args.metrics_port > 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    Ok(Some(config))
}

fn run_timeout(args: &RunArgs) -> Option<Duration> {
    (args.timeout > 0).then(|| Duration::from_secs(args.timeout))
}

#[cfg(feature = "real-lsl")]
fn build_transport() -> transport::LslTransport {
    transport::LslTransport::new()
}

#[cfg(not(feature = "real-lsl"))]
fn build_transport() -> transport::LoopbackTransport {
    transport::LoopbackTransport::new()
}

/// Flip the returned stop flag on Ctrl+C, SIGTERM, or timeout expiry
fn spawn_stop_signal(timeout: Option<Duration>) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let timed_out = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = shutdown_signal() => warn!("Received shutdown signal, stopping..."),
            _ = timed_out => info!("Run timeout reached, stopping..."),
        }
        let _ = tx.send(true);
    });
    rx
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &RelayConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Stream:");
    println!(
        "  Name: {} ({})",
        config.stream.name, config.stream.stream_type
    );
    println!(
        "  Channels: {} ({} device)",
        config.stream.channel_count,
        config.device_channels()
    );
    println!("  Rate: {} Hz", config.stream.rate_hz);

    println!("\nResolve:");
    println!(
        "  Query: {} = \"{}\"",
        config.resolve.property,
        config.resolve_value()
    );
    println!("  Timeout: {}s", config.resolve.timeout_secs);

    println!("\nPacing:");
    println!("  Failure threshold: {}", config.pacing.failure_threshold);
    println!("  Pull timeout: {} ms", config.pacing.pull_timeout_ms);

    if !config.consumers.is_empty() {
        println!("\nConsumers ({}):", config.consumers.len());
        for consumer in &config.consumers {
            println!("  - {} ({:?})", consumer.name, consumer.kind);
        }
    }

    println!();
}
