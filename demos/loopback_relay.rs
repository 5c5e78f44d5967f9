//! Loopback Relay Example
//!
//! Runs the sender and receiver roles in one process over the in-process
//! loopback hub. This example runs without requiring an LSL network.
//!
//! Run with: cargo run --bin loopback_relay
//! Optionally pass a config path: cargo run --bin loopback_relay -- relay.toml

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::RelayError;
use observability::TickStatsAggregator;
use pacing::PacingLoop;
use sample_sink::consumers::build_consumers;
use sample_sink::{resolve_one, SampleSink, SinkTick};
use sample_source::{SampleSource, SourceTick, TestPatternSynth};
use tokio::sync::watch;
use transport::{LoopbackTransport, StreamTransport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Loopback Relay Demo");

    // ==== Stage 1: Use default config or load from file ====
    let config = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading relay config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_test_config()
    };

    let descriptor = config.descriptor();
    let interval = descriptor.sample_interval();
    let threshold = config.pacing.failure_threshold;
    let target_samples = 100u64;

    let hub = LoopbackTransport::new();
    let (stop_tx, stop_rx) = watch::channel(false);

    // ==== Stage 2: Sender role ====
    tracing::info!(
        stream = %descriptor.name,
        channels = descriptor.channel_count,
        rate_hz = descriptor.nominal_rate_hz,
        "Opening outlet..."
    );
    let outlet = hub
        .open_outlet(
            &descriptor,
            config.outlet.chunk_size,
            config.outlet.max_buffered,
        )
        .await?;

    let channel_count = descriptor.channel_count;
    let device_channels = config.device_channels();
    let sender = tokio::spawn({
        let stop_rx = stop_rx.clone();
        async move {
            let source = SampleSource::new(outlet);
            let synth = TestPatternSynth::new(channel_count, device_channels);
            let mut action = SourceTick::new(source, synth);
            let report = PacingLoop::new("sender", interval, threshold)
                .with_max_ticks(target_samples)
                .run(&mut action, stop_rx)
                .await?;
            Ok::<_, RelayError>((report, action.into_source().pushed()))
        }
    });

    // ==== Stage 3: Receiver role ====
    tracing::info!("Resolving stream...");
    let resolved = resolve_one(
        &hub,
        &config.resolve.property,
        &config.resolve_value(),
        Duration::from_secs_f64(config.resolve.timeout_secs),
    )
    .await?;

    let inlet = hub.open_inlet(&resolved, config.outlet.max_buffered).await?;
    let consumers = build_consumers(&config.consumers, &resolved)?;
    let sink = SampleSink::new(
        inlet,
        Duration::from_millis(config.pacing.pull_timeout_ms),
        consumers,
    );
    let mut action = SinkTick::new(sink);

    tracing::info!(target = target_samples, "Running relay...");
    let receiver_report = PacingLoop::new("receiver", resolved.sample_interval(), threshold)
        .with_max_ticks(target_samples)
        .run(&mut action, stop_rx)
        .await?;

    // ==== Stage 4: Shutdown and summaries ====
    let _ = stop_tx.send(true);
    let (sender_report, pushed) = sender.await??;

    let mut sender_stats = TickStatsAggregator::new("sender");
    sender_stats.record_report(
        sender_report.ticks,
        sender_report.transient_failures,
        &sender_report.lag_ms,
    );
    sender_stats.record_samples(pushed);
    println!("{}", sender_stats.summary());

    let sink = action.into_sink();
    let mut receiver_stats = TickStatsAggregator::new("receiver");
    receiver_stats.record_report(
        receiver_report.ticks,
        receiver_report.transient_failures,
        &receiver_report.lag_ms,
    );
    receiver_stats.record_samples(sink.pulled());
    for (name, snapshot) in sink.shutdown().await {
        receiver_stats.record_consumer(
            &name,
            snapshot.writes,
            snapshot.write_failures,
            snapshot.dropped,
        );
    }
    println!("{}", receiver_stats.summary());

    tracing::info!("Loopback relay demo finished");
    Ok(())
}

fn create_test_config() -> contracts::RelayConfig {
    use contracts::*;
    use std::collections::HashMap;

    RelayConfig {
        version: ConfigVersion::V1,
        stream: StreamSettings {
            name: "SimpleStream".to_string(),
            stream_type: "EEG".to_string(),
            channel_count: 8,
            rate_hz: 100.0,
            channel_labels: vec![
                "C3".to_string(),
                "C4".to_string(),
                "Cz".to_string(),
                "FPz".to_string(),
                "POz".to_string(),
                "CPz".to_string(),
            ],
            source_id: None,
            device_channels: Some(6),
            unit: Some("microvolts".to_string()),
        },
        resolve: ResolveSettings {
            property: "type".to_string(),
            value: None,
            timeout_secs: 5.0,
        },
        pacing: PacingSettings::default(),
        outlet: OutletSettings::default(),
        consumers: vec![ConsumerConfig {
            name: "demo_log".to_string(),
            kind: ConsumerKind::Log,
            queue_capacity: 100,
            params: HashMap::new(),
        }],
    }
}
