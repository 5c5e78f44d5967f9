//! LSL Relay Example (requires the `real-lsl` feature)
//!
//! Publishes a stream on the real LSL network and receives it back in the
//! same process. Other LSL tools on the local network can resolve and
//! record the stream while this runs.
//!
//! Run with: cargo run --bin lsl_relay --features real-lsl
//! Stop with Ctrl+C.

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::RelayError;
use observability::TickStatsAggregator;
use pacing::PacingLoop;
use sample_sink::consumers::build_consumers;
use sample_sink::{resolve_one, SampleSink, SinkTick};
use sample_source::{SampleSource, SourceTick, TestPatternSynth};
use tokio::sync::watch;
use transport::{LslTransport, StreamTransport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting LSL Relay Demo");

    let config = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading relay config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        create_test_config()
    };

    let descriptor = config.descriptor();
    let interval = descriptor.sample_interval();
    let threshold = config.pacing.failure_threshold;

    let transport = LslTransport::new();
    let (stop_tx, stop_rx) = watch::channel(false);

    // Flip the stop flag on Ctrl+C
    tokio::spawn({
        let stop_tx = stop_tx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received, stopping...");
                let _ = stop_tx.send(true);
            }
        }
    });

    // ==== Sender role ====
    tracing::info!(
        stream = %descriptor.name,
        channels = descriptor.channel_count,
        rate_hz = descriptor.nominal_rate_hz,
        "Opening LSL outlet..."
    );
    let outlet = transport
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
                .run(&mut action, stop_rx)
                .await?;
            Ok::<_, RelayError>((report, action.into_source().pushed()))
        }
    });

    // ==== Receiver role ====
    tracing::info!(
        property = %config.resolve.property,
        value = %config.resolve_value(),
        "Resolving stream on the LSL network..."
    );
    let resolved = resolve_one(
        &transport,
        &config.resolve.property,
        &config.resolve_value(),
        Duration::from_secs_f64(config.resolve.timeout_secs),
    )
    .await?;

    let inlet = transport
        .open_inlet(&resolved, config.outlet.max_buffered)
        .await?;
    let consumers = build_consumers(&config.consumers, &resolved)?;
    let sink = SampleSink::new(
        inlet,
        Duration::from_millis(config.pacing.pull_timeout_ms),
        consumers,
    );
    let mut action = SinkTick::new(sink);

    tracing::info!("Relaying until Ctrl+C...");
    let receiver_report = PacingLoop::new("receiver", resolved.sample_interval(), threshold)
        .run(&mut action, stop_rx)
        .await?;

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

    tracing::info!("LSL relay demo finished");
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
            channel_labels: vec![],
            source_id: None,
            device_channels: None,
            unit: Some("microvolts".to_string()),
        },
        resolve: ResolveSettings::default(),
        pacing: PacingSettings::default(),
        outlet: OutletSettings::default(),
        consumers: vec![ConsumerConfig {
            name: "demo_console".to_string(),
            kind: ConsumerKind::Console,
            queue_capacity: 100,
            params: HashMap::new(),
        }],
    }
}
