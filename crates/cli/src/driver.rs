//! Role drivers shared by the `send`, `receive`, and `relay` commands.
//!
//! Each driver wires a configured transport handle into its adapter, runs
//! the pacing loop until stop or budget exhaustion, and folds the outcome
//! into a [`TickStatsAggregator`] for the end-of-run summary.

use std::time::Duration;

use contracts::{RelayConfig, RelayError, Result};
use observability::TickStatsAggregator;
use pacing::PacingLoop;
use sample_sink::consumers::build_consumers;
use sample_sink::{resolve_one, SampleSink, SinkTick};
use sample_source::{SampleSource, SourceTick, TestPatternSynth};
use tokio::sync::watch;
use tracing::{info, warn};
use transport::StreamTransport;

/// How long a receiver waits for a pending stop signal before deciding a
/// closed stream was a real failure rather than shutdown ordering.
const STOP_GRACE: Duration = Duration::from_millis(100);

/// Run the sender role to completion
///
/// Opens the outlet for the configured descriptor and pushes one
/// synthesized sample per tick at the stream's nominal rate.
pub async fn run_sender<T: StreamTransport>(
    transport: &T,
    config: &RelayConfig,
    max_ticks: u64,
    stop: watch::Receiver<bool>,
) -> Result<TickStatsAggregator> {
    let descriptor = config.descriptor();
    let interval = descriptor.sample_interval();

    let outlet = transport
        .open_outlet(
            &descriptor,
            config.outlet.chunk_size,
            config.outlet.max_buffered,
        )
        .await?;
    info!(
        stream = %descriptor.name,
        channels = descriptor.channel_count,
        rate_hz = descriptor.nominal_rate_hz,
        "outlet opened"
    );

    let source = SampleSource::new(outlet);
    let synth = TestPatternSynth::new(descriptor.channel_count, config.device_channels());
    let mut action = SourceTick::new(source, synth);

    let mut pacer = PacingLoop::new("sender", interval, config.pacing.failure_threshold);
    if max_ticks > 0 {
        pacer = pacer.with_max_ticks(max_ticks);
    }

    let result = pacer.run(&mut action, stop).await;
    let source = action.into_source();

    let mut stats = TickStatsAggregator::new("sender");
    stats.record_samples(source.pushed());
    match result {
        Ok(report) => {
            stats.record_report(report.ticks, report.transient_failures, &report.lag_ms);
            Ok(stats)
        }
        Err(abort) => {
            warn!(
                samples = source.pushed(),
                ticks = abort.report.ticks,
                "sender aborted"
            );
            Err(abort.error)
        }
    }
}

/// Run the receiver role to completion
///
/// Resolves exactly one matching stream (failing closed when none appears
/// within the discovery timeout), then pulls one sample per tick and fans
/// it out to the configured consumers.
pub async fn run_receiver<T: StreamTransport>(
    transport: &T,
    config: &RelayConfig,
    max_ticks: u64,
    mut stop: watch::Receiver<bool>,
) -> Result<TickStatsAggregator> {
    let timeout = Duration::from_secs_f64(config.resolve.timeout_secs);
    let descriptor = resolve_one(
        transport,
        &config.resolve.property,
        &config.resolve_value(),
        timeout,
    )
    .await?;

    let inlet = transport
        .open_inlet(&descriptor, config.outlet.max_buffered)
        .await?;
    let consumers = build_consumers(&config.consumers, &descriptor)?;
    let sink = SampleSink::new(
        inlet,
        Duration::from_millis(config.pacing.pull_timeout_ms),
        consumers,
    );
    let mut action = SinkTick::new(sink);

    let mut pacer = PacingLoop::new(
        "receiver",
        descriptor.sample_interval(),
        config.pacing.failure_threshold,
    );
    if max_ticks > 0 {
        pacer = pacer.with_max_ticks(max_ticks);
    }

    let result = pacer.run(&mut action, stop.clone()).await;
    // A stream that goes away while shutdown is in flight is a normal end
    // of run; the stop signal may land a moment after the peer closed. The
    // abort still carries the run's counts, so the summary stays truthful.
    let result = match result {
        Err(abort) if matches!(abort.error, RelayError::StreamUnavailable { .. }) => {
            if stop_requested(&mut stop, STOP_GRACE).await {
                info!(ticks = abort.report.ticks, "stream closed while stopping");
                Ok(abort.report)
            } else {
                Err(abort)
            }
        }
        other => other,
    };

    let sink = action.into_sink();
    let pulled = sink.pulled();
    let consumer_reports = sink.shutdown().await;

    let mut stats = TickStatsAggregator::new("receiver");
    stats.record_samples(pulled);
    for (name, snapshot) in &consumer_reports {
        stats.record_consumer(name, snapshot.writes, snapshot.write_failures, snapshot.dropped);
    }
    match result {
        Ok(report) => {
            stats.record_report(report.ticks, report.transient_failures, &report.lag_ms);
            Ok(stats)
        }
        Err(abort) => {
            warn!(
                samples = pulled,
                ticks = abort.report.ticks,
                "receiver aborted"
            );
            Err(abort.error)
        }
    }
}

/// Run both roles in one process over a shared transport
///
/// Whichever role finishes first, whether by fatal error or tick budget,
/// stops the other; the external stop signal stops both.
pub async fn run_relay<T>(
    transport: T,
    config: &RelayConfig,
    max_ticks: u64,
    stop: watch::Receiver<bool>,
) -> Result<(TickStatsAggregator, TickStatsAggregator)>
where
    T: StreamTransport + Clone + 'static,
    T::Outlet: 'static,
    T::Inlet: 'static,
{
    let (inner_tx, inner_rx) = watch::channel(false);
    forward_stop(stop, inner_tx.clone());

    let mut sender_task = {
        let transport = transport.clone();
        let config = config.clone();
        let stop = inner_rx.clone();
        tokio::spawn(async move { run_sender(&transport, &config, max_ticks, stop).await })
    };
    let mut receiver_task = {
        let config = config.clone();
        let stop = inner_rx;
        tokio::spawn(async move { run_receiver(&transport, &config, max_ticks, stop).await })
    };

    let (sender_res, receiver_res) = tokio::select! {
        s = &mut sender_task => {
            let _ = inner_tx.send(true);
            (s, receiver_task.await)
        }
        r = &mut receiver_task => {
            let _ = inner_tx.send(true);
            (sender_task.await, r)
        }
    };

    let sender_stats =
        sender_res.map_err(|e| RelayError::Other(format!("sender task failed: {e}")))??;
    let receiver_stats =
        receiver_res.map_err(|e| RelayError::Other(format!("receiver task failed: {e}")))??;
    Ok((sender_stats, receiver_stats))
}

/// Propagate an external stop signal into a role-local one
fn forward_stop(mut external: watch::Receiver<bool>, tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        loop {
            if *external.borrow_and_update() {
                break;
            }
            // A dropped sender counts as a stop request
            if external.changed().await.is_err() {
                break;
            }
        }
        let _ = tx.send(true);
    });
}

/// Whether stop has been requested, waiting up to `grace` for it to land
async fn stop_requested(stop: &mut watch::Receiver<bool>, grace: Duration) -> bool {
    if *stop.borrow_and_update() {
        return true;
    }
    tokio::time::timeout(grace, async {
        loop {
            if stop.changed().await.is_err() {
                return true;
            }
            if *stop.borrow_and_update() {
                return true;
            }
        }
    })
    .await
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use contracts::{
        ConfigVersion, OutletSettings, PacingSettings, ResolveSettings, StreamSettings,
    };
    use transport::LoopbackTransport;

    use super::*;

    fn test_config() -> RelayConfig {
        RelayConfig {
            version: ConfigVersion::V1,
            stream: StreamSettings {
                name: "SimpleStream".into(),
                stream_type: "EEG".into(),
                channel_count: 4,
                rate_hz: 100.0,
                channel_labels: vec![],
                source_id: None,
                device_channels: Some(2),
                unit: None,
            },
            resolve: ResolveSettings {
                timeout_secs: 1.0,
                ..Default::default()
            },
            pacing: PacingSettings::default(),
            outlet: OutletSettings::default(),
            consumers: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_runs_both_roles_over_loopback() {
        let hub = LoopbackTransport::new();
        let (_tx, rx) = watch::channel(false);

        let (sender, receiver) = run_relay(hub, &test_config(), 20, rx).await.unwrap();

        assert_eq!(sender.role, "sender");
        assert_eq!(receiver.role, "receiver");
        assert!(sender.ticks >= 1);
        assert!(receiver.ticks >= 1);
        assert!(sender.samples <= 20);
        assert!(receiver.samples <= sender.samples);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_stops_on_external_signal() {
        let hub = LoopbackTransport::new();
        let (tx, rx) = watch::channel(false);

        let config = test_config();
        let relay = run_relay(hub, &config, 0, rx);
        let signal = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            tx.send(true).unwrap();
        };

        let (result, ()) = tokio::join!(relay, signal);
        let (sender, receiver) = result.unwrap();
        // ~20 ticks at 100 Hz before the signal landed
        assert!(sender.ticks >= 10);
        assert!(receiver.samples >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receiver_fails_fast_when_no_stream_matches() {
        let hub = LoopbackTransport::new();
        let mut config = test_config();
        config.resolve.timeout_secs = 0.2;

        let (_tx, rx) = watch::channel(false);
        let err = run_receiver(&hub, &config, 10, rx).await.unwrap_err();
        assert!(matches!(err, RelayError::StreamNotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receiver_counts_survive_graceful_close() {
        let hub = LoopbackTransport::new();
        let config = test_config();
        let (tx, rx) = watch::channel(false);

        let receiver_task = tokio::spawn({
            let hub = hub.clone();
            let config = config.clone();
            let stop = rx.clone();
            async move { run_receiver(&hub, &config, 0, stop).await }
        });

        let sender = run_sender(&hub, &config, 30, rx).await.unwrap();
        assert_eq!(sender.ticks, 30);

        // The outlet dropped with the sender; the stop signal lands a moment
        // later, inside the receiver's grace window.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let receiver = receiver_task.await.unwrap().unwrap();
        // The healthy run's counts are kept, not zeroed by the closed stream
        assert!(receiver.ticks >= 10);
        assert!(receiver.samples >= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_alone_completes_its_budget() {
        let hub = LoopbackTransport::new();
        let (_tx, rx) = watch::channel(false);

        let stats = run_sender(&hub, &test_config(), 5, rx).await.unwrap();
        assert_eq!(stats.ticks, 5);
        assert_eq!(stats.samples, 5);
        assert_eq!(stats.transient_failures, 0);
    }
}
