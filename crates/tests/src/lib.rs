//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 回环 e2e 测试（无需 LSL 网络）
//! - 故障注入与升级路径

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use contracts::{RelayError, Result, SampleConsumer, StreamDescriptor, TimedSample};
    use pacing::PacingLoop;
    use sample_sink::consumers::build_consumers;
    use sample_sink::{resolve_one, ConsumerHandle, SampleSink, SinkTick};
    use sample_source::{SampleSource, SourceTick, TestPatternSynth};
    use tokio::sync::watch;
    use transport::{LoopbackConfig, LoopbackTransport, StreamTransport};

    /// Consumer that keeps every delivered sample for later assertions
    struct CollectingConsumer {
        name: String,
        seen: Arc<Mutex<Vec<TimedSample>>>,
    }

    impl CollectingConsumer {
        fn new(name: &str) -> (Self, Arc<Mutex<Vec<TimedSample>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    name: name.to_string(),
                    seen: Arc::clone(&seen),
                },
                seen,
            )
        }
    }

    impl SampleConsumer for CollectingConsumer {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, sample: &TimedSample) -> Result<()> {
            self.seen.lock().unwrap().push(sample.clone());
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn never_stop() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        // Keep the sender alive for the whole test
        std::mem::forget(tx);
        rx
    }

    /// End-to-end: sender -> loopback hub -> receiver -> consumer
    ///
    /// 验证完整的数据流：
    /// 1. 发送端按固定节拍合成并推送样本
    /// 2. 接收端解析流、限时拉取并扇出
    /// 3. 计数器通道严格连续，设备通道保持在合成范围内
    #[tokio::test(start_paused = true)]
    async fn test_e2e_loopback_counter_continuity() {
        let hub = LoopbackTransport::new();
        let descriptor = StreamDescriptor::new("SimpleStream", "EEG", 10, 100.0);
        let outlet = hub.open_outlet(&descriptor, 0, 360).await.unwrap();

        // Connect the inlet before the sender starts so no sample is missed
        let resolved = resolve_one(&hub, "type", "EEG", Duration::from_millis(500))
            .await
            .unwrap();
        let inlet = hub.open_inlet(&resolved, 360).await.unwrap();

        let sender = tokio::spawn(async move {
            let source = SampleSource::new(outlet);
            let synth = TestPatternSynth::seeded(10, 8, 42);
            let mut action = SourceTick::new(source, synth);
            let report = PacingLoop::new("sender", Duration::from_millis(10), 5)
                .with_max_ticks(50)
                .run(&mut action, never_stop())
                .await?;
            Ok::<_, RelayError>((report, action.into_source().pushed()))
        });

        let (collector, seen) = CollectingConsumer::new("collect");
        let consumers = vec![ConsumerHandle::spawn(collector, 100)];
        let sink = SampleSink::new(inlet, Duration::from_millis(100), consumers);
        let mut action = SinkTick::new(sink);

        let report = PacingLoop::new("receiver", Duration::from_millis(10), 5)
            .with_max_ticks(50)
            .run(&mut action, never_stop())
            .await
            .unwrap();
        assert_eq!(report.ticks, 50);

        let (sender_report, pushed) = sender.await.unwrap().unwrap();
        assert_eq!(sender_report.ticks, 50);
        assert_eq!(pushed, 50);

        let sink = action.into_sink();
        assert_eq!(sink.pulled(), 50);
        sink.shutdown().await;

        let samples = seen.lock().unwrap();
        assert_eq!(samples.len(), 50);
        for (i, timed) in samples.iter().enumerate() {
            assert_eq!(timed.sample.len(), 10);
            // Channels beyond the device block carry the sample counter
            assert_eq!(timed.sample.values[8], i as f32);
            assert_eq!(timed.sample.values[9], i as f32);
            for value in &timed.sample.values[..8] {
                assert!((-1.5..1.5).contains(value), "device value out of range: {value}");
            }
        }
        // Timestamps are monotonically non-decreasing
        for pair in samples.windows(2) {
            assert!(pair[1].timestamp >= pair[0].timestamp);
        }
    }

    /// End-to-end with a configuration file driving every knob
    #[tokio::test(start_paused = true)]
    async fn test_e2e_config_driven_relay_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("capture.csv");

        let toml = format!(
            r#"
[stream]
name = "PositionStream"
stream_type = "Position"
channel_count = 2
rate_hz = 50.0
channel_labels = ["X", "Y"]
device_channels = 0

[resolve]
property = "name"
timeout_secs = 1.0

[pacing]
failure_threshold = 5
pull_timeout_ms = 200

[[consumers]]
name = "capture"
kind = "file"
queue_capacity = 32
params = {{ path = "{}" }}
"#,
            csv_path.display()
        );
        let config =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let hub = LoopbackTransport::new();
        let descriptor = config.descriptor();
        let interval = descriptor.sample_interval();
        let outlet = hub
            .open_outlet(&descriptor, config.outlet.chunk_size, config.outlet.max_buffered)
            .await
            .unwrap();

        let resolved = resolve_one(
            &hub,
            &config.resolve.property,
            &config.resolve_value(),
            Duration::from_secs_f64(config.resolve.timeout_secs),
        )
        .await
        .unwrap();
        assert_eq!(resolved.name, "PositionStream");
        let inlet = hub.open_inlet(&resolved, config.outlet.max_buffered).await.unwrap();

        let threshold = config.pacing.failure_threshold;
        let device_channels = config.device_channels();
        let sender = tokio::spawn(async move {
            let source = SampleSource::new(outlet);
            let synth = TestPatternSynth::seeded(descriptor.channel_count, device_channels, 7);
            let mut action = SourceTick::new(source, synth);
            PacingLoop::new("sender", interval, threshold)
                .with_max_ticks(10)
                .run(&mut action, never_stop())
                .await
        });

        let consumers = build_consumers(&config.consumers, &resolved).unwrap();
        let sink = SampleSink::new(
            inlet,
            Duration::from_millis(config.pacing.pull_timeout_ms),
            consumers,
        );
        let mut action = SinkTick::new(sink);
        PacingLoop::new("receiver", resolved.sample_interval(), threshold)
            .with_max_ticks(10)
            .run(&mut action, never_stop())
            .await
            .unwrap();
        sender.await.unwrap().unwrap();

        let reports = action.into_sink().shutdown().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "capture");
        assert_eq!(reports[0].1.writes, 10);
        assert_eq!(reports[0].1.dropped, 0);

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "timestamp,X,Y");
        // device_channels = 0: both channels carry the counter
        assert!(lines[1].ends_with(",0,0"));
        assert!(lines[10].ends_with(",9,9"));
    }

    /// Repeated transmit failures escalate instead of looping forever
    #[tokio::test(start_paused = true)]
    async fn test_e2e_injected_push_failures_escalate() {
        let hub = LoopbackTransport::with_config(LoopbackConfig {
            fail_push: vec!["SimpleStream".into()],
            fail_push_after: 3,
            ..Default::default()
        });
        let descriptor = StreamDescriptor::new("SimpleStream", "EEG", 4, 100.0);
        let outlet = hub.open_outlet(&descriptor, 0, 16).await.unwrap();

        let source = SampleSource::new(outlet);
        let synth = TestPatternSynth::seeded(4, 2, 3);
        let mut action = SourceTick::new(source, synth);

        let abort = PacingLoop::new("sender", Duration::from_millis(10), 3)
            .run(&mut action, never_stop())
            .await
            .unwrap_err();
        match abort.error {
            RelayError::RepeatedFailure { stream, count } => {
                assert_eq!(stream, "SimpleStream");
                assert_eq!(count, 3);
            }
            other => panic!("expected RepeatedFailure, got {other}"),
        }
        assert_eq!(abort.report.transient_failures, 3);
        // The three successful pushes before injection still count
        assert_eq!(action.into_source().pushed(), 3);
    }

    /// Dropped sender surfaces as a fatal closed stream on the receiver
    #[tokio::test(start_paused = true)]
    async fn test_e2e_closed_stream_is_fatal_for_receiver() {
        let hub = LoopbackTransport::new();
        let descriptor = StreamDescriptor::new("SimpleStream", "EEG", 2, 100.0);
        let outlet = hub.open_outlet(&descriptor, 0, 16).await.unwrap();
        let inlet = hub.open_inlet(&descriptor, 16).await.unwrap();
        drop(outlet);

        let sink = SampleSink::new(inlet, Duration::from_millis(100), Vec::new());
        let mut action = SinkTick::new(sink);
        let abort = PacingLoop::new("receiver", Duration::from_millis(10), 5)
            .run(&mut action, never_stop())
            .await
            .unwrap_err();
        assert!(matches!(abort.error, RelayError::StreamUnavailable { .. }));
    }

    /// Run statistics fold into a printable summary
    #[tokio::test(start_paused = true)]
    async fn test_e2e_summary_aggregation() {
        let hub = LoopbackTransport::new();
        let descriptor = StreamDescriptor::new("SimpleStream", "EEG", 4, 100.0);
        let outlet = hub.open_outlet(&descriptor, 0, 16).await.unwrap();

        let source = SampleSource::new(outlet);
        let synth = TestPatternSynth::seeded(4, 2, 11);
        let mut action = SourceTick::new(source, synth);

        let report = PacingLoop::new("sender", Duration::from_millis(10), 5)
            .with_max_ticks(25)
            .run(&mut action, never_stop())
            .await
            .unwrap();

        let mut stats = observability::TickStatsAggregator::new("sender");
        stats.record_report(report.ticks, report.transient_failures, &report.lag_ms);
        stats.record_samples(action.into_source().pushed());

        let summary = stats.summary().to_string();
        assert!(summary.contains("Relay Summary (sender)"));
        assert!(summary.contains("Ticks: 25"));
        assert!(summary.contains("Samples: 25"));
    }
}
