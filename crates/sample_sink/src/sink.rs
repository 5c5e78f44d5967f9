//! Inlet adapter and its tick action.

use std::time::Duration;

use contracts::{RelayError, Result, StreamDescriptor};
use pacing::TickAction;
use tracing::{instrument, trace};
use transport::InletHandle;

use crate::handle::ConsumerHandle;
use crate::metrics::ConsumerSnapshot;

/// Receiving-side stream adapter
///
/// Owns the inlet handle exclusively. Each poll pulls exactly one sample,
/// bounded by the configured timeout, checks its shape against the
/// descriptor, then fans it out to every consumer without blocking.
pub struct SampleSink<I: InletHandle> {
    inlet: I,
    pull_timeout: Duration,
    consumers: Vec<ConsumerHandle>,
    pulled: u64,
}

impl<I: InletHandle> SampleSink<I> {
    /// Wrap an opened inlet and its consumer fleet
    pub fn new(inlet: I, pull_timeout: Duration, consumers: Vec<ConsumerHandle>) -> Self {
        Self {
            inlet,
            pull_timeout,
            consumers,
            pulled: 0,
        }
    }

    /// Descriptor the inlet was opened on
    pub fn descriptor(&self) -> &StreamDescriptor {
        self.inlet.descriptor()
    }

    /// Samples pulled from the transport
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    /// Pull one sample and fan it out
    #[instrument(name = "sink_poll", level = "trace", skip(self), fields(stream = %self.inlet.descriptor().name))]
    pub async fn poll(&mut self) -> Result<()> {
        let timed = self.inlet.pull(self.pull_timeout).await?;

        let expected = self.inlet.descriptor().channel_count;
        if timed.sample.len() != expected {
            return Err(RelayError::InvalidSampleShape {
                stream: self.inlet.descriptor().name.clone(),
                expected,
                actual: timed.sample.len(),
            });
        }

        self.pulled += 1;
        metrics::counter!(
            "stream_relay_samples_pulled_total",
            "stream" => self.inlet.descriptor().name.clone()
        )
        .increment(1);
        trace!(timestamp = timed.timestamp, "sample pulled");

        match self.consumers.as_slice() {
            [] => {}
            [only] => {
                only.try_send(timed);
            }
            many => {
                for consumer in many {
                    consumer.try_send(timed.clone());
                }
            }
        }
        Ok(())
    }

    /// Shut down all consumer workers, draining their queues
    pub async fn shutdown(self) -> Vec<(String, ConsumerSnapshot)> {
        let mut reports = Vec::with_capacity(self.consumers.len());
        for consumer in self.consumers {
            reports.push(consumer.shutdown().await);
        }
        reports
    }
}

/// Per-tick work of the receiver role: pull one sample, forward it
pub struct SinkTick<I: InletHandle> {
    sink: SampleSink<I>,
}

impl<I: InletHandle> SinkTick<I> {
    pub fn new(sink: SampleSink<I>) -> Self {
        Self { sink }
    }

    /// Consume the action, returning the adapter for shutdown and accounting
    pub fn into_sink(self) -> SampleSink<I> {
        self.sink
    }
}

impl<I: InletHandle> TickAction for SinkTick<I> {
    fn stream(&self) -> &str {
        &self.sink.inlet.descriptor().name
    }

    async fn tick(&mut self, _tick: u64) -> Result<()> {
        self.sink.poll().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use contracts::{Sample, SampleConsumer, TimedSample};
    use pacing::PacingLoop;
    use tokio::sync::watch;
    use transport::{LoopbackTransport, OutletHandle, StreamTransport};

    use super::*;

    struct CountingConsumer {
        name: String,
        seen: Arc<AtomicU64>,
    }

    impl SampleConsumer for CountingConsumer {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _sample: &TimedSample) -> Result<()> {
            self.seen.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn counting(name: &str) -> (CountingConsumer, Arc<AtomicU64>) {
        let seen = Arc::new(AtomicU64::new(0));
        (
            CountingConsumer {
                name: name.to_string(),
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }

    fn descriptor() -> StreamDescriptor {
        StreamDescriptor::new("SimpleStream", "EEG", 2, 100.0)
    }

    #[tokio::test]
    async fn test_poll_fans_out_to_all_consumers() {
        let hub = LoopbackTransport::new();
        let descriptor = descriptor();
        let mut outlet = hub.open_outlet(&descriptor, 0, 16).await.unwrap();
        let inlet = hub.open_inlet(&descriptor, 16).await.unwrap();

        let (a, seen_a) = counting("a");
        let (b, seen_b) = counting("b");
        let consumers = vec![ConsumerHandle::spawn(a, 10), ConsumerHandle::spawn(b, 10)];
        let mut sink = SampleSink::new(inlet, Duration::from_millis(100), consumers);

        outlet.push(&Sample::zeroed(2)).await.unwrap();
        outlet.push(&Sample::zeroed(2)).await.unwrap();
        sink.poll().await.unwrap();
        sink.poll().await.unwrap();
        assert_eq!(sink.pulled(), 2);

        let reports = sink.shutdown().await;
        assert_eq!(seen_a.load(Ordering::Relaxed), 2);
        assert_eq!(seen_b.load(Ordering::Relaxed), 2);
        assert!(reports.iter().all(|(_, s)| s.writes == 2 && s.dropped == 0));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_fatal() {
        let hub = LoopbackTransport::new();
        let descriptor = descriptor();
        let mut outlet = hub.open_outlet(&descriptor, 0, 16).await.unwrap();
        let inlet = hub.open_inlet(&descriptor, 16).await.unwrap();
        let mut sink = SampleSink::new(inlet, Duration::from_millis(100), Vec::new());

        // A sender that lies about its shape
        outlet.push(&Sample::zeroed(5)).await.unwrap();
        let err = sink.poll().await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidSampleShape { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_tick_under_pacing_swallows_no_data() {
        let hub = LoopbackTransport::new();
        let descriptor = descriptor();
        let _outlet = hub.open_outlet(&descriptor, 0, 16).await.unwrap();
        let inlet = hub.open_inlet(&descriptor, 16).await.unwrap();

        let sink = SampleSink::new(inlet, Duration::from_millis(5), Vec::new());
        let mut action = SinkTick::new(sink);

        // Nothing is ever pushed: every tick times out as transient NoData
        let (_tx, rx) = watch::channel(false);
        let pacer = PacingLoop::new("receiver", Duration::from_millis(10), 3);
        let abort = pacer.run(&mut action, rx).await.unwrap_err();
        assert!(matches!(
            abort.error,
            RelayError::RepeatedFailure { count: 3, .. }
        ));
    }
}
