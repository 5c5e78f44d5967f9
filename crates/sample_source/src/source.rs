//! Outlet adapter.

use contracts::{RelayError, Result, Sample, StreamDescriptor};
use pacing::TickAction;
use tracing::{debug, instrument};
use transport::OutletHandle;

use crate::synth::SampleSynth;

/// Sending-side stream adapter
///
/// Owns the outlet handle exclusively. Every sample is shape-checked
/// against the descriptor before the transport sees it; a mismatch is a
/// fatal local error, never a transmit attempt.
pub struct SampleSource<O: OutletHandle> {
    outlet: O,
    pushed: u64,
}

impl<O: OutletHandle> SampleSource<O> {
    /// Wrap an opened outlet
    pub fn new(outlet: O) -> Self {
        Self { outlet, pushed: 0 }
    }

    /// Descriptor the outlet was opened with
    pub fn descriptor(&self) -> &StreamDescriptor {
        self.outlet.descriptor()
    }

    /// Samples successfully handed to the transport
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Validate and push one sample
    #[instrument(name = "source_emit", level = "trace", skip(self, sample), fields(stream = %self.outlet.descriptor().name))]
    pub async fn emit(&mut self, sample: &Sample) -> Result<()> {
        let descriptor = self.outlet.descriptor();
        if sample.len() != descriptor.channel_count {
            return Err(RelayError::InvalidSampleShape {
                stream: descriptor.name.clone(),
                expected: descriptor.channel_count,
                actual: sample.len(),
            });
        }

        self.outlet.push(sample).await?;
        self.pushed += 1;
        metrics::counter!(
            "stream_relay_samples_pushed_total",
            "stream" => self.outlet.descriptor().name.clone()
        )
        .increment(1);
        Ok(())
    }
}

/// Per-tick work of the sender role: synthesize one sample, emit it
pub struct SourceTick<O: OutletHandle, S: SampleSynth> {
    source: SampleSource<O>,
    synth: S,
}

impl<O: OutletHandle, S: SampleSynth> SourceTick<O, S> {
    /// Build the tick action from an adapter and a synthesizer
    pub fn new(source: SampleSource<O>, synth: S) -> Self {
        Self { source, synth }
    }

    /// Consume the action, returning the adapter for final accounting
    pub fn into_source(self) -> SampleSource<O> {
        self.source
    }
}

impl<O: OutletHandle, S: SampleSynth> TickAction for SourceTick<O, S> {
    fn stream(&self) -> &str {
        &self.source.outlet.descriptor().name
    }

    async fn tick(&mut self, tick: u64) -> Result<()> {
        // The pattern counter is the number of samples already emitted, so
        // it starts at 0 and is unaffected by swallowed tick failures.
        let sample = self.synth.generate(self.source.pushed());
        self.source.emit(&sample).await?;
        debug!(tick, "sample emitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use contracts::StreamDescriptor;
    use pacing::PacingLoop;
    use tokio::sync::watch;
    use transport::{InletHandle, LoopbackTransport, StreamTransport};

    use super::*;
    use crate::TestPatternSynth;

    fn descriptor() -> StreamDescriptor {
        StreamDescriptor::new("SimpleStream", "EEG", 10, 100.0)
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_local_and_fatal() {
        let hub = LoopbackTransport::new();
        let outlet = hub.open_outlet(&descriptor(), 0, 16).await.unwrap();
        let mut source = SampleSource::new(outlet);

        let err = source.emit(&Sample::zeroed(7)).await.unwrap_err();
        match err {
            RelayError::InvalidSampleShape {
                expected, actual, ..
            } => {
                assert_eq!(expected, 10);
                assert_eq!(actual, 7);
            }
            other => panic!("expected InvalidSampleShape, got {other}"),
        }
        assert!(!err.is_transient());
        assert_eq!(source.pushed(), 0);
    }

    #[tokio::test]
    async fn test_emit_counts_pushed_samples() {
        let hub = LoopbackTransport::new();
        let outlet = hub.open_outlet(&descriptor(), 0, 16).await.unwrap();
        let mut source = SampleSource::new(outlet);

        source.emit(&Sample::zeroed(10)).await.unwrap();
        source.emit(&Sample::zeroed(10)).await.unwrap();
        assert_eq!(source.pushed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_tick_streams_counter_pattern() {
        let hub = LoopbackTransport::new();
        let descriptor = descriptor();
        let outlet = hub.open_outlet(&descriptor, 0, 16).await.unwrap();
        let mut inlet = hub.open_inlet(&descriptor, 16).await.unwrap();

        let source = SampleSource::new(outlet);
        let synth = TestPatternSynth::seeded(10, 8, 1);
        let mut action = SourceTick::new(source, synth);

        let (_stop_tx, stop_rx) = watch::channel(false);
        let pacer = PacingLoop::new("sender", Duration::from_millis(10), 5).with_max_ticks(5);
        let report = pacer.run(&mut action, stop_rx).await.unwrap();
        assert_eq!(report.ticks, 5);
        assert_eq!(action.into_source().pushed(), 5);

        for expected in 0..5u64 {
            let timed = inlet.pull(Duration::from_millis(50)).await.unwrap();
            assert_eq!(timed.sample.len(), 10);
            assert_eq!(timed.sample.values[8], expected as f32);
            assert_eq!(timed.sample.values[9], expected as f32);
        }
    }
}
