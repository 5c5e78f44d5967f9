//! Test signal synthesis.

use contracts::Sample;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Counter channels wrap at one million so their float values stay exactly
/// representable
pub const COUNTER_MODULUS: u64 = 1_000_000;

/// Per-tick sample synthesizer
pub trait SampleSynth: Send {
    /// Produce the sample for tick `tick`
    fn generate(&mut self, tick: u64) -> Sample;
}

/// Default test pattern
///
/// The first `device_channels` channels carry uniform random noise in
/// `[-1.5, 1.5)`; every remaining channel carries `tick % 1_000_000` so a
/// receiver can verify continuity and spot dropped samples.
#[derive(Debug)]
pub struct TestPatternSynth {
    channel_count: usize,
    device_channels: usize,
    rng: SmallRng,
}

impl TestPatternSynth {
    /// Create a synthesizer with an OS-seeded generator
    pub fn new(channel_count: usize, device_channels: usize) -> Self {
        Self {
            channel_count,
            device_channels: device_channels.min(channel_count),
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Create a deterministic synthesizer for reproducible runs
    pub fn seeded(channel_count: usize, device_channels: usize, seed: u64) -> Self {
        Self {
            channel_count,
            device_channels: device_channels.min(channel_count),
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl SampleSynth for TestPatternSynth {
    fn generate(&mut self, tick: u64) -> Sample {
        let counter = (tick % COUNTER_MODULUS) as f32;
        let values = (0..self.channel_count)
            .map(|i| {
                if i < self.device_channels {
                    self.rng.random_range(-1.5f32..1.5)
                } else {
                    counter
                }
            })
            .collect::<Vec<_>>();
        values.into()
    }
}
