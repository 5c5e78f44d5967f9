//! Sample - one fixed-length vector of per-channel values

use serde::{Deserialize, Serialize};

/// One multi-channel sample
///
/// Length must equal the `channel_count` of the owning stream's descriptor;
/// the source adapter enforces this before any transport call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Per-channel values in channel order
    pub values: Vec<f32>,
}

impl Sample {
    /// Zero-filled sample with `channel_count` channels
    pub fn zeroed(channel_count: usize) -> Self {
        Self {
            values: vec![0.0; channel_count],
        }
    }

    /// Number of channels in this sample
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for an empty (zero-channel) sample
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f32>> for Sample {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// A pulled sample together with the collaborator's timestamp
///
/// The timestamp is the collaborator clock (seconds, f64); the relay never
/// generates timestamps of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSample {
    /// The sample values
    pub sample: Sample,

    /// Collaborator timestamp in seconds
    pub timestamp: f64,
}
