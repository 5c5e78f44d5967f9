//! StreamDescriptor - immutable description of a stream
//!
//! Name, type, channel layout, and nominal rate of a stream as published
//! to (or resolved from) the transport collaborator.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rate substituted when a descriptor declares an irregular (<= 0) rate
/// but a pacing interval is still needed.
pub const DEFAULT_RATE_HZ: f64 = 100.0;

/// Stream descriptor
///
/// Immutable once a handle is opened on it. The collaborator carries its
/// own richer XML description; this is the subset the relay needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Stream name (e.g., "SimpleStream")
    pub name: String,

    /// Content type (e.g., "EEG")
    pub stream_type: String,

    /// Number of channels per sample, > 0
    pub channel_count: usize,

    /// Nominal sampling rate in Hz; 0 marks an irregular-rate stream
    pub nominal_rate_hz: f64,

    /// Per-channel labels; entries beyond the list fall back to generated names
    #[serde(default)]
    pub channel_labels: Vec<String>,

    /// Unique source identifier for collision-free re-registration
    #[serde(default)]
    pub source_id: String,

    /// Opaque key/value annotations (manufacturer, unit, ...) forwarded to
    /// the collaborator's metadata tree, never interpreted locally
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl StreamDescriptor {
    /// Create a descriptor with generated source_id and no metadata
    pub fn new(
        name: impl Into<String>,
        stream_type: impl Into<String>,
        channel_count: usize,
        nominal_rate_hz: f64,
    ) -> Self {
        let name = name.into();
        let stream_type = stream_type.into();
        let source_id = format!("{name}{stream_type}");
        Self {
            name,
            stream_type,
            channel_count,
            nominal_rate_hz,
            channel_labels: Vec::new(),
            source_id,
            metadata: BTreeMap::new(),
        }
    }

    /// Label for channel `index`
    ///
    /// Falls back to a generated `Chan-{index+1}` label when the configured
    /// list is shorter than `channel_count`.
    pub fn label(&self, index: usize) -> String {
        self.channel_labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Chan-{}", index + 1))
    }

    /// All channel labels, generated entries included
    pub fn resolved_labels(&self) -> Vec<String> {
        (0..self.channel_count).map(|i| self.label(i)).collect()
    }

    /// Per-tick interval derived from the nominal rate
    ///
    /// A rate <= 0 (irregular stream) substitutes [`DEFAULT_RATE_HZ`] so the
    /// pacing loop always has a positive interval.
    pub fn sample_interval(&self) -> Duration {
        let rate = if self.nominal_rate_hz > 0.0 {
            self.nominal_rate_hz
        } else {
            DEFAULT_RATE_HZ
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_fallback() {
        let mut desc = StreamDescriptor::new("s", "EEG", 4, 100.0);
        desc.channel_labels = vec!["C3".into(), "C4".into()];

        assert_eq!(desc.label(0), "C3");
        assert_eq!(desc.label(1), "C4");
        assert_eq!(desc.label(2), "Chan-3");
        assert_eq!(desc.label(3), "Chan-4");
        assert_eq!(desc.resolved_labels().len(), 4);
    }

    #[test]
    fn test_sample_interval() {
        let desc = StreamDescriptor::new("s", "EEG", 8, 100.0);
        assert_eq!(desc.sample_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_sample_interval_irregular_rate() {
        let desc = StreamDescriptor::new("s", "Markers", 1, 0.0);
        // Irregular streams pace at the conservative default
        assert_eq!(
            desc.sample_interval(),
            Duration::from_secs_f64(1.0 / DEFAULT_RATE_HZ)
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let mut desc = StreamDescriptor::new("SimpleStream", "EEG", 2, 10.0);
        desc.metadata.insert("manufacturer".into(), "LSL".into());

        let json = serde_json::to_string(&desc).unwrap();
        let parsed: StreamDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, desc);
    }
}
