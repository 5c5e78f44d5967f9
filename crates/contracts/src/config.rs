//! RelayConfig - Config Loader output
//!
//! Everything the original demos hardcoded, externalized: stream identity and
//! channel layout, resolve query, pacing policy, outlet buffering, consumers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::StreamDescriptor;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration for one role invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Stream identity and channel layout
    pub stream: StreamSettings,

    /// Resolve query (receiver role)
    #[serde(default)]
    pub resolve: ResolveSettings,

    /// Pacing loop policy
    #[serde(default)]
    pub pacing: PacingSettings,

    /// Outlet buffering (sender role)
    #[serde(default)]
    pub outlet: OutletSettings,

    /// Consumers of pulled samples (receiver role)
    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,
}

/// Stream identity, channel layout, and synthesis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Stream name (e.g., "SimpleStream")
    pub name: String,

    /// Content type (e.g., "EEG")
    pub stream_type: String,

    /// Channels per sample
    pub channel_count: usize,

    /// Nominal sampling rate in Hz; 0 marks an irregular stream
    pub rate_hz: f64,

    /// Per-channel labels; a shorter list gets generated tails
    #[serde(default)]
    pub channel_labels: Vec<String>,

    /// Unique source ID; defaults to name + stream_type
    #[serde(default)]
    pub source_id: Option<String>,

    /// Number of leading channels filled with device data (bounded
    /// pseudo-random in the demo synthesizer); the rest carry the tick
    /// counter. Defaults to all channels.
    #[serde(default)]
    pub device_channels: Option<usize>,

    /// Channel unit annotation forwarded to the collaborator's metadata
    #[serde(default)]
    pub unit: Option<String>,
}

/// Resolve query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveSettings {
    /// Descriptor property to match ("name" or "type")
    #[serde(default = "default_resolve_property")]
    pub property: String,

    /// Value to match; defaults to the corresponding stream field
    #[serde(default)]
    pub value: Option<String>,

    /// Discovery timeout in seconds
    #[serde(default = "default_resolve_timeout_secs")]
    pub timeout_secs: f64,
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            property: default_resolve_property(),
            value: None,
            timeout_secs: default_resolve_timeout_secs(),
        }
    }
}

fn default_resolve_property() -> String {
    "type".to_string()
}

fn default_resolve_timeout_secs() -> f64 {
    5.0
}

/// Pacing loop policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PacingSettings {
    /// Consecutive transient tick failures before the loop escalates to fatal
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Per-pull timeout in milliseconds (receiver role)
    #[serde(default = "default_pull_timeout_ms")]
    pub pull_timeout_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            pull_timeout_ms: default_pull_timeout_ms(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_pull_timeout_ms() -> u64 {
    1000
}

/// Outlet buffering settings, forwarded opaquely to the collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutletSettings {
    /// Transmission chunk size; 0 lets the collaborator choose
    #[serde(default)]
    pub chunk_size: u32,

    /// Maximum buffered data in seconds (regular-rate streams)
    #[serde(default = "default_max_buffered")]
    pub max_buffered: u32,
}

impl Default for OutletSettings {
    fn default() -> Self {
        Self {
            chunk_size: 0,
            max_buffered: default_max_buffered(),
        }
    }
}

fn default_max_buffered() -> u32 {
    360
}

/// Consumer kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerKind {
    /// Structured tracing summary per sample
    Log,
    /// Channel values printed to stdout
    Console,
    /// CSV file append
    File,
}

/// One consumer definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Unique consumer name
    pub name: String,

    /// Consumer kind
    pub kind: ConsumerKind,

    /// Bounded queue capacity between the pull loop and this consumer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Kind-specific parameters (e.g., "path" for file consumers)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

impl RelayConfig {
    /// Build the stream descriptor this configuration publishes
    pub fn descriptor(&self) -> StreamDescriptor {
        let s = &self.stream;
        let mut desc = StreamDescriptor::new(
            s.name.clone(),
            s.stream_type.clone(),
            s.channel_count,
            s.rate_hz,
        );
        desc.channel_labels = s.channel_labels.clone();
        if let Some(ref id) = s.source_id {
            desc.source_id = id.clone();
        }
        if let Some(ref unit) = s.unit {
            desc.metadata.insert("unit".to_string(), unit.clone());
        }
        desc
    }

    /// Resolve query value, defaulting to the matching stream field
    pub fn resolve_value(&self) -> String {
        if let Some(ref value) = self.resolve.value {
            return value.clone();
        }
        match self.resolve.property.as_str() {
            "name" => self.stream.name.clone(),
            _ => self.stream.stream_type.clone(),
        }
    }

    /// Number of device channels, clamped to the channel count
    pub fn device_channels(&self) -> usize {
        self.stream
            .device_channels
            .unwrap_or(self.stream.channel_count)
            .min(self.stream.channel_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RelayConfig {
        RelayConfig {
            version: ConfigVersion::V1,
            stream: StreamSettings {
                name: "SimpleStream".into(),
                stream_type: "EEG".into(),
                channel_count: 8,
                rate_hz: 100.0,
                channel_labels: vec![],
                source_id: None,
                device_channels: None,
                unit: None,
            },
            resolve: ResolveSettings::default(),
            pacing: PacingSettings::default(),
            outlet: OutletSettings::default(),
            consumers: vec![],
        }
    }

    #[test]
    fn test_descriptor_from_config() {
        let cfg = minimal();
        let desc = cfg.descriptor();
        assert_eq!(desc.name, "SimpleStream");
        assert_eq!(desc.channel_count, 8);
        assert_eq!(desc.source_id, "SimpleStreamEEG");
    }

    #[test]
    fn test_resolve_value_defaults() {
        let mut cfg = minimal();
        assert_eq!(cfg.resolve_value(), "EEG");

        cfg.resolve.property = "name".into();
        assert_eq!(cfg.resolve_value(), "SimpleStream");

        cfg.resolve.value = Some("Other".into());
        assert_eq!(cfg.resolve_value(), "Other");
    }

    #[test]
    fn test_device_channels_clamped() {
        let mut cfg = minimal();
        assert_eq!(cfg.device_channels(), 8);

        cfg.stream.device_channels = Some(64);
        assert_eq!(cfg.device_channels(), 8);

        cfg.stream.device_channels = Some(2);
        assert_eq!(cfg.device_channels(), 2);
    }
}
