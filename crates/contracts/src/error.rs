//! Unified error taxonomy
//!
//! Categorized by phase: config / resolve / handle / per-tick. Per-tick
//! failures carry a transient/fatal classification the pacing loop applies:
//! transients are logged and swallowed, everything else terminates the loop.

use thiserror::Error;

/// Unified relay error type
#[derive(Debug, Error)]
pub enum RelayError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Resolve / Handle Errors (fatal) =====
    /// No stream matched the resolve query within the discovery timeout
    #[error("no stream found matching {property}=\"{value}\"")]
    StreamNotFound { property: String, value: String },

    /// Handle could not be opened, or became permanently invalid
    #[error("stream '{stream}' unavailable: {message}")]
    StreamUnavailable { stream: String, message: String },

    /// Sample length does not match the descriptor's channel_count
    ///
    /// Detected locally before any transport call.
    #[error("invalid sample shape for stream '{stream}': expected {expected} channels, got {actual}")]
    InvalidSampleShape {
        stream: String,
        expected: usize,
        actual: usize,
    },

    // ===== Per-Tick Errors (transient) =====
    /// Transport rejected a push; logged, loop continues
    #[error("transmit error on stream '{stream}': {message}")]
    Transmit { stream: String, message: String },

    /// Pull timed out with no sample available; logged, loop continues
    #[error("no data on stream '{stream}' within {timeout_ms}ms")]
    NoData { stream: String, timeout_ms: u64 },

    /// Escalation after N consecutive transient failures
    #[error("stream '{stream}' failed {count} consecutive ticks")]
    RepeatedFailure { stream: String, count: u32 },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl RelayError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create stream-unavailable error
    pub fn unavailable(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamUnavailable {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create transmit error
    pub fn transmit(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transmit {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create no-data error
    pub fn no_data(stream: impl Into<String>, timeout_ms: u64) -> Self {
        Self::NoData {
            stream: stream.into(),
            timeout_ms,
        }
    }

    /// Whether a tick failure with this error may be swallowed by the
    /// pacing loop (subject to the consecutive-failure threshold)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transmit { .. } | Self::NoData { .. })
    }
}

/// Relay Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;
