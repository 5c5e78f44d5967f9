//! Stream discovery.

use std::time::Duration;

use contracts::{RelayError, Result, StreamDescriptor};
use tracing::{info, instrument, warn};
use transport::StreamTransport;

/// Resolve exactly one stream or fail
///
/// The receiver role fails closed at startup: no match within the discovery
/// timeout is a fatal `StreamNotFound`, never a silent retry loop. Multiple
/// matches pick the first and warn.
#[instrument(name = "resolve_one", skip(transport), fields(property = %property, value = %value))]
pub async fn resolve_one<T: StreamTransport>(
    transport: &T,
    property: &str,
    value: &str,
    timeout: Duration,
) -> Result<StreamDescriptor> {
    let mut found = transport.resolve(property, value, timeout).await?;

    if found.is_empty() {
        return Err(RelayError::StreamNotFound {
            property: property.to_string(),
            value: value.to_string(),
        });
    }
    if found.len() > 1 {
        warn!(matches = found.len(), "multiple streams matched, using the first");
    }

    let descriptor = found.swap_remove(0);
    info!(
        stream = %descriptor.name,
        channels = descriptor.channel_count,
        rate_hz = descriptor.nominal_rate_hz,
        "stream resolved"
    );
    Ok(descriptor)
}
