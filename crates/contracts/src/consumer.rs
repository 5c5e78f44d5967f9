//! SampleConsumer trait - receiver-side output interface
//!
//! Defines the abstract interface for consumers of pulled samples.

use crate::{RelayError, TimedSample};

/// Sample output trait
///
/// All consumer implementations must implement this trait.
#[trait_variant::make(SampleConsumer: Send)]
pub trait LocalSampleConsumer {
    /// Consumer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one pulled sample
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, sample: &TimedSample) -> Result<(), RelayError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), RelayError>;

    /// Close consumer
    async fn close(&mut self) -> Result<(), RelayError>;
}
