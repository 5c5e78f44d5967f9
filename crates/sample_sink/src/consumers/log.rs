//! LogConsumer - per-sample tracing summary.

use contracts::{RelayError, SampleConsumer, TimedSample};
use tracing::{info, instrument};

/// Consumer that logs a one-line summary per sample
pub struct LogConsumer {
    name: String,
}

impl LogConsumer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SampleConsumer for LogConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_consumer_write", skip(self, sample), fields(consumer = %self.name))]
    async fn write(&mut self, sample: &TimedSample) -> Result<(), RelayError> {
        info!(
            consumer = %self.name,
            timestamp = sample.timestamp,
            channels = sample.sample.len(),
            first = sample.sample.values.first().copied().unwrap_or(0.0),
            "sample received"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), RelayError> {
        Ok(())
    }

    #[instrument(name = "log_consumer_close", skip(self))]
    async fn close(&mut self) -> Result<(), RelayError> {
        info!(consumer = %self.name, "log consumer closed");
        Ok(())
    }
}
