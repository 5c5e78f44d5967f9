//! ConsoleConsumer - prints channel values to stdout.

use std::io::Write;

use contracts::{RelayError, SampleConsumer, StreamDescriptor, TimedSample};
use tracing::instrument;

/// Consumer that prints samples to stdout, one channel row per line
pub struct ConsoleConsumer {
    name: String,
    labels: Vec<String>,
}

impl ConsoleConsumer {
    pub fn new(name: impl Into<String>, descriptor: &StreamDescriptor) -> Self {
        Self {
            name: name.into(),
            labels: descriptor.resolved_labels(),
        }
    }

    fn print_sample(&self, sample: &TimedSample) -> std::io::Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "t={:.4}", sample.timestamp)?;
        for (label, value) in self.labels.iter().zip(&sample.sample.values) {
            writeln!(out, "  {label}\t{value:.4}")?;
        }
        Ok(())
    }
}

impl SampleConsumer for ConsoleConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "console_consumer_write", level = "trace", skip(self, sample))]
    async fn write(&mut self, sample: &TimedSample) -> Result<(), RelayError> {
        self.print_sample(sample)?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), RelayError> {
        std::io::stdout().flush()?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RelayError> {
        std::io::stdout().flush()?;
        Ok(())
    }
}
