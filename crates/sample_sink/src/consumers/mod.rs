//! Consumer implementations and their factory.

mod console;
mod csv;
mod log;

pub use console::ConsoleConsumer;
pub use csv::CsvConsumer;
pub use log::LogConsumer;

use contracts::{ConsumerConfig, ConsumerKind, RelayError, Result, StreamDescriptor};
use tracing::instrument;

use crate::handle::ConsumerHandle;

/// Spawn one worker per configured consumer
#[instrument(name = "build_consumers", skip_all, fields(count = configs.len(), stream = %descriptor.name))]
pub fn build_consumers(
    configs: &[ConsumerConfig],
    descriptor: &StreamDescriptor,
) -> Result<Vec<ConsumerHandle>> {
    configs
        .iter()
        .map(|config| spawn_consumer(config, descriptor))
        .collect()
}

fn spawn_consumer(
    config: &ConsumerConfig,
    descriptor: &StreamDescriptor,
) -> Result<ConsumerHandle> {
    let handle = match config.kind {
        ConsumerKind::Log => {
            ConsumerHandle::spawn(LogConsumer::new(&config.name), config.queue_capacity)
        }
        ConsumerKind::Console => ConsumerHandle::spawn(
            ConsoleConsumer::new(&config.name, descriptor),
            config.queue_capacity,
        ),
        ConsumerKind::File => {
            let path = config.params.get("path").ok_or_else(|| {
                RelayError::config_validation(
                    format!("consumers.{}.params.path", config.name),
                    "file consumer requires a path",
                )
            })?;
            let consumer = CsvConsumer::create(&config.name, path, descriptor)?;
            ConsumerHandle::spawn(consumer, config.queue_capacity)
        }
    };
    Ok(handle)
}
