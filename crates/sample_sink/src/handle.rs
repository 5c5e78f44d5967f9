//! ConsumerHandle - one consumer, one bounded queue, one worker task.

use std::sync::Arc;

use contracts::{SampleConsumer, TimedSample};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::metrics::{ConsumerMetrics, ConsumerSnapshot};

/// Handle to a running consumer worker
///
/// The pacing loop hands samples over with a non-blocking `try_send`, so a
/// slow or wedged consumer costs the loop nothing but a drop counter.
#[derive(Debug)]
pub struct ConsumerHandle {
    name: String,
    tx: mpsc::Sender<TimedSample>,
    metrics: Arc<ConsumerMetrics>,
    worker: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Spawn the worker task for `consumer` with a queue of `queue_capacity`
    pub fn spawn<C: SampleConsumer + Send + 'static>(consumer: C, queue_capacity: usize) -> Self {
        let name = consumer.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(ConsumerMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();
        let worker = tokio::spawn(async move {
            consumer_worker(consumer, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<ConsumerMetrics> {
        &self.metrics
    }

    /// Offer one sample without blocking
    ///
    /// Returns false when the sample was dropped (full queue) or the worker
    /// is gone.
    pub fn try_send(&self, sample: TimedSample) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => {
                self.metrics.set_queue_depth(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                metrics::counter!(
                    "stream_relay_consumer_dropped_total",
                    "consumer" => self.name.clone()
                )
                .increment(1);
                warn!(consumer = %self.name, "queue full, sample dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(consumer = %self.name, "consumer worker closed unexpectedly");
                false
            }
        }
    }

    /// Drain the queue, close the consumer, and return final counters
    #[instrument(name = "consumer_handle_shutdown", skip(self), fields(consumer = %self.name))]
    pub async fn shutdown(self) -> (String, ConsumerSnapshot) {
        // Dropping the sender ends the worker's recv loop
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(consumer = %self.name, error = ?e, "worker task panicked");
        }
        let snapshot = self.metrics.snapshot();
        debug!(consumer = %self.name, writes = snapshot.writes, dropped = snapshot.dropped, "consumer shut down");
        (self.name, snapshot)
    }
}

/// Worker loop: drain the queue into the consumer, flush and close at end
#[instrument(name = "consumer_worker", skip(consumer, rx, metrics), fields(consumer = %name))]
async fn consumer_worker<C: SampleConsumer>(
    mut consumer: C,
    mut rx: mpsc::Receiver<TimedSample>,
    metrics: Arc<ConsumerMetrics>,
    name: String,
) {
    debug!(consumer = %name, "worker started");

    while let Some(sample) = rx.recv().await {
        metrics.set_queue_depth(rx.len());

        let status = match consumer.write(&sample).await {
            Ok(()) => {
                metrics.record_write(true);
                "ok"
            }
            Err(e) => {
                metrics.record_write(false);
                // One bad write must not take the worker down
                error!(consumer = %name, error = %e, "write failed");
                "error"
            }
        };
        metrics::counter!(
            "stream_relay_consumer_writes_total",
            "consumer" => name.clone(),
            "status" => status
        )
        .increment(1);
    }

    if let Err(e) = consumer.flush().await {
        error!(consumer = %name, error = %e, "flush failed on shutdown");
    }
    if let Err(e) = consumer.close().await {
        error!(consumer = %name, error = %e, "close failed on shutdown");
    }

    debug!(consumer = %name, "worker stopped");
}
