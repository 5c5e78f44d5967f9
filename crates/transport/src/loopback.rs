//! Loopback transport
//!
//! In-process hub for tests and demos without an LSL network. Supports
//! injecting failure scenarios.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use contracts::{RelayError, Result, Sample, StreamDescriptor, TimedSample};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use crate::stream_transport::{InletHandle, OutletHandle, StreamTransport};

/// Poll interval while a resolve query waits for a matching stream
const RESOLVE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Loopback failure-injection configuration
#[derive(Debug, Default, Clone)]
pub struct LoopbackConfig {
    /// Stream names whose open_outlet/open_inlet should fail
    pub fail_open: Vec<String>,

    /// Stream names whose pushes should be rejected
    pub fail_push: Vec<String>,

    /// Pushes that succeed before injection kicks in (0 = fail immediately)
    pub fail_push_after: u64,
}

#[derive(Debug)]
struct LoopbackStream {
    descriptor: StreamDescriptor,
    tx: broadcast::Sender<TimedSample>,
}

#[derive(Debug)]
struct HubInner {
    config: LoopbackConfig,
    /// Hub-wide clock epoch; loopback timestamps are seconds since this
    epoch: Instant,
    streams: Mutex<HashMap<String, LoopbackStream>>,
}

/// Loopback transport
///
/// Cloning shares the hub, so a sender role and a receiver role in the same
/// process see each other's streams (each still owns its handles
/// exclusively).
#[derive(Clone)]
pub struct LoopbackTransport {
    inner: Arc<HubInner>,
}

impl LoopbackTransport {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(LoopbackConfig::default())
    }

    /// Create a hub with failure injection
    pub fn with_config(config: LoopbackConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config,
                epoch: Instant::now(),
                streams: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Number of currently registered streams
    pub fn stream_count(&self) -> usize {
        self.inner.streams.lock().unwrap().len()
    }

    fn matching_descriptors(&self, property: &str, value: &str) -> Vec<StreamDescriptor> {
        let streams = self.inner.streams.lock().unwrap();
        streams
            .values()
            .filter(|s| match property {
                "name" => s.descriptor.name == value,
                "type" => s.descriptor.stream_type == value,
                other => s.descriptor.metadata.get(other).is_some_and(|v| v == value),
            })
            .map(|s| s.descriptor.clone())
            .collect()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTransport for LoopbackTransport {
    type Outlet = LoopbackOutlet;
    type Inlet = LoopbackInlet;

    #[instrument(name = "loopback_resolve", skip(self), fields(property = %property, value = %value))]
    async fn resolve(
        &self,
        property: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<Vec<StreamDescriptor>> {
        // Polling and deadline both run on the tokio clock so paused-clock
        // tests advance discovery the same way they advance the sleeps.
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let found = self.matching_descriptors(property, value);
            if !found.is_empty() {
                debug!(count = found.len(), "resolve matched");
                return Ok(found);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("resolve timed out with no match");
                return Ok(Vec::new());
            }
            tokio::time::sleep(RESOLVE_POLL_INTERVAL).await;
        }
    }

    #[instrument(name = "loopback_open_outlet", skip(self, descriptor), fields(stream = %descriptor.name))]
    async fn open_outlet(
        &self,
        descriptor: &StreamDescriptor,
        _chunk_size: u32,
        max_buffered: u32,
    ) -> Result<LoopbackOutlet> {
        if self.inner.config.fail_open.contains(&descriptor.name) {
            return Err(RelayError::unavailable(&descriptor.name, "injected failure"));
        }

        let mut streams = self.inner.streams.lock().unwrap();
        if streams.contains_key(&descriptor.name) {
            return Err(RelayError::unavailable(
                &descriptor.name,
                "stream name already registered",
            ));
        }

        let capacity = (max_buffered as usize).max(1);
        let (tx, _) = broadcast::channel(capacity);
        streams.insert(
            descriptor.name.clone(),
            LoopbackStream {
                descriptor: descriptor.clone(),
                tx: tx.clone(),
            },
        );
        debug!(stream = %descriptor.name, capacity, "outlet registered");

        Ok(LoopbackOutlet {
            descriptor: descriptor.clone(),
            tx,
            hub: Arc::clone(&self.inner),
            fail_push: self.inner.config.fail_push.contains(&descriptor.name),
            pushes: 0,
        })
    }

    #[instrument(name = "loopback_open_inlet", skip(self, descriptor), fields(stream = %descriptor.name))]
    async fn open_inlet(
        &self,
        descriptor: &StreamDescriptor,
        _max_buffered: u32,
    ) -> Result<LoopbackInlet> {
        if self.inner.config.fail_open.contains(&descriptor.name) {
            return Err(RelayError::unavailable(&descriptor.name, "injected failure"));
        }

        let streams = self.inner.streams.lock().unwrap();
        let stream = streams.get(&descriptor.name).ok_or_else(|| {
            RelayError::unavailable(&descriptor.name, "stream not registered on hub")
        })?;

        Ok(LoopbackInlet {
            descriptor: stream.descriptor.clone(),
            rx: stream.tx.subscribe(),
        })
    }
}

/// Loopback outlet handle
///
/// Registration is removed from the hub on drop, so a dropped sender role
/// surfaces as a closed stream on the inlet side.
#[derive(Debug)]
pub struct LoopbackOutlet {
    descriptor: StreamDescriptor,
    tx: broadcast::Sender<TimedSample>,
    hub: Arc<HubInner>,
    fail_push: bool,
    pushes: u64,
}

impl OutletHandle for LoopbackOutlet {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    async fn push(&mut self, sample: &Sample) -> Result<()> {
        if self.fail_push && self.pushes >= self.hub.config.fail_push_after {
            return Err(RelayError::transmit(&self.descriptor.name, "injected failure"));
        }
        self.pushes += 1;

        let timed = TimedSample {
            sample: sample.clone(),
            timestamp: self.hub.epoch.elapsed().as_secs_f64(),
        };
        // No subscribers means the sample is simply not delivered, matching
        // an outlet pushing with no connected inlets.
        let _ = self.tx.send(timed);
        Ok(())
    }
}

impl Drop for LoopbackOutlet {
    fn drop(&mut self) {
        self.hub.streams.lock().unwrap().remove(&self.descriptor.name);
        debug!(stream = %self.descriptor.name, "outlet unregistered");
    }
}

/// Loopback inlet handle
pub struct LoopbackInlet {
    descriptor: StreamDescriptor,
    rx: broadcast::Receiver<TimedSample>,
}

impl InletHandle for LoopbackInlet {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    async fn pull(&mut self, timeout: Duration) -> Result<TimedSample> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Ok(timed)) => return Ok(timed),
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    // The hub buffer wrapped; skip to the oldest retained
                    // sample rather than failing the tick.
                    warn!(stream = %self.descriptor.name, skipped, "inlet lagged");
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(RelayError::unavailable(
                        &self.descriptor.name,
                        "outlet closed",
                    ));
                }
                Err(_) => {
                    return Err(RelayError::no_data(
                        &self.descriptor.name,
                        timeout.as_millis() as u64,
                    ));
                }
            }
        }
    }
}
