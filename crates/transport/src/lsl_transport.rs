//! Real LSL transport (feature `real-lsl`)
//!
//! Binds the `lsl` crate. LSL's own pull/resolve calls are internally
//! bounded by the timeouts we pass, so they never suspend unbounded; the
//! brief blocking they do happens on the owning role's task.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::{RelayError, Result, Sample, StreamDescriptor, TimedSample};
use lsl::{Pullable, Pushable};
use tracing::{debug, instrument};

use crate::stream_transport::{InletHandle, OutletHandle, StreamTransport};

/// Transport backed by the LSL network
#[derive(Debug, Default, Clone)]
pub struct LslTransport;

impl LslTransport {
    /// Create an LSL transport
    pub fn new() -> Self {
        Self
    }

    fn stream_info(descriptor: &StreamDescriptor) -> Result<lsl::StreamInfo> {
        let info = lsl::StreamInfo::new(
            &descriptor.name,
            &descriptor.stream_type,
            descriptor.channel_count as u32,
            descriptor.nominal_rate_hz,
            lsl::ChannelFormat::Float32,
            &descriptor.source_id,
        )
        .map_err(|e| RelayError::unavailable(&descriptor.name, e.to_string()))?;

        // Attach the opaque metadata tree: top-level annotations plus one
        // <channel> element per channel with label/unit/type.
        let mut desc = info.desc();
        for (key, value) in &descriptor.metadata {
            desc.append_child_value(key, value);
        }
        let mut channels = desc.append_child("channels");
        for i in 0..descriptor.channel_count {
            let mut channel = channels.append_child("channel");
            channel.append_child_value("label", &descriptor.label(i));
            if let Some(unit) = descriptor.metadata.get("unit") {
                channel.append_child_value("unit", unit);
            }
            channel.append_child_value("type", &descriptor.stream_type);
        }

        Ok(info)
    }

    fn descriptor_from(info: &lsl::StreamInfo) -> StreamDescriptor {
        StreamDescriptor {
            name: info.stream_name(),
            stream_type: info.stream_type(),
            channel_count: info.channel_count() as usize,
            nominal_rate_hz: info.nominal_srate(),
            channel_labels: Vec::new(),
            source_id: info.source_id(),
            metadata: BTreeMap::new(),
        }
    }
}

impl StreamTransport for LslTransport {
    type Outlet = LslOutlet;
    type Inlet = LslInlet;

    #[instrument(name = "lsl_resolve", skip(self), fields(property = %property, value = %value))]
    async fn resolve(
        &self,
        property: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<Vec<StreamDescriptor>> {
        let property = property.to_string();
        let value = value.to_string();
        let wait = timeout.as_secs_f64();

        let infos = tokio::task::spawn_blocking(move || {
            lsl::resolve_byprop(&property, &value, 1, wait)
        })
        .await
        .map_err(|e| RelayError::Other(format!("resolve task failed: {e}")))?
        .map_err(|e| RelayError::Other(format!("lsl resolve error: {e}")))?;

        debug!(count = infos.len(), "lsl resolve finished");
        Ok(infos.iter().map(Self::descriptor_from).collect())
    }

    #[instrument(name = "lsl_open_outlet", skip(self, descriptor), fields(stream = %descriptor.name))]
    async fn open_outlet(
        &self,
        descriptor: &StreamDescriptor,
        chunk_size: u32,
        max_buffered: u32,
    ) -> Result<LslOutlet> {
        let info = Self::stream_info(descriptor)?;
        let outlet = lsl::StreamOutlet::new(&info, chunk_size as i32, max_buffered as i32)
            .map_err(|e| RelayError::unavailable(&descriptor.name, e.to_string()))?;

        Ok(LslOutlet {
            descriptor: descriptor.clone(),
            outlet,
        })
    }

    #[instrument(name = "lsl_open_inlet", skip(self, descriptor), fields(stream = %descriptor.name))]
    async fn open_inlet(
        &self,
        descriptor: &StreamDescriptor,
        max_buffered: u32,
    ) -> Result<LslInlet> {
        let info = Self::stream_info(descriptor)?;
        let inlet = lsl::StreamInlet::new(&info, max_buffered as i32, 0, true)
            .map_err(|e| RelayError::unavailable(&descriptor.name, e.to_string()))?;

        Ok(LslInlet {
            descriptor: descriptor.clone(),
            inlet,
        })
    }
}

/// Outbound LSL stream handle; deregisters from the network on drop
pub struct LslOutlet {
    descriptor: StreamDescriptor,
    outlet: lsl::StreamOutlet,
}

impl OutletHandle for LslOutlet {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    async fn push(&mut self, sample: &Sample) -> Result<()> {
        self.outlet
            .push_sample(&sample.values)
            .map_err(|e| RelayError::transmit(&self.descriptor.name, e.to_string()))
    }
}

/// Inbound LSL stream handle
pub struct LslInlet {
    descriptor: StreamDescriptor,
    inlet: lsl::StreamInlet,
}

impl InletHandle for LslInlet {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    async fn pull(&mut self, timeout: Duration) -> Result<TimedSample> {
        let timeout_ms = timeout.as_millis() as u64;
        let (values, timestamp): (Vec<f32>, f64) = self
            .inlet
            .pull_sample(timeout.as_secs_f64())
            .map_err(|_| RelayError::no_data(&self.descriptor.name, timeout_ms))?;

        // LSL signals an expired timeout with a zero timestamp
        if values.is_empty() || timestamp == 0.0 {
            return Err(RelayError::no_data(&self.descriptor.name, timeout_ms));
        }

        Ok(TimedSample {
            sample: values.into(),
            timestamp,
        })
    }
}
