//! Stream transport abstraction
//!
//! Defines traits for the streaming collaborator, supporting the real LSL
//! implementation and the in-process loopback used for testing.

use std::future::Future;
use std::time::Duration;

use contracts::{Result, Sample, StreamDescriptor, TimedSample};

/// Stream transport trait
///
/// Abstracts the collaborator operations the relay consumes. Implemented by
/// the loopback hub and, behind the `real-lsl` feature, by the LSL binding.
pub trait StreamTransport: Send + Sync {
    /// Outbound stream handle type
    type Outlet: OutletHandle;

    /// Inbound stream handle type
    type Inlet: InletHandle;

    /// Resolve streams matching `property == value`
    ///
    /// Waits up to `timeout` for the network to answer. An empty result is
    /// not an error; the driver decides whether that is fatal.
    ///
    /// # Arguments
    /// * `property` - Descriptor property to match ("name" or "type")
    /// * `value` - Value to match
    /// * `timeout` - Discovery timeout
    fn resolve(
        &self,
        property: &str,
        value: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<StreamDescriptor>>> + Send;

    /// Register an outbound stream and return its handle
    ///
    /// Fails with `StreamUnavailable` on name collision or transport init
    /// failure. `chunk_size` and `max_buffered` are forwarded opaquely.
    fn open_outlet(
        &self,
        descriptor: &StreamDescriptor,
        chunk_size: u32,
        max_buffered: u32,
    ) -> impl Future<Output = Result<Self::Outlet>> + Send;

    /// Connect to a resolved stream and return its inlet handle
    ///
    /// Fails with `StreamUnavailable` if the connection cannot be
    /// established.
    fn open_inlet(
        &self,
        descriptor: &StreamDescriptor,
        max_buffered: u32,
    ) -> impl Future<Output = Result<Self::Inlet>> + Send;
}

/// Outbound stream handle
///
/// Exclusively owned by its adapter; one in-flight push at a time; the
/// underlying registration is released on drop.
pub trait OutletHandle: Send {
    /// Descriptor this outlet was opened with
    fn descriptor(&self) -> &StreamDescriptor;

    /// Hand one sample to the transport layer
    ///
    /// At most one delivery attempt; rejection surfaces as a transient
    /// `Transmit` error.
    fn push(&mut self, sample: &Sample) -> impl Future<Output = Result<()>> + Send;
}

/// Inbound stream handle
///
/// Exclusively owned by its adapter; suspension is always bounded by the
/// caller-supplied timeout, never unbounded.
pub trait InletHandle: Send {
    /// Descriptor this inlet was opened on
    fn descriptor(&self) -> &StreamDescriptor;

    /// Pull exactly one sample, waiting at most `timeout`
    ///
    /// A timeout maps to transient `NoData`; a closed stream maps to fatal
    /// `StreamUnavailable`.
    fn pull(&mut self, timeout: Duration) -> impl Future<Output = Result<TimedSample>> + Send;
}
