//! # Transport
//!
//! Stream transport abstraction over the external streaming collaborator.
//!
//! The collaborator owns discovery, wire transport, buffering, and clock
//! synchronization; this crate only models the surface the relay consumes:
//! resolve-by-property, open-outlet/push, open-inlet/pull.
//!
//! Backends:
//! - [`LoopbackTransport`] - in-process hub, no network (default; tests/demos)
//! - `LslTransport` - real LSL network transport (feature `real-lsl`)

mod loopback;
#[cfg(feature = "real-lsl")]
mod lsl_transport;
mod stream_transport;

pub use loopback::{LoopbackConfig, LoopbackTransport};
#[cfg(feature = "real-lsl")]
pub use lsl_transport::LslTransport;
pub use stream_transport::{InletHandle, OutletHandle, StreamTransport};
