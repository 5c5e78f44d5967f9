//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-crate data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Pacing deadlines are monotonic instants local to each loop
//! - Sample timestamps (seconds, f64) come from the transport collaborator's clock

mod config;
mod consumer;
mod descriptor;
mod error;
mod sample;

pub use config::*;
pub use consumer::{LocalSampleConsumer, SampleConsumer};
pub use descriptor::*;
pub use error::*;
pub use sample::*;
