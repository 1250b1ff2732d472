//! # Configuration Module
//!
//! Stream descriptors, acquisition tunables and the JSON stream-set format.

#[allow(clippy::module_inception)]
pub mod config;
pub mod descriptor;

pub use config::{AcquisitionConfig, StreamSetConfig, MAX_QUEUED_FRAMES, MIN_QUEUED_FRAMES};
pub use descriptor::{Codec, Side, StreamDescriptor, StreamType, Vec3};
