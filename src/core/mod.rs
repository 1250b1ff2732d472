//! # Core Frame Infrastructure
//!
//! Building blocks shared by the acquisition thread and the consumer: frame
//! slots, the bounded queue between them, placeholder rendering, stereo
//! extraction, geometry discovery and per-iteration timing.

pub mod extraction;
pub mod frame_queue;
pub mod frame_slot;
pub mod geometry;
pub mod placeholder;
pub mod timing;

pub use extraction::extract;
pub use frame_queue::FrameQueue;
pub use frame_slot::{FrameSlot, SlotOrigin};
pub use geometry::Geometry;
pub use placeholder::PlaceholderSet;
pub use timing::{AcquisitionStats, OutcomeKind, StageTimer, StatsSnapshot};
