//! # Teleop Frames
//!
//! Frame acquisition for teleoperation clients: receives an RTP video stream
//! on one UDP port, decodes it with GStreamer and hands the most recent
//! decoded frame to a render loop without ever blocking that loop on decode.
//!
//! ## Architecture
//!
//! - `config`: stream descriptors, acquisition tunables, JSON stream sets
//! - `core`: frame slots, the bounded frame queue, placeholders, stereo
//!   extraction, geometry discovery, timing and counters
//! - `pipeline`: the [`SampleSource`](pipeline::SampleSource) boundary, launch
//!   descriptions and (feature `gst-pipeline`) the GStreamer engine
//! - `stream`: [`StreamPipeline`], the per-port controller
//! - `error`: [`StreamError`] and its fallback classification
//! - `logging`: `env_logger` installation
//!
//! ## Threads
//!
//! Each [`StreamPipeline`] owns one acquisition thread (`acq-<port>`). The
//! consumer calls [`StreamPipeline::get_image`] from its own thread; the only
//! wait on that path is a short-held mutex.
//!
//! ## Placeholders
//!
//! The consumer always gets an image. Before the first frame, after a decoder
//! error, at end of stream and after a fatal size mismatch it gets a solid
//! placeholder at the stream's nominal size with a caption describing why.
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "gst-pipeline")]
//! # fn main() {
//! use teleop_frames::config::{Side, StreamDescriptor};
//! use teleop_frames::StreamPipeline;
//!
//! let stream = StreamPipeline::new(StreamDescriptor::new("front", 5000).stereo().side(Side::Both));
//! loop {
//!     let left = stream.get_image(Side::Left);
//!     let right = stream.get_image(Side::Right);
//!     // upload left/right to textures
//! #   let _ = (left, right);
//! #   break;
//! }
//! # }
//! # #[cfg(not(feature = "gst-pipeline"))]
//! # fn main() {}
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod stream;

pub use error::{FallbackAction, Recoverable, StreamError, StreamResult};
pub use frame_canvas::ImageView;
pub use stream::{StreamPipeline, StreamState};
