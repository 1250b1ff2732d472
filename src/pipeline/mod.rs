//! # Decode Pipeline Boundary
//!
//! The acquisition loop talks to the decoder only through [`SampleSource`].
//! [`gst_engine::GstEngine`] implements it on top of GStreamer; tests drive
//! the same loop with scripted sources.
//!
//! A source is moved into the acquisition thread and handed back when the
//! thread is joined, so its methods take `&mut self` and never race with the
//! consumer.

use std::sync::Arc;
use std::time::Duration;

use frame_canvas::SharedPixels;

use crate::error::{StreamError, StreamResult};

pub mod launch;

#[cfg(feature = "gst-pipeline")]
pub mod gst_engine;

pub use launch::launch_description;

/// Readable decoded payload (packed RGB). Dropping the last reference
/// releases the mapping.
#[derive(Clone)]
pub struct RawFrame {
    pixels: SharedPixels,
}

impl RawFrame {
    pub fn new(pixels: SharedPixels) -> Self {
        Self { pixels }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            pixels: Arc::new(bytes),
        }
    }

    pub fn len(&self) -> usize {
        (*self.pixels).as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_pixels(self) -> SharedPixels {
        self.pixels
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame").field("len", &self.len()).finish()
    }
}

/// Error message taken off the pipeline bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEvent {
    /// Name of the element that posted the message
    pub element: Option<String>,
    pub message: String,
    pub debug: Option<String>,
}

impl BusEvent {
    pub fn into_error(self) -> StreamError {
        StreamError::runtime_stream(self.element, self.message, self.debug)
    }
}

/// Result of one `pull_next` call.
#[derive(Debug)]
pub enum SampleOutcome {
    StreamError(BusEvent),
    EndOfStream,
    Sample(RawFrame),
    /// No usable sample; the reason is logged at debug level.
    Unavailable(String),
}

impl SampleOutcome {
    pub fn into_result(self) -> StreamResult<RawFrame> {
        match self {
            SampleOutcome::Sample(frame) => Ok(frame),
            SampleOutcome::StreamError(event) => Err(event.into_error()),
            SampleOutcome::EndOfStream => Err(StreamError::end_of_stream()),
            SampleOutcome::Unavailable(reason) => Err(StreamError::mapping(reason)),
        }
    }
}

/// Producer side of a decode pipeline.
pub trait SampleSource: Send {
    /// Next bus event or decoded sample. May block until one is available.
    fn pull_next(&mut self) -> SampleOutcome;

    /// Negotiated `(width, height)` of decoded frames.
    fn query_geometry(&mut self) -> StreamResult<(i32, i32)>;

    /// Bounded wait for an error or end of stream right after start.
    fn poll_early_failure(&mut self, _timeout: Duration) -> Option<StreamError> {
        None
    }

    /// Stops the underlying pipeline. Must be idempotent.
    fn shutdown(&mut self) {}
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn pull_next(&mut self) -> SampleOutcome {
        (**self).pull_next()
    }

    fn query_geometry(&mut self) -> StreamResult<(i32, i32)> {
        (**self).query_geometry()
    }

    fn poll_early_failure(&mut self, timeout: Duration) -> Option<StreamError> {
        (**self).poll_early_failure(timeout)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FallbackAction, Recoverable};

    #[test]
    fn test_outcome_routing() {
        let eos = SampleOutcome::EndOfStream.into_result().unwrap_err();
        assert_eq!(eos.category(), "end_of_stream");

        let bus = SampleOutcome::StreamError(BusEvent {
            element: Some("udpsrc0".into()),
            message: "Internal data stream error.".into(),
            debug: None,
        })
        .into_result()
        .unwrap_err();
        assert_eq!(bus.fallback(), FallbackAction::Placeholder);

        let unavailable = SampleOutcome::Unavailable("no buffer".into())
            .into_result()
            .unwrap_err();
        assert_eq!(unavailable.category(), "mapping");

        let frame = SampleOutcome::Sample(RawFrame::from_vec(vec![1, 2, 3]))
            .into_result()
            .unwrap();
        assert_eq!(frame.len(), 3);
    }
}
