//! # GStreamer Engine
//!
//! [`GstEngine`] owns one receive/decode pipeline built from
//! [`launch_description`](super::launch::launch_description) and implements
//! [`SampleSource`] on top of its bus and `appsink`.
//!
//! Handles are released in a fixed order when the engine is dropped:
//! pipeline to `Null`, then converter and sink, then bus, then main context,
//! then the pipeline itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use log::{debug, info, trace, warn};
use once_cell::sync::OnceCell;

use super::launch::{converter_name, launch_description, sink_name};
use super::{BusEvent, RawFrame, SampleOutcome, SampleSource};
use crate::config::StreamDescriptor;
use crate::error::{StreamError, StreamResult};

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static INIT_RESULT: OnceCell<Result<(), String>> = OnceCell::new();

/// Process-wide, init-once GStreamer setup.
pub struct EngineInitializer;

impl EngineInitializer {
    /// Initializes GStreamer on first call; later calls return the first result.
    pub fn ensure_initialized() -> StreamResult<()> {
        if INITIALIZED.load(Ordering::Acquire) {
            return Ok(());
        }
        let result = INIT_RESULT.get_or_init(|| {
            info!("initializing GStreamer");
            gst::init().map_err(|e| e.to_string())
        });
        match result {
            Ok(()) => {
                INITIALIZED.store(true, Ordering::Release);
                Ok(())
            }
            Err(reason) => Err(StreamError::init(reason.clone())),
        }
    }
}

/// Human-readable caps of `element`'s sink pad: negotiated if available,
/// otherwise what the pad would accept.
pub fn describe_caps(element: &gst::Element) -> String {
    match element.static_pad("sink") {
        Some(pad) => pad
            .current_caps()
            .unwrap_or_else(|| pad.query_caps(None))
            .to_string(),
        None => "<no sink pad>".to_string(),
    }
}

fn outcome_from_message(msg: &gst::Message) -> SampleOutcome {
    match msg.view() {
        gst::MessageView::Error(err) => SampleOutcome::StreamError(BusEvent {
            element: msg.src().map(|s| s.name().to_string()),
            message: err.error().to_string(),
            debug: err.debug().map(|d| d.to_string()),
        }),
        gst::MessageView::Eos(_) => SampleOutcome::EndOfStream,
        _ => SampleOutcome::Unavailable(format!("unexpected bus message {:?}", msg.type_())),
    }
}

/// One running decode pipeline.
pub struct GstEngine {
    label: String,
    converter: Option<gst::Element>,
    appsink: Option<gst_app::AppSink>,
    bus: Option<gst::Bus>,
    context: Option<glib::MainContext>,
    pipeline: gst::Pipeline,
    stopped: bool,
}

impl GstEngine {
    /// Builds the pipeline for `descriptor` and sets it to `Playing`.
    pub fn start(descriptor: &StreamDescriptor) -> StreamResult<Self> {
        Self::launch(descriptor, &launch_description(descriptor.port, descriptor.codec))
    }

    /// Like [`start`](Self::start) with a caller-supplied description.
    ///
    /// The graph must contain an `appsink` named [`sink_name`] for the
    /// descriptor's port. Geometry is read from the element named
    /// [`converter_name`]; without it every geometry query fails.
    pub fn launch(descriptor: &StreamDescriptor, description: &str) -> StreamResult<Self> {
        EngineInitializer::ensure_initialized()?;

        let label = descriptor.label();
        debug!("{}: launching '{}'", label, description);

        // Sources created while parsing attach to this context.
        let context = glib::MainContext::new();
        let element = context
            .with_thread_default(|| gst::parse::launch(description))
            .map_err(|e| StreamError::build(description, e.to_string()))?
            .map_err(|e| StreamError::build(description, e.to_string()))?;

        let pipeline = element
            .downcast::<gst::Pipeline>()
            .map_err(|_| StreamError::build(description, "top-level element is not a pipeline"))?;

        let appsink = pipeline
            .by_name(&sink_name(descriptor.port))
            .and_then(|e| e.downcast::<gst_app::AppSink>().ok())
            .ok_or_else(|| {
                StreamError::build(description, "missing GStreamer element: appsink")
                    .with_context(label.clone())
            })?;

        let converter = pipeline.by_name(&converter_name(descriptor.port));
        match &converter {
            Some(convert) => debug!("{}: converter sink caps {}", label, describe_caps(convert)),
            None => warn!(
                "{}: converter element not found, geometry queries will fail",
                label
            ),
        }

        let bus = pipeline.bus();
        if bus.is_none() {
            warn!("{}: pipeline has no bus, bus events will not be seen", label);
        }

        let engine = Self {
            label,
            converter,
            appsink: Some(appsink),
            bus,
            context: Some(context),
            pipeline,
            stopped: false,
        };

        engine
            .pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| {
                StreamError::state_change("Playing", e.to_string())
                    .with_context(engine.label.clone())
            })?;
        info!("{}: pipeline playing", engine.label);
        Ok(engine)
    }
}

impl SampleSource for GstEngine {
    fn pull_next(&mut self) -> SampleOutcome {
        if let Some(bus) = &self.bus {
            if let Some(msg) =
                bus.pop_filtered(&[gst::MessageType::Error, gst::MessageType::Eos])
            {
                return outcome_from_message(&msg);
            }
        }

        let Some(appsink) = &self.appsink else {
            return SampleOutcome::Unavailable("no appsink".to_string());
        };

        let sample = match appsink.pull_sample() {
            Ok(sample) => sample,
            Err(_) if appsink.is_eos() => return SampleOutcome::EndOfStream,
            Err(e) => return SampleOutcome::Unavailable(format!("pull_sample failed: {}", e)),
        };

        if let Some(list) = sample.buffer_list() {
            trace!("{}: sample buffer list holds {} buffers", self.label, list.len());
        }

        let Some(buffer) = sample.buffer_owned() else {
            return SampleOutcome::Unavailable("sample carries no buffer".to_string());
        };

        match buffer.into_mapped_buffer_readable() {
            Ok(mapped) => SampleOutcome::Sample(RawFrame::new(Arc::new(mapped))),
            Err(_) => {
                SampleOutcome::Unavailable("buffer could not be mapped for reading".to_string())
            }
        }
    }

    fn query_geometry(&mut self) -> StreamResult<(i32, i32)> {
        let convert = self.converter.as_ref().ok_or_else(|| {
            StreamError::geometry_unavailable("converter element not found")
        })?;
        let pad = convert
            .static_pad("sink")
            .ok_or_else(|| StreamError::geometry_unavailable("converter has no sink pad"))?;
        let caps = pad.current_caps().unwrap_or_else(|| pad.query_caps(None));
        let structure = caps
            .structure(0)
            .ok_or_else(|| StreamError::geometry_unavailable(format!("empty caps {}", caps)))?;

        let width = structure
            .get::<i32>("width")
            .map_err(|e| StreamError::geometry_unavailable(format!("width: {}", e)))?;
        let height = structure
            .get::<i32>("height")
            .map_err(|e| StreamError::geometry_unavailable(format!("height: {}", e)))?;
        Ok((width, height))
    }

    fn poll_early_failure(&mut self, timeout: Duration) -> Option<StreamError> {
        let bus = self.bus.as_ref()?;
        let msg = bus.timed_pop_filtered(
            gst::ClockTime::from_nseconds(timeout.as_nanos() as u64),
            &[gst::MessageType::Error, gst::MessageType::Eos],
        )?;
        match outcome_from_message(&msg) {
            SampleOutcome::StreamError(event) => Some(event.into_error()),
            SampleOutcome::EndOfStream => Some(StreamError::end_of_stream()),
            _ => None,
        }
    }

    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        match self.pipeline.set_state(gst::State::Null) {
            Ok(_) => debug!("{}: pipeline stopped", self.label),
            Err(e) => warn!("{}: failed to stop pipeline: {}", self.label, e),
        }
    }
}

impl Drop for GstEngine {
    fn drop(&mut self) {
        self.shutdown();
        self.converter.take();
        self.appsink.take();
        self.bus.take();
        self.context.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_descriptor(port: u16) -> StreamDescriptor {
        StreamDescriptor::new("engine-test", port).nominal_size(32, 16)
    }

    /// Test-source graph producing `buffers` 32x16 RGB frames into the port's sink.
    fn videotest_graph(port: u16, buffers: u32, with_converter: bool) -> String {
        let convert = if with_converter {
            format!(" ! videoconvert name={}", converter_name(port))
        } else {
            String::new()
        };
        format!(
            "videotestsrc num-buffers={} ! video/x-raw,format=RGB,width=32,height=16{} ! appsink name={}",
            buffers,
            convert,
            sink_name(port)
        )
    }

    fn launch_or_skip(descriptor: &StreamDescriptor, description: &str) -> Option<GstEngine> {
        match GstEngine::launch(descriptor, description) {
            Ok(engine) => Some(engine),
            Err(e) => {
                eprintln!("skipping: test source unavailable: {}", e);
                None
            }
        }
    }

    fn first_sample(engine: &mut GstEngine) -> Option<RawFrame> {
        for _ in 0..8 {
            if let SampleOutcome::Sample(frame) = engine.pull_next() {
                return Some(frame);
            }
        }
        None
    }

    #[test]
    fn test_initialization_is_idempotent() {
        assert!(EngineInitializer::ensure_initialized().is_ok());
        assert!(EngineInitializer::ensure_initialized().is_ok());
        assert!(matches!(INIT_RESULT.get(), Some(Ok(()))));
        assert!(INITIALIZED.load(Ordering::Acquire));
    }

    #[test]
    fn test_malformed_description_is_build_error() {
        let err = GstEngine::launch(
            &engine_descriptor(7100),
            "udpsrc port=7100 ! no_such_element_xyz",
        )
        .err()
        .expect("launch must fail");
        assert_eq!(err.category(), "build");
    }

    #[test]
    fn test_missing_sink_is_build_error() {
        let err = GstEngine::launch(&engine_descriptor(7101), "videotestsrc ! fakesink")
            .err()
            .expect("launch must fail");
        assert_eq!(err.category(), "build");
        assert!(err.to_string().contains("appsink"));
        assert_eq!(err.context().context.as_deref(), Some("engine-test:7101"));
    }

    #[test]
    fn test_missing_converter_fails_geometry() {
        let descriptor = engine_descriptor(7102);
        let Some(mut engine) = launch_or_skip(&descriptor, &videotest_graph(7102, 2, false)) else {
            return;
        };
        let err = engine.query_geometry().unwrap_err();
        assert_eq!(err.category(), "geometry");
    }

    #[test]
    fn test_pulls_sample_and_reads_geometry() {
        let descriptor = engine_descriptor(7103);
        let Some(mut engine) = launch_or_skip(&descriptor, &videotest_graph(7103, 1, true)) else {
            return;
        };

        let frame = first_sample(&mut engine).expect("one frame from videotestsrc");
        assert_eq!(frame.len(), 32 * 16 * 3);
        assert_eq!(engine.query_geometry().unwrap(), (32, 16));

        // num-buffers=1: the stream ends after the first frame.
        let mut ended = false;
        for _ in 0..8 {
            if matches!(engine.pull_next(), SampleOutcome::EndOfStream) {
                ended = true;
                break;
            }
        }
        assert!(ended);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let descriptor = engine_descriptor(7104);
        let Some(mut engine) = launch_or_skip(&descriptor, &videotest_graph(7104, 1, true)) else {
            return;
        };
        engine.shutdown();
        assert!(engine.stopped);
        engine.shutdown();
        assert_eq!(engine.pipeline.current_state(), gst::State::Null);
        drop(engine);
    }
}
