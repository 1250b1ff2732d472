//! # Stream Pipeline
//!
//! [`StreamPipeline`] is the per-port frame controller. It owns one
//! acquisition thread that pulls decoded samples from a [`SampleSource`],
//! turns each outcome into a [`FrameSlot`] and appends it to a bounded
//! [`FrameQueue`]. The renderer calls [`StreamPipeline::get_image`] at its own
//! cadence; that call only takes the queue lock and never waits on decode.
//!
//! ## States
//!
//! ```text
//! Idle ──spawn──▶ Running ──stop()──▶ Draining ──join()──▶ Stopped
//!                    │
//!                    └── size mismatch ──▶ Failed
//! ```
//!
//! A pipeline whose engine could not be started stays `Idle` (until joined)
//! and serves placeholders only; the reason is available from
//! [`StreamPipeline::failure`].
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use teleop_frames::config::{AcquisitionConfig, Side, StreamDescriptor};
//! use teleop_frames::pipeline::{SampleOutcome, SampleSource};
//! use teleop_frames::{StreamPipeline, StreamResult};
//!
//! struct Ended;
//!
//! impl SampleSource for Ended {
//!     fn pull_next(&mut self) -> SampleOutcome {
//!         std::thread::sleep(Duration::from_millis(1));
//!         SampleOutcome::EndOfStream
//!     }
//!     fn query_geometry(&mut self) -> StreamResult<(i32, i32)> {
//!         Ok((1280, 720))
//!     }
//! }
//!
//! let descriptor = StreamDescriptor::new("rear", 5001);
//! let mut stream = StreamPipeline::with_source(descriptor, &AcquisitionConfig::default(), Ended);
//! let image = stream.get_image(Side::Left);
//! assert!(image.width() > 0);
//! stream.stop();
//! stream.join();
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use frame_canvas::ImageView;
use log::{debug, error, info, log, warn};

use crate::config::{
    AcquisitionConfig, Codec, MAX_QUEUED_FRAMES, MIN_QUEUED_FRAMES, Side, StreamDescriptor,
    StreamType, Vec3,
};
use crate::core::{
    AcquisitionStats, FrameQueue, FrameSlot, Geometry, OutcomeKind, PlaceholderSet, SlotOrigin,
    StageTimer, StatsSnapshot, extract,
};
use crate::error::{ErrorSeverity, FallbackAction, Recoverable, StreamError, StreamResult, classify};
use crate::pipeline::{RawFrame, SampleSource};

#[cfg(feature = "gst-pipeline")]
use crate::pipeline::gst_engine::GstEngine;
#[cfg(feature = "gst-pipeline")]
use crate::pipeline::launch::launch_description;

/// Lifecycle of a stream's acquisition worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
    Failed = 4,
}

impl StreamState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StreamState::Idle,
            1 => StreamState::Running,
            2 => StreamState::Draining,
            3 => StreamState::Stopped,
            _ => StreamState::Failed,
        }
    }
}

/// Everything both threads mutate; guarded by one lock.
struct FrameState {
    queue: FrameQueue,
    geometry: Geometry,
}

struct Shared {
    descriptor: StreamDescriptor,
    label: String,
    frames: Mutex<FrameState>,
    placeholders: PlaceholderSet,
    stats: AcquisitionStats,
    stop: AtomicBool,
    state: AtomicU8,
    failure: Mutex<Option<StreamError>>,
    idle_backoff: Duration,
}

impl Shared {
    fn lock_frames(&self) -> MutexGuard<'_, FrameState> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: StreamState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: StreamState, to: StreamState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn record_failure(&self, error: StreamError) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn push(&self, slot: FrameSlot) {
        let evicted = self.lock_frames().queue.push_evicting(slot);
        if evicted {
            self.stats.record_eviction();
        }
    }
}

/// Frame controller for one network stream.
pub struct StreamPipeline {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<Box<dyn SampleSource>>>,
}

impl StreamPipeline {
    /// Starts a GStreamer pipeline for `descriptor` with default settings.
    #[cfg(feature = "gst-pipeline")]
    pub fn new(descriptor: StreamDescriptor) -> Self {
        Self::with_config(descriptor, &AcquisitionConfig::default())
    }

    /// Starts a GStreamer pipeline for `descriptor`.
    ///
    /// Start failures are logged and leave the controller serving
    /// placeholders without an acquisition thread.
    #[cfg(feature = "gst-pipeline")]
    pub fn with_config(descriptor: StreamDescriptor, config: &AcquisitionConfig) -> Self {
        let description = launch_description(descriptor.port, descriptor.codec);
        Self::with_launch(descriptor, config, &description)
    }

    /// Starts a GStreamer pipeline from a custom launch description.
    ///
    /// See [`GstEngine::launch`] for the element names the graph must carry.
    #[cfg(feature = "gst-pipeline")]
    pub fn with_launch(
        descriptor: StreamDescriptor,
        config: &AcquisitionConfig,
        description: &str,
    ) -> Self {
        match GstEngine::launch(&descriptor, description) {
            Ok(engine) => Self::with_source(descriptor, config, engine),
            Err(e) => Self::degraded(descriptor, config, e),
        }
    }

    /// Runs the acquisition loop against `source`.
    pub fn with_source<S>(
        descriptor: StreamDescriptor,
        config: &AcquisitionConfig,
        source: S,
    ) -> Self
    where
        S: SampleSource + 'static,
    {
        let mut pipeline = Self::idle(descriptor, config);
        pipeline.spawn(Box::new(source), config);
        pipeline
    }

    /// A controller without an acquisition thread; `get_image` serves placeholders.
    pub fn degraded(
        descriptor: StreamDescriptor,
        config: &AcquisitionConfig,
        reason: StreamError,
    ) -> Self {
        let pipeline = Self::idle(descriptor, config);
        log!(
            classify::log_level(&reason),
            "{}: running without acquisition: {}",
            pipeline.shared.label,
            reason
        );
        pipeline
            .shared
            .record_failure(reason.with_context(pipeline.shared.label.clone()));
        pipeline
    }

    fn idle(descriptor: StreamDescriptor, config: &AcquisitionConfig) -> Self {
        let label = descriptor.label();
        let bound = config
            .max_queued_frames
            .clamp(MIN_QUEUED_FRAMES, MAX_QUEUED_FRAMES);
        if bound != config.max_queued_frames {
            warn!(
                "{}: max_queued_frames {} out of range, using {}",
                label, config.max_queued_frames, bound
            );
        }
        let placeholders = PlaceholderSet::render(&descriptor, config.caption_font.as_deref());

        let shared = Shared {
            descriptor,
            label,
            frames: Mutex::new(FrameState {
                queue: FrameQueue::new(bound),
                geometry: Geometry::undiscovered(),
            }),
            placeholders,
            stats: AcquisitionStats::default(),
            stop: AtomicBool::new(false),
            state: AtomicU8::new(StreamState::Idle as u8),
            failure: Mutex::new(None),
            idle_backoff: config.idle_backoff(),
        };
        Self {
            shared: Arc::new(shared),
            worker: None,
        }
    }

    fn spawn(&mut self, mut source: Box<dyn SampleSource>, config: &AcquisitionConfig) {
        let label = self.shared.label.clone();
        if let Some(early) = source.poll_early_failure(config.early_failure_timeout()) {
            let early = early.with_severity(ErrorSeverity::Warning);
            log!(
                classify::log_level(&early),
                "{}: pipeline reported a problem right after start: {}",
                label,
                early
            );
        }

        self.shared.set_state(StreamState::Running);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("acq-{}", self.shared.descriptor.port))
            .spawn(move || acquisition_loop(source, shared));

        match spawned {
            Ok(handle) => {
                debug!("{}: acquisition thread started", label);
                self.worker = Some(handle);
            }
            Err(e) => {
                error!("{}: failed to spawn acquisition thread: {}", label, e);
                self.shared.set_state(StreamState::Idle);
                self.shared.record_failure(
                    StreamError::io("spawn acquisition thread", e).with_context(label),
                );
            }
        }
    }

    /// Asks the acquisition thread to exit after its current iteration.
    pub fn stop(&self) {
        if !self.shared.stop.swap(true, Ordering::AcqRel) {
            debug!("{}: stop requested", self.shared.label);
        }
        self.shared
            .transition(StreamState::Running, StreamState::Draining);
    }

    /// Waits for the acquisition thread and shuts the engine down.
    ///
    /// Blocks until the worker observes the stop flag, so call [`stop`](Self::stop) first.
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(mut source) => {
                    source.shutdown();
                    drop(source);
                }
                Err(_) => error!("{}: acquisition thread panicked", self.shared.label),
            }
            info!("{}: acquisition joined", self.shared.label);
        }
        if self.shared.state() != StreamState::Failed {
            self.shared.set_state(StreamState::Stopped);
        }
    }

    /// Image for `side`. Never blocks on decode.
    ///
    /// A stream configured for one side always answers with that side. The
    /// returned view shares the decoded buffer and stays valid after the slot
    /// it came from is evicted.
    pub fn get_image(&self, side: Side) -> ImageView {
        let configured = self.shared.descriptor.side;
        let resolved = match (configured, side) {
            (Side::Both, Side::Both) => Side::Left,
            (Side::Both, requested) => requested,
            (fixed, _) => fixed,
        };
        let trims =
            (resolved == Side::Left && configured == Side::Both) || configured != Side::Both;

        let mut frames = self.shared.lock_frames();
        if frames.queue.len() <= 1 {
            frames.queue.push_front(self.shared.placeholders.no_data_slot());
        }

        let mut trimmed = 0;
        while trims && frames.queue.len() > 2 {
            frames.queue.pop_front();
            trimmed += 1;
        }

        let image = match frames.queue.front() {
            Some(slot) => slot.image(resolved).clone(),
            None => self.shared.placeholders.no_data_image(resolved).clone(),
        };
        drop(frames);

        self.shared.stats.record_consumer_trims(trimmed);
        image
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.shared.descriptor
    }

    pub fn stream_type(&self) -> StreamType {
        self.shared.descriptor.stream_type
    }

    pub fn side(&self) -> Side {
        self.shared.descriptor.side
    }

    pub fn codec(&self) -> Codec {
        self.shared.descriptor.codec
    }

    pub fn port(&self) -> u16 {
        self.shared.descriptor.port
    }

    pub fn position(&self) -> Vec3 {
        self.shared.descriptor.position
    }

    pub fn scale(&self) -> Vec3 {
        self.shared.descriptor.scale
    }

    pub fn name(&self) -> &str {
        &self.shared.descriptor.name
    }

    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// Why acquisition is not running, if it stopped on its own or never started.
    pub fn failure(&self) -> Option<StreamError> {
        self.shared
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn queued_frames(&self) -> usize {
        self.shared.lock_frames().queue.len()
    }

    pub fn geometry(&self) -> Geometry {
        self.shared.lock_frames().geometry
    }

    /// Origin of the slot `get_image` would read next.
    pub fn front_origin(&self) -> Option<SlotOrigin> {
        self.shared.lock_frames().queue.front().map(FrameSlot::origin)
    }

    /// Origins of every queued slot, oldest first.
    pub fn queued_origins(&self) -> Vec<SlotOrigin> {
        self.shared
            .lock_frames()
            .queue
            .iter()
            .map(FrameSlot::origin)
            .collect()
    }
}

impl Drop for StreamPipeline {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn acquisition_loop(
    mut source: Box<dyn SampleSource>,
    shared: Arc<Shared>,
) -> Box<dyn SampleSource> {
    let label = shared.label.as_str();
    let mut sequence = 0u64;
    info!("{}: acquisition running", label);

    while !shared.stop.load(Ordering::Acquire) {
        let mut timer = StageTimer::start(label);
        let outcome = source.pull_next();
        timer.mark("pull");

        let built = match outcome.into_result() {
            Ok(frame) => {
                sequence += 1;
                live_slot(&shared, &mut *source, frame, sequence)
            }
            Err(e) => Err(e),
        };

        let (slot, kind) = match built {
            Ok(slot) => (slot, OutcomeKind::Frame),
            Err(error) => match error.fallback() {
                FallbackAction::Abort => {
                    fail(&shared, error);
                    break;
                }
                _ => placeholder_for(&shared, &error),
            },
        };
        timer.mark("build");

        shared.push(slot);
        shared.stats.record(kind);
        timer.mark("lock");
        timer.report();

        if kind != OutcomeKind::Frame && !shared.idle_backoff.is_zero() {
            thread::sleep(shared.idle_backoff);
        }
    }

    info!("{}: acquisition loop exited", label);
    source
}

fn live_slot(
    shared: &Shared,
    source: &mut dyn SampleSource,
    frame: RawFrame,
    sequence: u64,
) -> StreamResult<FrameSlot> {
    let mut geometry = shared.lock_frames().geometry;
    if !geometry.is_discovered() {
        let (width, height) = source.query_geometry().map_err(|e| {
            e.with_operation("query_geometry")
                .with_context(shared.label.clone())
        })?;
        geometry.discover(width, height)?;
        shared.lock_frames().geometry = geometry;
        info!("{}: stream geometry {}x{}", shared.label, width, height);
    }

    geometry
        .check_len(frame.len())
        .map_err(|e| e.with_context(shared.label.clone()))?;
    let Some((width, height)) = geometry.dimensions() else {
        return Err(StreamError::geometry_unavailable("geometry lost"));
    };

    let descriptor = &shared.descriptor;
    let images = extract(
        frame.into_pixels(),
        width,
        height,
        descriptor.stream_type,
        descriptor.side,
    )
    .map_err(|e| StreamError::mapping(e.to_string()))?;
    Ok(FrameSlot::live(images, sequence))
}

fn placeholder_for(shared: &Shared, error: &StreamError) -> (FrameSlot, OutcomeKind) {
    log!(classify::log_level(error), "{}: {}", shared.label, error);
    match error {
        StreamError::EndOfStream { .. } => {
            (shared.placeholders.error_slot(), OutcomeKind::EndOfStream)
        }
        StreamError::RuntimeStream { .. } => {
            (shared.placeholders.error_slot(), OutcomeKind::StreamError)
        }
        _ => (shared.placeholders.no_data_slot(), OutcomeKind::Unavailable),
    }
}

fn fail(shared: &Shared, error: StreamError) {
    log!(
        classify::log_level(&error),
        "{}: {}; acquisition stopped",
        shared.label,
        error
    );
    shared.push(shared.placeholders.failed_slot());
    shared.record_failure(error);
    shared.set_state(StreamState::Failed);
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::pipeline::SampleOutcome;

    /// Replays a fixed list of outcomes, then reports end of stream.
    struct Scripted {
        outcomes: VecDeque<SampleOutcome>,
        geometry: (i32, i32),
    }

    impl SampleSource for Scripted {
        fn pull_next(&mut self) -> SampleOutcome {
            self.outcomes.pop_front().unwrap_or(SampleOutcome::EndOfStream)
        }

        fn query_geometry(&mut self) -> StreamResult<(i32, i32)> {
            Ok(self.geometry)
        }
    }

    fn quiet_config() -> AcquisitionConfig {
        AcquisitionConfig {
            idle_backoff_ms: 1,
            early_failure_timeout_ms: 0,
            ..AcquisitionConfig::default()
        }
    }

    #[test]
    fn test_degraded_serves_placeholders() {
        let desc = StreamDescriptor::new("front", 5000).nominal_size(64, 32);
        let mut stream = StreamPipeline::degraded(
            desc,
            &quiet_config(),
            StreamError::build("udpsrc ! bogus", "no element \"bogus\""),
        );
        assert_eq!(stream.state(), StreamState::Idle);

        let image = stream.get_image(Side::Left);
        assert_eq!((image.width(), image.height()), (64, 32));
        assert_eq!(image.caption(), Some("[left]front"));
        assert_eq!(stream.failure().map(|e| e.category()), Some("build"));

        stream.stop();
        stream.join();
        assert_eq!(stream.state(), StreamState::Stopped);
    }

    #[test]
    fn test_fixed_side_overrides_request() {
        let desc = StreamDescriptor::new("cam", 5002)
            .side(Side::Right)
            .nominal_size(32, 16);
        let stream = StreamPipeline::degraded(desc, &quiet_config(), StreamError::init("test"));
        assert_eq!(stream.get_image(Side::Left).caption(), Some("[right]cam"));
        assert_eq!(stream.get_image(Side::Both).caption(), Some("[right]cam"));
    }

    #[test]
    fn test_size_mismatch_fails_stream() {
        let desc = StreamDescriptor::new("cam", 5003).nominal_size(16, 8);
        let source = Scripted {
            outcomes: VecDeque::from(vec![
                SampleOutcome::Sample(RawFrame::from_vec(vec![0; 4 * 2 * 3])),
                SampleOutcome::Sample(RawFrame::from_vec(vec![0; 8 * 2 * 3])),
            ]),
            geometry: (4, 2),
        };
        let mut stream = StreamPipeline::with_source(desc, &quiet_config(), source);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while stream.state() != StreamState::Failed && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(stream.state(), StreamState::Failed);
        assert_eq!(stream.failure().map(|e| e.category()), Some("size_invariant"));
        assert_eq!(stream.stats().frames, 1);

        stream.stop();
        stream.join();
        assert_eq!(stream.state(), StreamState::Failed);
    }

    #[cfg(feature = "gst-pipeline")]
    #[test]
    fn test_bad_launch_degrades() {
        let desc = StreamDescriptor::new("cam", 5004).nominal_size(32, 16);
        let mut stream = StreamPipeline::with_launch(
            desc,
            &quiet_config(),
            "udpsrc port=5004 ! no_such_element_xyz ! appsink name=appsink5004",
        );
        assert_eq!(stream.state(), StreamState::Idle);
        assert_eq!(stream.failure().map(|e| e.category()), Some("build"));
        assert_eq!(stream.get_image(Side::Left).caption(), Some("[left]cam"));

        stream.stop();
        stream.join();
        assert_eq!(stream.state(), StreamState::Stopped);
    }
}
