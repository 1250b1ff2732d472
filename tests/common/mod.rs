//! Common test utilities for the teleop-frames integration tests
//!
//! Provides scripted [`SampleSource`] implementations that stand in for a
//! GStreamer pipeline, frame builders and polling helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use teleop_frames::config::AcquisitionConfig;
use teleop_frames::pipeline::{BusEvent, RawFrame, SampleOutcome, SampleSource};
use teleop_frames::{StreamError, StreamResult};

/// Observations a test can make about a source after it moved into the worker.
#[derive(Clone, Default)]
pub struct Probe {
    pulls: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl Probe {
    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// Source whose outcomes are fed one by one through a channel.
///
/// `pull_next` blocks until the test sends the next outcome, which makes the
/// queue contents deterministic. Once the sender is dropped every pull
/// returns end of stream.
pub struct GatedSource {
    rx: Receiver<SampleOutcome>,
    geometry: Mutex<VecDeque<StreamResult<(i32, i32)>>>,
    fallback_geometry: (i32, i32),
    early_failure: Option<StreamError>,
    probe: Probe,
}

impl GatedSource {
    pub fn new(width: i32, height: i32) -> (Self, Sender<SampleOutcome>, Probe) {
        let (tx, rx) = mpsc::channel();
        let probe = Probe::default();
        let source = Self {
            rx,
            geometry: Mutex::new(VecDeque::new()),
            fallback_geometry: (width, height),
            early_failure: None,
            probe: probe.clone(),
        };
        (source, tx, probe)
    }

    /// Answers the first geometry queries with `results`, then with the fallback.
    pub fn with_geometry_results(self, results: Vec<StreamResult<(i32, i32)>>) -> Self {
        *self.geometry.lock().unwrap() = results.into();
        self
    }

    pub fn with_early_failure(mut self, error: StreamError) -> Self {
        self.early_failure = Some(error);
        self
    }
}

impl SampleSource for GatedSource {
    fn pull_next(&mut self) -> SampleOutcome {
        self.probe.pulls.fetch_add(1, Ordering::SeqCst);
        match self.rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => {
                thread::sleep(Duration::from_millis(1));
                SampleOutcome::EndOfStream
            }
        }
    }

    fn query_geometry(&mut self) -> StreamResult<(i32, i32)> {
        self.geometry
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback_geometry))
    }

    fn poll_early_failure(&mut self, _timeout: Duration) -> Option<StreamError> {
        self.early_failure.take()
    }

    fn shutdown(&mut self) {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Source that never produces a frame: every pull is end of stream.
pub struct EndedSource {
    probe: Probe,
}

impl EndedSource {
    pub fn new() -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl SampleSource for EndedSource {
    fn pull_next(&mut self) -> SampleOutcome {
        self.probe.pulls.fetch_add(1, Ordering::SeqCst);
        SampleOutcome::EndOfStream
    }

    fn query_geometry(&mut self) -> StreamResult<(i32, i32)> {
        Err(StreamError::geometry_unavailable("no caps"))
    }

    fn shutdown(&mut self) {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Packed-RGB frame; left half filled with `left`, right half with `right`.
pub fn split_frame(width: usize, height: usize, left: [u8; 3], right: [u8; 3]) -> RawFrame {
    let mut data = Vec::with_capacity(width * height * 3);
    for _ in 0..height {
        for x in 0..width {
            data.extend_from_slice(if x < width / 2 { &left } else { &right });
        }
    }
    RawFrame::from_vec(data)
}

/// Packed-RGB frame of one color.
pub fn solid_frame(width: usize, height: usize, color: [u8; 3]) -> RawFrame {
    split_frame(width, height, color, color)
}

pub fn sample(frame: RawFrame) -> SampleOutcome {
    SampleOutcome::Sample(frame)
}

pub fn bus_error(message: &str) -> SampleOutcome {
    SampleOutcome::StreamError(BusEvent {
        element: Some("rtph264depay0".to_string()),
        message: message.to_string(),
        debug: None,
    })
}

/// Acquisition settings with no early-failure wait and a short backoff.
pub fn fast_config() -> AcquisitionConfig {
    AcquisitionConfig {
        early_failure_timeout_ms: 0,
        idle_backoff_ms: 1,
        ..AcquisitionConfig::default()
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

pub const WAIT: Duration = Duration::from_secs(5);
