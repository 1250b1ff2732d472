//! # Acquisition Timing and Counters
//!
//! [`StageTimer`] splits one loop iteration into named stages and reports them
//! at trace level. [`AcquisitionStats`] accumulates per-stream counters that
//! both threads update without taking the queue lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{Level, log_enabled, trace};

/// Timing for the stages of one acquisition iteration.
#[derive(Debug)]
pub struct StageTimer<'a> {
    label: &'a str,
    started: Instant,
    last: Instant,
    stages: Vec<(&'static str, Duration)>,
}

impl<'a> StageTimer<'a> {
    pub fn start(label: &'a str) -> Self {
        let now = Instant::now();
        Self {
            label,
            started: now,
            last: now,
            stages: Vec::with_capacity(4),
        }
    }

    /// Closes the current stage under `stage`.
    pub fn mark(&mut self, stage: &'static str) {
        let now = Instant::now();
        self.stages.push((stage, now - self.last));
        self.last = now;
    }

    pub fn stages(&self) -> &[(&'static str, Duration)] {
        &self.stages
    }

    pub fn total(&self) -> Duration {
        self.last - self.started
    }

    /// Logs all stages on one trace line.
    pub fn report(&self) {
        if !log_enabled!(Level::Trace) {
            return;
        }
        let stages = self
            .stages
            .iter()
            .map(|(name, d)| format!("{}={}us", name, d.as_micros()))
            .collect::<Vec<_>>()
            .join(" ");
        trace!(
            "{}: iteration {}us [{}]",
            self.label,
            self.total().as_micros(),
            stages
        );
    }
}

/// Counters for one stream.
#[derive(Debug, Default)]
pub struct AcquisitionStats {
    frames: AtomicU64,
    stream_errors: AtomicU64,
    end_of_stream: AtomicU64,
    unavailable: AtomicU64,
    evictions: AtomicU64,
    consumer_trims: AtomicU64,
}

/// Point-in-time copy of [`AcquisitionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Live frames pushed into the queue
    pub frames: u64,
    /// Bus error messages
    pub stream_errors: u64,
    /// End-of-stream outcomes
    pub end_of_stream: u64,
    /// Pulls without a usable sample, including geometry retries
    pub unavailable: u64,
    /// Slots dropped by the producer at the bound
    pub evictions: u64,
    /// Slots dropped by the consumer in `get_image`
    pub consumer_trims: u64,
}

/// Kind of outcome one acquisition iteration produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Frame,
    StreamError,
    EndOfStream,
    Unavailable,
}

impl AcquisitionStats {
    pub fn record(&self, kind: OutcomeKind) {
        let counter = match kind {
            OutcomeKind::Frame => &self.frames,
            OutcomeKind::StreamError => &self.stream_errors,
            OutcomeKind::EndOfStream => &self.end_of_stream,
            OutcomeKind::Unavailable => &self.unavailable,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumer_trims(&self, count: u64) {
        if count > 0 {
            self.consumer_trims.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
            end_of_stream: self.end_of_stream.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            consumer_trims: self.consumer_trims.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Every outcome the producer has seen, live or not.
    pub fn outcomes(&self) -> u64 {
        self.frames + self.stream_errors + self.end_of_stream + self.unavailable
    }
}
