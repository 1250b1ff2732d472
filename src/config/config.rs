//! # Acquisition Configuration
//!
//! Tunables for the acquisition loop and the stream-set file format shared by
//! the `teleop-view` binary and host applications.
//!
//! ## Parameters
//!
//! | Parameter | Type | Range | Default |
//! |-----------|------|-------|---------|
//! | `max_queued_frames` | `usize` | 3-64 | 10 |
//! | `early_failure_timeout_ms` | `u64` | any | 10 |
//! | `idle_backoff_ms` | `u64` | any (0 disables) | 5 |
//! | `caption_font` | path | optional | none |
//!
//! ## Example
//!
//! ```rust
//! use teleop_frames::config::StreamSetConfig;
//!
//! let set = StreamSetConfig::from_json(r#"{
//!     "acquisition": { "max_queued_frames": 4 },
//!     "streams": [ { "port": 5000, "name": "front" } ]
//! }"#)?;
//! assert_eq!(set.acquisition.max_queued_frames, 4);
//! # Ok::<(), teleop_frames::StreamError>(())
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::descriptor::StreamDescriptor;
use crate::error::{StreamError, StreamResult};

/// Smallest accepted queue bound. Trimming in `get_image` keeps two slots.
pub const MIN_QUEUED_FRAMES: usize = 3;
pub const MAX_QUEUED_FRAMES: usize = 64;

fn default_max_queued_frames() -> usize {
    10
}

fn default_early_failure_timeout_ms() -> u64 {
    10
}

fn default_idle_backoff_ms() -> u64 {
    5
}

/// Settings shared by every stream in a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Queue bound; the producer evicts the oldest slot at this size.
    #[serde(default = "default_max_queued_frames")]
    pub max_queued_frames: usize,
    /// Bounded bus wait right after the pipeline starts.
    #[serde(default = "default_early_failure_timeout_ms")]
    pub early_failure_timeout_ms: u64,
    /// Sleep after a non-sample outcome.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    /// Font used for placeholder captions.
    #[serde(default)]
    pub caption_font: Option<PathBuf>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_queued_frames: default_max_queued_frames(),
            early_failure_timeout_ms: default_early_failure_timeout_ms(),
            idle_backoff_ms: default_idle_backoff_ms(),
            caption_font: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn early_failure_timeout(&self) -> Duration {
        Duration::from_millis(self.early_failure_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn validate(&self) -> StreamResult<()> {
        if !(MIN_QUEUED_FRAMES..=MAX_QUEUED_FRAMES).contains(&self.max_queued_frames) {
            return Err(StreamError::config(
                "acquisition.max_queued_frames",
                self.max_queued_frames.to_string(),
                format!(
                    "must be between {} and {}",
                    MIN_QUEUED_FRAMES, MAX_QUEUED_FRAMES
                ),
            ));
        }
        Ok(())
    }
}

/// A set of streams plus the acquisition settings they share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSetConfig {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    pub streams: Vec<StreamDescriptor>,
}

impl StreamSetConfig {
    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self {
            acquisition: AcquisitionConfig::default(),
            streams,
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> StreamResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> StreamResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            StreamError::io("read stream set", e).with_path(path.display().to_string())
        })?;
        Self::from_json(&text).map_err(|e| e.with_context(path.display().to_string()))
    }

    pub fn validate(&self) -> StreamResult<()> {
        self.acquisition.validate()?;

        if self.streams.is_empty() {
            return Err(StreamError::config(
                "streams",
                "[]",
                "at least one stream is required",
            ));
        }

        let mut ports = HashSet::new();
        for (i, stream) in self.streams.iter().enumerate() {
            if stream.name.trim().is_empty() {
                return Err(StreamError::config(
                    format!("streams[{}].name", i),
                    stream.name.clone(),
                    "name must not be empty",
                ));
            }
            if stream.port == 0 {
                return Err(StreamError::config(
                    format!("streams[{}].port", i),
                    "0",
                    "port must be non-zero",
                ));
            }
            if !ports.insert(stream.port) {
                return Err(StreamError::config(
                    format!("streams[{}].port", i),
                    stream.port.to_string(),
                    "port is used by another stream",
                ));
            }
            if stream.width == 0 || stream.height == 0 {
                return Err(StreamError::config(
                    format!("streams[{}].width/height", i),
                    format!("{}x{}", stream.width, stream.height),
                    "nominal size must be non-zero",
                ));
            }
        }
        Ok(())
    }
}
