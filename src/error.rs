//! # Stream Error Handling
//!
//! Error types for the frame-acquisition core. Every failure at the decode
//! boundary is turned into a [`StreamError`] carrying an [`ErrorContext`]
//! (timestamp, operation, free-form context and severity).
//!
//! ## Classification
//!
//! Errors classify themselves through [`Recoverable::fallback`] into a
//! [`FallbackAction`]. The acquisition loop routes on that action:
//!
//! - `Placeholder`: emit a placeholder slot and keep looping
//! - `Retry`: keep the current state and try again on the next sample
//! - `Degrade`: no acquisition thread, serve placeholders only
//! - `Abort`: stop acquiring for this stream (state `Failed`)
//!
//! ## Usage
//!
//! ```rust
//! use teleop_frames::error::{FallbackAction, Recoverable, StreamError};
//!
//! let error = StreamError::size_invariant(1280 * 720 * 3, 640 * 480 * 3)
//!     .with_context("cam-front:5000");
//! assert_eq!(error.fallback(), FallbackAction::Abort);
//! ```

use std::{error::Error as StdError, fmt, io, sync::Arc, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, nothing is lost
    Info,
    /// One frame or one query was lost
    Warning,
    /// The stream runs degraded
    Error,
    /// The stream stopped acquiring
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context, usually the stream label
    pub context: Option<String>,
    pub severity: ErrorSeverity,
}

impl ErrorContext {
    pub fn new(severity: ErrorSeverity) -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            severity,
        }
    }
}

/// Errors produced by the acquisition core
#[derive(Debug, Clone)]
pub enum StreamError {
    /// The media framework could not be initialized
    Init {
        reason: String,
        context: ErrorContext,
    },
    /// Malformed pipeline description or missing sink element
    Build {
        description: String,
        reason: String,
        context: ErrorContext,
    },
    /// Transition to a run state failed
    StateChange {
        target: String,
        reason: String,
        context: ErrorContext,
    },
    /// Error message posted on the pipeline bus
    RuntimeStream {
        element: Option<String>,
        message: String,
        debug: Option<String>,
        context: ErrorContext,
    },
    /// End-of-stream posted on the bus or reported by the sink
    EndOfStream { context: ErrorContext },
    /// Sample present but its buffer could not be read
    Mapping {
        reason: String,
        context: ErrorContext,
    },
    /// Negotiated width/height could not be read
    GeometryUnavailable {
        reason: String,
        context: ErrorContext,
    },
    /// Decoded payload size does not match the discovered geometry
    SizeInvariant {
        expected: usize,
        actual: usize,
        context: ErrorContext,
    },
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: Arc<io::Error>,
        context: ErrorContext,
    },
    /// Configuration parse errors
    Parse {
        reason: String,
        line: usize,
        column: usize,
        context: ErrorContext,
    },
}

impl StreamError {
    pub fn init(reason: impl Into<String>) -> Self {
        Self::Init {
            reason: reason.into(),
            context: ErrorContext::new(ErrorSeverity::Error),
        }
    }

    pub fn build(description: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            description: description.into(),
            reason: reason.into(),
            context: ErrorContext::new(ErrorSeverity::Error),
        }
    }

    pub fn state_change(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StateChange {
            target: target.into(),
            reason: reason.into(),
            context: ErrorContext::new(ErrorSeverity::Error),
        }
    }

    pub fn runtime_stream(
        element: Option<String>,
        message: impl Into<String>,
        debug: Option<String>,
    ) -> Self {
        Self::RuntimeStream {
            element,
            message: message.into(),
            debug,
            context: ErrorContext::new(ErrorSeverity::Warning),
        }
    }

    pub fn end_of_stream() -> Self {
        Self::EndOfStream {
            context: ErrorContext::new(ErrorSeverity::Info),
        }
    }

    pub fn mapping(reason: impl Into<String>) -> Self {
        Self::Mapping {
            reason: reason.into(),
            context: ErrorContext::new(ErrorSeverity::Warning),
        }
    }

    pub fn geometry_unavailable(reason: impl Into<String>) -> Self {
        Self::GeometryUnavailable {
            reason: reason.into(),
            context: ErrorContext::new(ErrorSeverity::Warning),
        }
    }

    pub fn size_invariant(expected: usize, actual: usize) -> Self {
        Self::SizeInvariant {
            expected,
            actual,
            context: ErrorContext::new(ErrorSeverity::Fatal),
        }
    }

    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(ErrorSeverity::Error),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source: Arc::new(source),
            context: ErrorContext::new(ErrorSeverity::Error),
        }
    }

    /// Attach the path an I/O error refers to
    pub fn with_path(mut self, new_path: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(new_path.into());
        }
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Override the default severity, which decides the log level
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Init { context, .. } => context,
            Self::Build { context, .. } => context,
            Self::StateChange { context, .. } => context,
            Self::RuntimeStream { context, .. } => context,
            Self::EndOfStream { context } => context,
            Self::Mapping { context, .. } => context,
            Self::GeometryUnavailable { context, .. } => context,
            Self::SizeInvariant { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Parse { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Init { context, .. } => context,
            Self::Build { context, .. } => context,
            Self::StateChange { context, .. } => context,
            Self::RuntimeStream { context, .. } => context,
            Self::EndOfStream { context } => context,
            Self::Mapping { context, .. } => context,
            Self::GeometryUnavailable { context, .. } => context,
            Self::SizeInvariant { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::Parse { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Build { .. } => "build",
            Self::StateChange { .. } => "state_change",
            Self::RuntimeStream { .. } => "runtime_stream",
            Self::EndOfStream { .. } => "end_of_stream",
            Self::Mapping { .. } => "mapping",
            Self::GeometryUnavailable { .. } => "geometry",
            Self::SizeInvariant { .. } => "size_invariant",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Init { reason, .. } => {
                write!(f, "Failed to initialize GStreamer: {}", reason)
            }
            StreamError::Build {
                description,
                reason,
                ..
            } => {
                write!(f, "Failed to build pipeline '{}': {}", description, reason)
            }
            StreamError::StateChange { target, reason, .. } => {
                write!(f, "Failed to set pipeline to {}: {}", target, reason)
            }
            StreamError::RuntimeStream {
                element,
                message,
                debug,
                ..
            } => {
                match element {
                    Some(element) => write!(f, "Stream error from '{}': {}", element, message)?,
                    None => write!(f, "Stream error: {}", message)?,
                }
                if let Some(debug) = debug {
                    write!(f, " ({})", debug)?;
                }
                Ok(())
            }
            StreamError::EndOfStream { .. } => write!(f, "End of stream"),
            StreamError::Mapping { reason, .. } => {
                write!(f, "Failed to map sample buffer: {}", reason)
            }
            StreamError::GeometryUnavailable { reason, .. } => {
                write!(f, "Stream geometry unavailable: {}", reason)
            }
            StreamError::SizeInvariant {
                expected, actual, ..
            } => {
                write!(
                    f,
                    "Decoded frame is {} bytes, geometry requires {}",
                    actual, expected
                )
            }
            StreamError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            StreamError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            StreamError::Parse {
                reason,
                line,
                column,
                ..
            } => {
                write!(
                    f,
                    "Invalid configuration at {}:{}: {}",
                    line, column, reason
                )
            }
        }
    }
}

impl StdError for StreamError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type StreamResult<T> = Result<T, StreamError>;

/// What the acquisition loop does after an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAction {
    /// Push a placeholder slot and continue
    Placeholder,
    /// Leave state untouched and try again on the next sample
    Retry,
    /// Run without an acquisition thread
    Degrade,
    /// Stop acquiring for this stream
    Abort,
}

/// Trait for errors that can be recovered from
pub trait Recoverable {
    /// Check if this error can be recovered from
    fn is_recoverable(&self) -> bool {
        self.fallback() != FallbackAction::Abort
    }

    /// Get the fallback the caller should apply
    fn fallback(&self) -> FallbackAction;
}

impl Recoverable for StreamError {
    fn fallback(&self) -> FallbackAction {
        match self {
            Self::RuntimeStream { .. } | Self::EndOfStream { .. } | Self::Mapping { .. } => {
                FallbackAction::Placeholder
            }
            Self::GeometryUnavailable { .. } => FallbackAction::Retry,
            Self::Init { .. } | Self::Build { .. } | Self::StateChange { .. } => {
                FallbackAction::Degrade
            }
            Self::SizeInvariant { .. }
            | Self::Config { .. }
            | Self::Io { .. }
            | Self::Parse { .. } => FallbackAction::Abort,
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for StreamError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Map severity onto a `log` level.
    ///
    /// `Info` errors repeat on every iteration of an ended stream, so they
    /// land at debug.
    pub fn log_level(error: &StreamError) -> log::Level {
        match error.severity() {
            ErrorSeverity::Info => log::Level::Debug,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error | ErrorSeverity::Fatal => log::Level::Error,
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(error: io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse {
            reason: error.to_string(),
            line: error.line(),
            column: error.column(),
            context: ErrorContext::new(ErrorSeverity::Error),
        }
    }
}
