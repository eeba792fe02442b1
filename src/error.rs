//! Error handling for the serial logger
//!
//! This module defines the crate error type, a Result alias, and the
//! classification used by the session controller to decide how an error is
//! surfaced (synchronously at start, or as a fatal session error).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for serial logger operations
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Invalid or missing session settings (port, baud rate, output path)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors reported by the serial port driver
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Read fault on an open transport
    #[error("Transport error: {0}")]
    Transport(#[source] std::io::Error),

    /// The transport reached end-of-stream (device unplugged)
    #[error("Device disconnected")]
    Disconnected,

    /// The durable log could not be written
    #[error("Failed to write log file {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LoggerError>,
    },
}

/// Coarse classification of a [`LoggerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad port, baud rate, or output path; reported before a session runs
    Configuration,
    /// Device disconnect or read fault; fatal to a running session
    Transport,
    /// Log file write failure; fatal to a running session
    Persistence,
    /// Anything else
    Internal,
}

impl LoggerError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LoggerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify this error, looking through any context wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoggerError::Config(_) | LoggerError::Serial(_) => ErrorKind::Configuration,
            LoggerError::Transport(_) | LoggerError::Disconnected => ErrorKind::Transport,
            LoggerError::Persistence { .. } => ErrorKind::Persistence,
            LoggerError::Io(_) | LoggerError::Serialization(_) => ErrorKind::Internal,
            LoggerError::WithContext { source, .. } => source.kind(),
        }
    }

    /// Whether this error must end a running session
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Persistence)
    }
}

/// Result type alias for serial logger operations
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
