//! Session types

use crate::error::{LoggerError, Result};
use crate::sink::FlushPolicy;
use crate::source::PortSettings;
use crate::types::ParserMode;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Lifecycle state of the session controller
///
/// A failed start or a fatal error mid-session returns the controller to
/// `Idle`; the failure itself is reported through `last_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// No session; a start request is accepted
    #[default]
    Idle = 0,
    /// Opening transport and log file
    Starting = 1,
    /// Acquisition loop is running
    Running = 2,
    /// Stop requested; waiting for the loop to observe it
    Stopping = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Starting,
            2 => SessionState::Running,
            3 => SessionState::Stopping,
            _ => SessionState::Idle,
        }
    }

    /// Whether a session currently holds the transport
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Stopping => write!(f, "Stopping"),
        }
    }
}

/// Atomic cell holding a [`SessionState`], shared with the acquisition thread
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Move from `from` to `to`; returns false if the state was something else
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

/// Everything needed to start a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Transport settings
    pub port: PortSettings,
    /// Log file; created or truncated at start
    pub output_path: Option<PathBuf>,
    /// Parsing strategy, fixed for the session
    pub mode: ParserMode,
    /// Structured-mode field fed to the live window
    pub plot_field: Option<String>,
    /// Durability of each appended row
    pub flush: FlushPolicy,
}

impl SessionConfig {
    pub fn new(port: PortSettings, output_path: impl Into<PathBuf>) -> Self {
        Self {
            port,
            output_path: Some(output_path.into()),
            mode: ParserMode::default(),
            plot_field: None,
            flush: FlushPolicy::default(),
        }
    }

    pub fn with_mode(mut self, mode: ParserMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_plot_field(mut self, field: impl Into<String>) -> Self {
        self.plot_field = Some(field.into());
        self
    }

    pub fn with_flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }

    /// Check the settings without touching the device or the disk
    pub fn validate(&self) -> Result<&PathBuf> {
        self.port.validate()?;
        match &self.output_path {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(LoggerError::Config("No output file selected".to_string())),
        }
    }
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new acquisition loop is running
    Started,
    /// A session was already active; nothing changed
    AlreadyRunning,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stopped on request
    Stopped,
    /// Ended by a transport or log write error
    Failed(String),
}

/// Counters of one finished session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Lines read from the transport
    pub records: u64,
    /// Samples pushed to the live window
    pub samples: u64,
    /// Lines the parser could not interpret (still logged)
    pub unparsed: u64,
    /// Data rows confirmed in the log file
    pub rows_written: u64,
    /// Display lines discarded by a bounded relay
    pub dropped_display_lines: u64,
    /// Time from start to loop exit
    pub duration: Duration,
    pub output_path: PathBuf,
    pub outcome: SessionOutcome,
}

impl SessionSummary {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, SessionOutcome::Failed(_))
    }
}
