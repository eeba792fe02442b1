//! Line sources
//!
//! A [`LineSource`] produces the raw text lines of a session, each stamped
//! with its arrival time. Reads block for at most one poll interval so the
//! acquisition loop can notice a stop request between lines.
//!
//! # Components
//!
//! - [`LineReader`] - Line assembly over any byte reader whose reads time out
//! - [`SerialLineSource`] - A [`LineReader`] over a `serialport` device
//! - [`ReplaySource`] - Replays captured lines without hardware
//! - [`SourceFactory`] - Opens the source for a session; the session
//!   controller only talks to this trait
//!
//! # Read Contract
//!
//! `next_line` returns:
//!
//! - `Ok(Some(line))` - a complete line
//! - `Ok(None)` - nothing arrived within the timeout (not an error)
//! - `Err(_)` - transport failure, fatal to the session

#[cfg(feature = "mock-serial")]
pub mod mock;
pub mod replay;
pub mod serial;

#[cfg(feature = "mock-serial")]
pub use mock::{MockDataPattern, MockLineSource, MockSourceFactory};
pub use replay::{ReplayEnd, ReplaySource, ReplaySourceFactory};
pub use serial::{SerialLineSource, SerialSourceFactory};

use crate::error::{LoggerError, Result};
use crate::types::RawLine;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::time::Duration;

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default time a read may block before the loop re-checks for a stop request
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Port name of sessions that do not open a device (replay, mock)
pub const VIRTUAL_PORT: &str = "virtual";

/// Longest line kept before it is cut into a record of its own
pub const MAX_LINE_BYTES: usize = 4096;

/// Transport settings for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    /// Device path or name (e.g. `/dev/ttyUSB0`, `COM3`)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Maximum time a single read may block
    pub poll_timeout: Duration,
}

impl PortSettings {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Reject settings no transport could open
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(LoggerError::Config("No serial port selected".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(LoggerError::Config(
                "Baud rate must be greater than zero".to_string(),
            ));
        }
        if self.poll_timeout.is_zero() {
            return Err(LoggerError::Config(
                "Poll timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_BAUD_RATE)
    }
}

/// A stream of timestamped text lines
pub trait LineSource: Send {
    /// Wait up to `timeout` for the next complete line
    fn next_line(&mut self, timeout: Duration) -> Result<Option<RawLine>>;

    /// Release the transport; later reads fail
    fn close(&mut self) {}

    /// Short human-readable name for logs
    fn describe(&self) -> String;
}

/// Opens the line source of a session
pub trait SourceFactory: Send {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn LineSource>>;
}

impl<F: SourceFactory + ?Sized> SourceFactory for Box<F> {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn LineSource>> {
        (**self).open(settings)
    }
}

/// Assembles newline-terminated lines from a byte reader
///
/// The reader is expected to fail reads with `TimedOut` or `WouldBlock` when
/// no data arrives; bytes of a partial line are kept across such timeouts.
/// End-of-stream is reported as [`LoggerError::Disconnected`] after any
/// trailing partial line has been returned.
pub struct LineReader<R> {
    reader: BufReader<R>,
    /// Bytes of the line being assembled
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    /// Read the next complete line, `Ok(None)` on timeout
    ///
    /// A line that grows past [`MAX_LINE_BYTES`] without a terminator is cut
    /// and returned as is; the rest continues as the next line.
    pub fn read_line(&mut self) -> Result<Option<RawLine>> {
        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(None);
                }
                Err(e) => return Err(LoggerError::Transport(e)),
            };

            if available.is_empty() {
                if self.pending.is_empty() {
                    return Err(LoggerError::Disconnected);
                }
                return Ok(Some(self.take_line()));
            }

            let room = MAX_LINE_BYTES - self.pending.len();
            let window = &available[..available.len().min(room)];
            match window.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.pending.extend_from_slice(&window[..=end]);
                    self.reader.consume(end + 1);
                    return Ok(Some(self.take_line()));
                }
                None => {
                    let taken = window.len();
                    self.pending.extend_from_slice(window);
                    self.reader.consume(taken);
                    if self.pending.len() >= MAX_LINE_BYTES {
                        tracing::warn!("Line exceeded {} bytes without a terminator", MAX_LINE_BYTES);
                        return Ok(Some(self.take_line()));
                    }
                }
            }
        }
    }

    /// Bytes received for a line that has not been terminated yet
    pub fn partial_len(&self) -> usize {
        self.pending.len()
    }

    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.reader.get_mut()
    }

    fn take_line(&mut self) -> RawLine {
        let text = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        RawLine::new(text)
    }
}
