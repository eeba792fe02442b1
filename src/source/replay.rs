//! Replay line source
//!
//! Feeds previously captured lines through the pipeline as if they were
//! arriving from a device. Used by `--replay` and by the integration tests.

use super::{LineSource, PortSettings, SourceFactory};
use crate::error::{LoggerError, Result};
use crate::types::RawLine;
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};

/// What a replay does once its script is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayEnd {
    /// Keep reporting timeouts until stopped
    #[default]
    Idle,
    /// Fail like an unplugged device
    Disconnect,
}

/// Line source that replays a fixed script
#[derive(Debug, Clone)]
pub struct ReplaySource {
    lines: VecDeque<String>,
    interval: Duration,
    end: ReplayEnd,
    last_emit: Option<Instant>,
    closed: bool,
}

impl ReplaySource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            interval: Duration::ZERO,
            end: ReplayEnd::Idle,
            last_emit: None,
            closed: false,
        }
    }

    /// Load a capture file, one record per line
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::Config(format!("Failed to read replay file {:?}: {}", path, e))
        })?;
        Ok(Self::new(content.lines()))
    }

    /// Minimum spacing between emitted lines
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_end(mut self, end: ReplayEnd) -> Self {
        self.end = end;
        self
    }

    /// Lines not yet emitted
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for ReplaySource {
    fn next_line(&mut self, timeout: Duration) -> Result<Option<RawLine>> {
        if self.closed {
            return Err(LoggerError::Disconnected);
        }

        if self.lines.is_empty() {
            return match self.end {
                ReplayEnd::Idle => {
                    std::thread::sleep(timeout);
                    Ok(None)
                }
                ReplayEnd::Disconnect => Err(LoggerError::Disconnected),
            };
        }

        if let Some(last) = self.last_emit {
            let due = last + self.interval;
            let now = Instant::now();
            if due > now {
                let wait = due - now;
                if wait > timeout {
                    std::thread::sleep(timeout);
                    return Ok(None);
                }
                std::thread::sleep(wait);
            }
        }

        self.last_emit = Some(Instant::now());
        Ok(self.lines.pop_front().map(RawLine::new))
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn describe(&self) -> String {
        format!("replay ({} lines left)", self.lines.len())
    }
}

/// Opens a fresh [`ReplaySource`] for every session
#[derive(Debug, Clone)]
pub struct ReplaySourceFactory {
    template: ReplaySource,
}

impl ReplaySourceFactory {
    pub fn new(template: ReplaySource) -> Self {
        Self { template }
    }
}

impl SourceFactory for ReplaySourceFactory {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn LineSource>> {
        tracing::info!("Replaying {} lines in place of {}", self.template.remaining(), settings.port);
        Ok(Box::new(self.template.clone()))
    }
}
