//! Mock line source for running without hardware
//!
//! Generates numeric text lines at a fixed rate from a configurable pattern,
//! optionally sprinkling in non-numeric chatter to exercise the
//! "log it, don't plot it" path.
//!
//! # Data Patterns
//!
//! - [`MockDataPattern::Constant`] - Fixed value
//! - [`MockDataPattern::Sine`] - Sinusoidal wave with configurable frequency/amplitude
//! - [`MockDataPattern::Counter`] - Incrementing counter with wrap-around
//! - [`MockDataPattern::Square`] - Square wave alternating between two values
//!
//! # Enabling
//!
//! Only available when the `mock-serial` feature is enabled:
//!
//! ```bash
//! cargo run --features mock-serial -- --mock
//! ```

use super::{LineSource, PortSettings, SourceFactory};
use crate::error::Result;
use crate::types::RawLine;
use std::time::{Duration, Instant};

/// Pattern for generating mock data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockDataPattern {
    /// Constant value
    Constant(f64),
    /// Sine wave with frequency and amplitude
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Counter that increments
    Counter { step: f64, min: f64, max: f64 },
    /// Square wave
    Square { period: f64, amplitude: f64 },
}

impl Default for MockDataPattern {
    fn default() -> Self {
        MockDataPattern::Sine {
            frequency: 1.0,
            amplitude: 100.0,
            offset: 0.0,
        }
    }
}

/// Line source that synthesises numeric lines
#[derive(Debug, Clone)]
pub struct MockLineSource {
    pattern: MockDataPattern,
    interval: Duration,
    /// Every n-th line is text instead of a number (0 = never)
    chatter_every: u64,
    started: Instant,
    next_due: Instant,
    emitted: u64,
    counter_value: f64,
}

impl MockLineSource {
    /// Create a source emitting `rate_hz` lines per second
    pub fn new(pattern: MockDataPattern, rate_hz: u32) -> Self {
        let now = Instant::now();
        Self {
            pattern,
            interval: Duration::from_micros(1_000_000 / rate_hz.max(1) as u64),
            chatter_every: 0,
            started: now,
            next_due: now,
            emitted: 0,
            counter_value: 0.0,
        }
    }

    /// Emit a non-numeric status line every `n` lines
    pub fn with_chatter(mut self, n: u64) -> Self {
        self.chatter_every = n;
        self
    }

    /// Generate a value based on the pattern and elapsed time
    fn generate_value(&mut self, elapsed_secs: f64) -> f64 {
        match self.pattern {
            MockDataPattern::Constant(v) => v,
            MockDataPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * elapsed_secs).sin(),
            MockDataPattern::Counter { step, min, max } => {
                self.counter_value += step;
                if self.counter_value > max {
                    self.counter_value = min;
                }
                self.counter_value
            }
            MockDataPattern::Square { period, amplitude } => {
                if (elapsed_secs % period) < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
        }
    }
}

impl LineSource for MockLineSource {
    fn next_line(&mut self, timeout: Duration) -> Result<Option<RawLine>> {
        let now = Instant::now();
        if self.next_due > now {
            let wait = self.next_due - now;
            if wait > timeout {
                std::thread::sleep(timeout);
                return Ok(None);
            }
            std::thread::sleep(wait);
        }
        self.next_due += self.interval;
        self.emitted += 1;

        if self.chatter_every > 0 && self.emitted % self.chatter_every == 0 {
            return Ok(Some(RawLine::new(format!("status: tick {}", self.emitted))));
        }

        let value = self.generate_value(self.started.elapsed().as_secs_f64());
        Ok(Some(RawLine::new(format!("{:.4}", value))))
    }

    fn describe(&self) -> String {
        format!("mock ({:?})", self.pattern)
    }
}

/// Opens a [`MockLineSource`] regardless of the configured port
#[derive(Debug, Clone)]
pub struct MockSourceFactory {
    pattern: MockDataPattern,
    rate_hz: u32,
    chatter_every: u64,
}

impl MockSourceFactory {
    pub fn new(pattern: MockDataPattern, rate_hz: u32) -> Self {
        Self {
            pattern,
            rate_hz,
            chatter_every: 0,
        }
    }

    pub fn with_chatter(mut self, n: u64) -> Self {
        self.chatter_every = n;
        self
    }
}

impl SourceFactory for MockSourceFactory {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn LineSource>> {
        tracing::info!("Using mock source in place of {}", settings.port);
        Ok(Box::new(
            MockLineSource::new(self.pattern, self.rate_hz).with_chatter(self.chatter_every),
        ))
    }
}
