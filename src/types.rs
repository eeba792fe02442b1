//! Core data types for the serial logger
//!
//! This module contains the data model shared by every pipeline stage.
//!
//! # Main Types
//!
//! - [`RawLine`] - One line of text as it arrived from the transport
//! - [`Record`] - Tagged result of parsing a line
//! - [`ParsedRecord`] - A parsed line ready for the log, the display and the window
//! - [`Sample`] - A (time, value) pair eligible for live plotting
//! - [`ParserMode`] - Parsing strategy, fixed for a session
//!
//! # Timebase
//!
//! Every line carries both a monotonic [`Instant`] (used for the plot's
//! `elapsed_seconds`, which can never run backwards) and a wall-clock
//! timestamp (used for the log file and display text).

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Default capacity of the live window
pub const DEFAULT_WINDOW_CAPACITY: usize = 20_000;

/// Marker written to the `State` column for structured lines that could not be split
pub const UNPARSED_MARKER: &str = "UNPARSED";

/// A single line of text received from the transport
#[derive(Debug, Clone)]
pub struct RawLine {
    /// Line content with terminator and surrounding whitespace removed
    pub text: String,
    /// Monotonic arrival time
    pub received_at: Instant,
    /// Wall-clock arrival time
    pub wall_time: DateTime<Local>,
}

impl RawLine {
    /// Create a line stamped with the current time
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Instant::now(),
            wall_time: Local::now(),
        }
    }

    /// Create a line with explicit timestamps
    pub fn at(text: impl Into<String>, received_at: Instant, wall_time: DateTime<Local>) -> Self {
        Self {
            text: text.into(),
            received_at,
            wall_time,
        }
    }

    /// Seconds between `session_start` and the arrival of this line
    ///
    /// Lines stamped before the session started clamp to zero.
    pub fn elapsed_since(&self, session_start: Instant) -> f64 {
        self.received_at
            .saturating_duration_since(session_start)
            .as_secs_f64()
    }
}

/// A point in the live window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Seconds since the session started
    pub elapsed_seconds: f64,
    /// Parsed numeric value
    pub value: f64,
}

impl Sample {
    pub fn new(elapsed_seconds: f64, value: f64) -> Self {
        Self {
            elapsed_seconds,
            value,
        }
    }
}

/// Parsing strategy used for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParserMode {
    /// Every line is a single number (`Timestamp,Data` log)
    #[default]
    Numeric,
    /// Lines are `Key: value, Key: value` pairs (`Timestamp,State,Raw,Current` log)
    Structured,
}

impl ParserMode {
    /// Column names of the log file, header order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ParserMode::Numeric => &["Timestamp", "Data"],
            ParserMode::Structured => &["Timestamp", "State", "Raw", "Current"],
        }
    }

    /// Format a wall-clock time the way this mode writes it to the log
    pub fn format_timestamp(&self, time: &DateTime<Local>) -> String {
        match self {
            ParserMode::Numeric => time.format("%H:%M:%S%.3f").to_string(),
            ParserMode::Structured => time.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        }
    }
}

impl std::fmt::Display for ParserMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserMode::Numeric => write!(f, "numeric"),
            ParserMode::Structured => write!(f, "structured"),
        }
    }
}

impl std::str::FromStr for ParserMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" | "plain" => Ok(ParserMode::Numeric),
            "structured" | "kv" | "key-value" => Ok(ParserMode::Structured),
            other => Err(format!("unknown parser mode '{}'", other)),
        }
    }
}

/// Key/value pairs recovered from a structured line, in line order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredFields {
    pairs: Vec<(String, String)>,
}

impl StructuredFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Value of the last pair named `key`; a repeated key overrides earlier ones
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key`, or an empty string when absent
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Tagged result of parsing one line
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// The whole line is a number
    Numeric(f64),
    /// The line split into key/value pairs
    Structured(StructuredFields),
    /// Nothing usable; the raw text is kept
    Unparsed(String),
}

impl Record {
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Record::Unparsed(_))
    }
}

/// A parsed line, ready to be logged, displayed and (maybe) plotted
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    /// Monotonic arrival time of the source line
    pub received_at: Instant,
    /// Human-readable line for the display log
    pub display_text: String,
    /// Plottable value, when the line carried one
    pub numeric_value: Option<f64>,
    /// Log row as (column, value) pairs in header order
    pub log_fields: Vec<(&'static str, String)>,
    /// What the parser made of the line
    pub record: Record,
    /// Window sample derived from `numeric_value`
    pub sample: Option<Sample>,
}

impl ParsedRecord {
    /// Values of the log row, in column order
    pub fn row(&self) -> impl Iterator<Item = &str> {
        self.log_fields.iter().map(|(_, v)| v.as_str())
    }

    /// Value of a log column by name
    pub fn field(&self, column: &str) -> Option<&str> {
        self.log_fields
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_str())
    }
}
