//! Record parsing
//!
//! Turns a [`RawLine`] into a [`ParsedRecord`]. Parsing never fails: a line
//! that cannot be interpreted is still returned as a loggable record, it just
//! carries no [`Sample`].
//!
//! Two strategies are provided, selected per session by [`ParserMode`]:
//!
//! - [`NumericParser`] - the whole line is one number
//! - [`StructuredParser`] - the line is `State: ON, Raw: 10, Current: 0.2`

use crate::types::{
    ParsedRecord, ParserMode, RawLine, Record, Sample, StructuredFields, UNPARSED_MARKER,
};
use std::time::Instant;

/// Separator between pairs of a structured line
pub const PAIR_DELIMITER: &str = ", ";

/// Separator between key and value inside a pair
pub const KEY_VALUE_DELIMITER: &str = ": ";

/// Designated columns of a structured line, in log order
pub const STRUCTURED_KEYS: [&str; 3] = ["State", "Raw", "Current"];

/// A parsing strategy
///
/// Implementations hold no per-line state, so one parser serves a whole session.
pub trait LineParser: Send {
    /// Parse a line received during the session that started at `session_start`
    fn parse(&self, line: RawLine, session_start: Instant) -> ParsedRecord;

    /// The mode (and therefore the log layout) this parser produces
    fn mode(&self) -> ParserMode;
}

/// Build the parser for a session
pub fn build_parser(mode: ParserMode, plot_field: Option<&str>) -> Box<dyn LineParser> {
    match mode {
        ParserMode::Numeric => Box::new(NumericParser),
        ParserMode::Structured => Box::new(StructuredParser::new(plot_field.map(str::to_string))),
    }
}

/// Finite values only; NaN and infinities are logged but never plotted
fn plottable(value: f64, line: &RawLine, session_start: Instant) -> Option<Sample> {
    value
        .is_finite()
        .then(|| Sample::new(line.elapsed_since(session_start), value))
}

/// Parser for lines that are a single number
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericParser;

impl LineParser for NumericParser {
    fn parse(&self, line: RawLine, session_start: Instant) -> ParsedRecord {
        let timestamp = ParserMode::Numeric.format_timestamp(&line.wall_time);
        let parsed = line.text.trim().parse::<f64>().ok();
        let sample = parsed.and_then(|v| plottable(v, &line, session_start));

        let record = match parsed {
            Some(v) => Record::Numeric(v),
            None => Record::Unparsed(line.text.clone()),
        };

        ParsedRecord {
            received_at: line.received_at,
            display_text: format!("{}: {}", timestamp, line.text),
            numeric_value: sample.map(|s| s.value),
            log_fields: vec![("Timestamp", timestamp), ("Data", line.text)],
            record,
            sample,
        }
    }

    fn mode(&self) -> ParserMode {
        ParserMode::Numeric
    }
}

/// Parser for `Key: value, Key: value` lines
#[derive(Debug, Clone, Default)]
pub struct StructuredParser {
    /// Field whose numeric value feeds the live window; `None` means log-only
    plot_field: Option<String>,
}

impl StructuredParser {
    pub fn new(plot_field: Option<String>) -> Self {
        Self { plot_field }
    }

    /// Split a line into key/value pairs
    ///
    /// Pairs without exactly one key/value delimiter are malformed and skipped.
    /// Returns `None` when no pair could be recovered at all.
    pub fn split_fields(text: &str) -> Option<StructuredFields> {
        let pairs: Vec<(String, String)> = text
            .split(PAIR_DELIMITER)
            .filter_map(|part| {
                let mut pieces = part.trim().split(KEY_VALUE_DELIMITER);
                match (pieces.next(), pieces.next(), pieces.next()) {
                    (Some(key), Some(value), None) => {
                        Some((key.trim().to_string(), value.trim().to_string()))
                    }
                    _ => None,
                }
            })
            .collect();

        (!pairs.is_empty()).then(|| StructuredFields::new(pairs))
    }
}

impl LineParser for StructuredParser {
    fn parse(&self, line: RawLine, session_start: Instant) -> ParsedRecord {
        let timestamp = ParserMode::Structured.format_timestamp(&line.wall_time);

        let Some(fields) = Self::split_fields(&line.text) else {
            return ParsedRecord {
                received_at: line.received_at,
                display_text: format!("{}: Unparsed line: {}", timestamp, line.text),
                numeric_value: None,
                log_fields: vec![
                    ("Timestamp", timestamp),
                    ("State", UNPARSED_MARKER.to_string()),
                    ("Raw", line.text.clone()),
                    ("Current", String::new()),
                ],
                record: Record::Unparsed(line.text),
                sample: None,
            };
        };

        let [state, raw, current] = STRUCTURED_KEYS.map(|k| fields.get_or_empty(k).to_string());

        let sample = self
            .plot_field
            .as_deref()
            .and_then(|key| fields.get(key))
            .and_then(|v| v.parse::<f64>().ok())
            .and_then(|v| plottable(v, &line, session_start));

        ParsedRecord {
            received_at: line.received_at,
            display_text: format!(
                "{}: State={}, Raw={}, Current={}",
                timestamp, state, raw, current
            ),
            numeric_value: sample.map(|s| s.value),
            log_fields: vec![
                ("Timestamp", timestamp),
                ("State", state),
                ("Raw", raw),
                ("Current", current),
            ],
            record: Record::Structured(fields),
            sample,
        }
    }

    fn mode(&self) -> ParserMode {
        ParserMode::Structured
    }
}
