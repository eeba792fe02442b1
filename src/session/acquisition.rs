//! Acquisition loop
//!
//! Runs on its own thread for the lifetime of one session and is the only
//! writer of the log file and the live window.
//!
//! # Loop
//!
//! Each iteration checks the stop flag, then waits up to one poll interval
//! for a line. A line is parsed, appended to the log (flushed), pushed to the
//! window if it carries a sample, and relayed for display. A timeout only
//! gives pending window samples another chance to publish.
//!
//! # Shutdown
//!
//! On a stop request the transport and the log are closed, the window is
//! flushed and `Stopped logging.` is relayed. On a transport or log write
//! error both are closed best-effort and a single `Error: ...` line is relayed.
//! In both cases the state returns to `Idle` as the last step.

use super::types::{SessionOutcome, SessionState, SessionSummary, StateCell};
use crate::error::{LoggerError, Result, ResultExt};
use crate::parser::LineParser;
use crate::relay::RelaySender;
use crate::sink::CsvSink;
use crate::source::LineSource;
use crate::window::WindowWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Display line relayed after a clean stop
pub const STOPPED_MESSAGE: &str = "Stopped logging.";

/// Per-session counters
#[derive(Debug, Clone, Copy, Default)]
struct LoopStats {
    records: u64,
    samples: u64,
    unparsed: u64,
}

/// State owned by the acquisition thread
pub(crate) struct AcquisitionLoop {
    pub(crate) source: Box<dyn LineSource>,
    pub(crate) parser: Box<dyn LineParser>,
    pub(crate) sink: CsvSink,
    pub(crate) window: WindowWriter,
    pub(crate) relay: RelaySender,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) state: Arc<StateCell>,
    pub(crate) last_error: Arc<Mutex<Option<String>>>,
    pub(crate) session_start: Instant,
    pub(crate) poll_timeout: Duration,
    pub(crate) output_path: PathBuf,
}

impl AcquisitionLoop {
    /// Run until stopped or failed; hands the window writer back to the controller
    pub(crate) fn run(self) -> (SessionSummary, WindowWriter) {
        let Self {
            mut source,
            parser,
            mut sink,
            mut window,
            relay,
            stop,
            state,
            last_error,
            session_start,
            poll_timeout,
            output_path,
        } = self;

        tracing::info!("Acquisition started on {}", source.describe());
        let mut stats = LoopStats::default();

        let result = Self::pump(
            source.as_mut(),
            parser.as_ref(),
            &mut sink,
            &mut window,
            &relay,
            &stop,
            poll_timeout,
            session_start,
            &mut stats,
        );

        source.close();
        let closed = sink.close().context("Closing log file");
        window.flush();

        let (outcome, rows_written) = match (result, closed) {
            (Ok(()), Ok(rows)) => {
                relay.send(STOPPED_MESSAGE);
                tracing::info!("Acquisition stopped after {} records", stats.records);
                (SessionOutcome::Stopped, rows)
            }
            (Err(e), closed) => {
                if let Err(close_err) = &closed {
                    tracing::warn!("Log file not closed cleanly: {}", close_err);
                }
                (Self::report_failure(&e, &relay, &last_error), closed.unwrap_or(0))
            }
            (Ok(()), Err(e)) => (Self::report_failure(&e, &relay, &last_error), 0),
        };

        let summary = SessionSummary {
            records: stats.records,
            samples: stats.samples,
            unparsed: stats.unparsed,
            rows_written,
            dropped_display_lines: relay.dropped(),
            duration: session_start.elapsed(),
            output_path,
            outcome,
        };

        state.store(SessionState::Idle);
        (summary, window)
    }

    #[allow(clippy::too_many_arguments)]
    fn pump(
        source: &mut dyn LineSource,
        parser: &dyn LineParser,
        sink: &mut CsvSink,
        window: &mut WindowWriter,
        relay: &RelaySender,
        stop: &AtomicBool,
        poll_timeout: Duration,
        session_start: Instant,
        stats: &mut LoopStats,
    ) -> Result<()> {
        while !stop.load(Ordering::SeqCst) {
            let Some(line) = source.next_line(poll_timeout)? else {
                window.publish();
                continue;
            };

            let record = parser.parse(line, session_start);
            stats.records += 1;
            if record.record.is_unparsed() {
                stats.unparsed += 1;
                tracing::trace!("Unparsed line: {}", record.display_text);
            }

            sink.append(&record)?;

            if let Some(sample) = record.sample {
                window.push(sample);
                stats.samples += 1;
            }

            relay.send(record.display_text);
        }
        Ok(())
    }

    fn report_failure(
        error: &LoggerError,
        relay: &RelaySender,
        last_error: &Mutex<Option<String>>,
    ) -> SessionOutcome {
        let message = error.to_string();
        tracing::error!("Acquisition failed: {}", message);
        relay.send(format!("Error: {}", message));
        if let Ok(mut slot) = last_error.lock() {
            *slot = Some(message.clone());
        }
        SessionOutcome::Failed(message)
    }
}
