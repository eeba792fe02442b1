//! Presentation contract
//!
//! The pipeline never calls rendering code. A display collaborator implements
//! [`Presenter`] and is driven by a [`PresentationPump`] on its own thread,
//! once per refresh tick:
//!
//! 1. all pending display lines are drained from the relay, in order
//! 2. the published window is snapshotted and handed over
//!
//! [`ConsolePresenter`] is the minimal collaborator used by the binary.

use crate::relay::RelayReceiver;
use crate::types::Sample;
use crate::window::WindowReader;
use std::io::Write;

/// Display side of the pipeline
pub trait Presenter {
    /// New display lines, oldest first
    fn on_new_log_lines(&mut self, lines: &[String]);

    /// Current window contents, oldest first
    fn on_window_update(&mut self, samples: &[Sample]);
}

/// What one pump tick delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub lines: usize,
    pub samples: usize,
}

/// Moves relay lines and window snapshots to a [`Presenter`]
#[derive(Debug)]
pub struct PresentationPump {
    lines: RelayReceiver,
    window: WindowReader,
    /// Drop count already reported
    reported_drops: u64,
}

impl PresentationPump {
    pub fn new(lines: RelayReceiver, window: WindowReader) -> Self {
        Self {
            lines,
            window,
            reported_drops: 0,
        }
    }

    /// Run one refresh tick
    pub fn pump(&mut self, presenter: &mut dyn Presenter) -> PumpStats {
        let lines = self.lines.drain();
        if !lines.is_empty() {
            presenter.on_new_log_lines(&lines);
        }

        let dropped = self.lines.dropped();
        if dropped > self.reported_drops {
            tracing::warn!(
                "Display fell behind: {} lines skipped (log file is complete)",
                dropped - self.reported_drops
            );
            self.reported_drops = dropped;
        }

        let samples = self.window.snapshot();
        presenter.on_window_update(&samples);

        PumpStats {
            lines: lines.len(),
            samples: samples.len(),
        }
    }

    /// Reader of the window this pump snapshots
    pub fn window(&self) -> &WindowReader {
        &self.window
    }
}

/// Summary of a window snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub len: usize,
    pub min: f64,
    pub max: f64,
    pub latest: Sample,
}

impl WindowStats {
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let latest = *samples.last()?;
        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.value), hi.max(s.value))
            });
        Some(Self {
            len: samples.len(),
            min,
            max,
            latest,
        })
    }
}

/// Prints display lines to a writer and keeps a summary of the window
pub struct ConsolePresenter<W: Write> {
    out: W,
    window: Option<WindowStats>,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, window: None }
    }

    /// Summary of the last window update (`None` while empty)
    pub fn window_stats(&self) -> Option<WindowStats> {
        self.window
    }

    /// Print a one-line window summary
    pub fn print_window_status(&mut self, range: (f64, f64)) {
        let Some(stats) = self.window else {
            return;
        };
        let _ = writeln!(
            self.out,
            "[window] {} samples, t={:.3}s value={}, min={} max={}, view {:.1}..{:.1}s",
            stats.len,
            stats.latest.elapsed_seconds,
            stats.latest.value,
            stats.min,
            stats.max,
            range.0,
            range.1
        );
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn on_new_log_lines(&mut self, lines: &[String]) {
        for line in lines {
            // A closed stdout only loses display output
            if writeln!(self.out, "{}", line).is_err() {
                break;
            }
        }
        let _ = self.out.flush();
    }

    fn on_window_update(&mut self, samples: &[Sample]) {
        self.window = WindowStats::from_samples(samples);
    }
}
