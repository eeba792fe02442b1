//! Session controller
//!
//! Owns the lifecycle of acquisition sessions:
//!
//! ```text
//! Idle --start--> Starting --opened--> Running --stop--> Stopping --loop exit--> Idle
//!                    |                    |
//!                    +--open failed-------+--transport/log error-------------> Idle
//! ```
//!
//! At most one acquisition thread exists per controller. A start request
//! while a session is active is a no-op; a new session may only begin once
//! the previous loop has fully exited and been joined.

use super::acquisition::AcquisitionLoop;
use super::types::{SessionConfig, SessionState, SessionSummary, StartOutcome, StateCell};
use crate::error::{LoggerError, Result};
use crate::parser::build_parser;
use crate::relay::{relay, RelayMode, RelayReceiver, RelaySender};
use crate::sink::CsvSink;
use crate::source::SourceFactory;
use crate::window::{live_window, WindowReader, WindowWriter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type LoopHandle = JoinHandle<(SessionSummary, WindowWriter)>;

/// Starts, stops and supervises acquisition sessions
pub struct SessionController {
    factory: Box<dyn SourceFactory>,
    /// Writer half of the live window; lent to the acquisition thread while running
    window: Option<WindowWriter>,
    window_reader: WindowReader,
    relay: RelaySender,
    state: Arc<StateCell>,
    /// Cooperative stop flag of the current session
    stop: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
    handle: Option<LoopHandle>,
    last_summary: Option<SessionSummary>,
    session_start: Option<Instant>,
}

impl SessionController {
    /// Create a controller around an existing window and relay
    pub fn new(
        factory: impl SourceFactory + 'static,
        window: WindowWriter,
        relay: RelaySender,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            window_reader: window.reader(),
            window: Some(window),
            relay,
            state: Arc::new(StateCell::default()),
            stop: Arc::new(AtomicBool::new(false)),
            last_error: Arc::new(Mutex::new(None)),
            handle: None,
            last_summary: None,
            session_start: None,
        }
    }

    /// Create a controller together with the presentation-side handles
    pub fn with_channels(
        factory: impl SourceFactory + 'static,
        window_capacity: usize,
        relay_mode: RelayMode,
    ) -> (Self, RelayReceiver, WindowReader) {
        let (writer, reader) = live_window(window_capacity);
        let (tx, rx) = relay(relay_mode);
        (Self::new(factory, writer, tx), rx, reader)
    }

    /// Start a session
    ///
    /// Configuration problems and failures to open the transport or the log
    /// file are returned here, before any thread is spawned.
    pub fn start(&mut self, config: &SessionConfig) -> Result<StartOutcome> {
        if self.state.load().is_active() {
            tracing::debug!("Start ignored: session is {}", self.state.load());
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.reap();

        self.state.store(SessionState::Starting);
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = None;
        }

        match self.launch(config) {
            Ok(()) => Ok(StartOutcome::Started),
            Err(e) => {
                tracing::error!("Failed to start session: {}", e);
                self.relay.send(format!("Error: {}", e));
                if let Ok(mut slot) = self.last_error.lock() {
                    *slot = Some(e.to_string());
                }
                self.state.store(SessionState::Idle);
                Err(e)
            }
        }
    }

    /// Open transport and log, then spawn the acquisition thread
    fn launch(&mut self, config: &SessionConfig) -> Result<()> {
        let output_path = config.validate()?.clone();

        let mut source = self.factory.open(&config.port)?;
        let sink = match CsvSink::create(&output_path, config.mode, config.flush) {
            Ok(sink) => sink,
            Err(e) => {
                source.close();
                return Err(e);
            }
        };
        let parser = build_parser(config.mode, config.plot_field.as_deref());

        let mut window = self
            .window
            .take()
            .unwrap_or_else(|| WindowWriter::attach(&self.window_reader));
        window.clear();

        let description = source.describe();
        let session_start = Instant::now();
        let stop = Arc::new(AtomicBool::new(false));

        let worker = AcquisitionLoop {
            source,
            parser,
            sink,
            window,
            relay: self.relay.clone(),
            stop: stop.clone(),
            state: self.state.clone(),
            last_error: self.last_error.clone(),
            session_start,
            poll_timeout: config.port.poll_timeout,
            output_path: output_path.clone(),
        };

        // Ahead of the loop's first line
        self.relay.send(format!(
            "Started logging {} to {} ({} mode)",
            description,
            output_path.display(),
            config.mode
        ));

        // Running before spawn, so the loop's final Idle cannot be overwritten
        self.state.store(SessionState::Running);
        let handle = std::thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.window = Some(WindowWriter::attach(&self.window_reader));
                LoggerError::Io(e)
            })?;

        self.stop = stop;
        self.handle = Some(handle);
        self.session_start = Some(session_start);

        tracing::info!("Session started: {} -> {:?}", description, output_path);
        Ok(())
    }

    /// Ask the running session to stop; returns immediately
    ///
    /// Returns `false` when there was nothing to stop.
    pub fn request_stop(&self) -> bool {
        match self.state.load() {
            SessionState::Idle => false,
            _ => {
                self.stop.store(true, Ordering::SeqCst);
                self.state
                    .transition(SessionState::Running, SessionState::Stopping);
                true
            }
        }
    }

    /// Stop the running session and wait for the acquisition thread to exit
    ///
    /// Returns the summary of the session that ended, if any. Waiting is
    /// bounded by the transport's poll timeout.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        self.request_stop();
        self.reap()
    }

    /// Collect a session that ended on its own (e.g. after a transport error)
    ///
    /// Never blocks; returns the summary once, when the thread has exited.
    pub fn poll(&mut self) -> Option<SessionSummary> {
        let finished = self.handle.as_ref().is_some_and(|h| h.is_finished());
        if finished {
            self.reap()
        } else {
            None
        }
    }

    /// Join a finished (or stopping) acquisition thread
    fn reap(&mut self) -> Option<SessionSummary> {
        let handle = self.handle.take()?;
        self.session_start = None;

        match handle.join() {
            Ok((summary, window)) => {
                self.window = Some(window);
                tracing::info!(
                    "Session closed: {} records, {} rows, {:?}",
                    summary.records,
                    summary.rows_written,
                    summary.outcome
                );
                self.last_summary = Some(summary.clone());
                Some(summary)
            }
            Err(_) => {
                let message = "Acquisition thread panicked".to_string();
                tracing::error!("{}", message);
                self.relay.send(format!("Error: {}", message));
                if let Ok(mut slot) = self.last_error.lock() {
                    *slot = Some(message);
                }
                self.window = Some(WindowWriter::attach(&self.window_reader));
                self.state.store(SessionState::Idle);
                None
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    pub fn is_running(&self) -> bool {
        self.state.load() == SessionState::Running
    }

    /// Whether an acquisition thread is still waiting to be joined
    pub fn has_session(&self) -> bool {
        self.handle.is_some()
    }

    /// Error that ended the last start attempt or session, if any
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    /// Summary of the last joined session
    pub fn last_summary(&self) -> Option<&SessionSummary> {
        self.last_summary.as_ref()
    }

    /// Time since the current session started
    pub fn session_elapsed(&self) -> Option<Duration> {
        self.session_start.map(|start| start.elapsed())
    }

    /// Reader for the live window
    pub fn window(&self) -> WindowReader {
        self.window_reader.clone()
    }

    /// Sender for display lines, e.g. to report presentation-side events
    pub fn relay(&self) -> RelaySender {
        self.relay.clone()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}
