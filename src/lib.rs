//! # serial-logger: line-oriented serial data logger
//!
//! Reads newline-delimited text records from a serial device, writes every
//! record with a capture timestamp to a CSV log, and keeps a bounded window of
//! the most recent numeric samples for live display.
//!
//! ## Architecture
//!
//! - **Source**: blocking-with-timeout line reads from a serial port (or a replay)
//! - **Parser**: numeric or structured (`Key: value, ...`) interpretation of each line
//! - **Sink**: append-only CSV log, flushed after every row
//! - **Window**: fixed-capacity ring of samples shared with the display thread
//! - **Relay**: crossbeam channel carrying display lines to the display thread
//! - **Session**: the controller that starts, stops and supervises the
//!   acquisition thread
//!
//! The acquisition thread never waits on the display: the window writer only
//! ever `try_lock`s and the relay never blocks.
//!
//! ## Example
//!
//! ```ignore
//! use serial_logger::{
//!     config::AppConfig,
//!     presentation::{ConsolePresenter, PresentationPump},
//!     session::SessionController,
//!     source::SerialSourceFactory,
//! };
//!
//! let config = AppConfig::default();
//! let (mut controller, lines, window) = SessionController::with_channels(
//!     SerialSourceFactory,
//!     config.window.capacity,
//!     config.relay.mode(),
//! );
//! controller.start(&config.session_config())?;
//!
//! let mut pump = PresentationPump::new(lines, window);
//! let mut presenter = ConsolePresenter::new(std::io::stdout());
//! while controller.is_running() {
//!     pump.pump(&mut presenter);
//!     std::thread::sleep(config.presentation.refresh_interval());
//! }
//! ```

pub mod config;
pub mod error;
pub mod parser;
pub mod presentation;
pub mod relay;
pub mod session;
pub mod sink;
pub mod source;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use config::{AppConfig, AppState};
pub use error::{LoggerError, Result};
pub use parser::{build_parser, LineParser};
pub use presentation::{PresentationPump, Presenter};
pub use relay::{relay, RelayMode, RelayReceiver, RelaySender};
pub use session::{SessionConfig, SessionController, SessionState, SessionSummary};
pub use sink::{CsvSink, FlushPolicy};
pub use source::{LineSource, PortSettings, SourceFactory};
pub use types::{ParsedRecord, ParserMode, RawLine, Record, Sample};
pub use window::{live_window, WindowReader, WindowWriter};
