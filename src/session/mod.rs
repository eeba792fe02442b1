//! Logging sessions
//!
//! A session is one run of the acquisition loop: the transport and the log
//! file are opened at start, every received line is parsed, logged, plotted
//! and relayed for display, and both are closed when the session stops or
//! fails.
//!
//! # Threads
//!
//! - The caller (presentation thread) owns the [`SessionController`] and
//!   issues start/stop requests. Neither blocks on the device.
//! - One acquisition thread per session runs [`acquisition`]'s loop and is
//!   the only writer of the log file and the live window.
//!
//! # Example
//!
//! ```ignore
//! use serial_logger::relay::RelayMode;
//! use serial_logger::session::{SessionConfig, SessionController};
//! use serial_logger::source::{PortSettings, SerialSourceFactory};
//!
//! let (mut controller, display, window) =
//!     SessionController::with_channels(SerialSourceFactory, 20_000, RelayMode::Unbounded);
//!
//! let config = SessionConfig::new(PortSettings::new("/dev/ttyUSB0", 115_200), "output.csv");
//! controller.start(&config)?;
//!
//! for line in display.drain() {
//!     println!("{}", line);
//! }
//!
//! let summary = controller.stop();
//! ```

pub mod acquisition;
pub mod controller;
pub mod types;

pub use acquisition::STOPPED_MESSAGE;
pub use controller::SessionController;
pub use types::{SessionConfig, SessionOutcome, SessionState, SessionSummary, StartOutcome};
