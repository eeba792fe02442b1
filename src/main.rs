//! Serial Logger - Main Entry Point
//!
//! Console front end: starts one logging session, prints every received line
//! and a periodic window summary, and stops on Enter, after `--duration`, or
//! when the device fails.

use clap::Parser;
use serial_logger::{
    config::{app_data_dir, default_config_path, AppConfig, AppState},
    presentation::{ConsolePresenter, PresentationPump},
    session::SessionController,
    sink::FlushPolicy,
    source::{
        ReplaySource, ReplaySourceFactory, SerialSourceFactory, SourceFactory, VIRTUAL_PORT,
    },
    types::ParserMode,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Window summary cadence, in refresh ticks
const STATUS_EVERY_TICKS: u32 = 10;

#[derive(Parser, Debug)]
#[command(name = "serial-logger", version, about = "Log and plot line-oriented serial data")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// CSV log file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Line format: numeric or structured
    #[arg(short, long)]
    mode: Option<ParserMode>,

    /// Structured field to plot (e.g. Current)
    #[arg(long)]
    plot_field: Option<String>,

    /// Replay lines from a capture file instead of opening a device
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Delay between replayed lines
    #[arg(long, default_value_t = 0)]
    replay_interval_ms: u64,

    /// Generate a sine wave instead of opening a device
    #[cfg(feature = "mock-serial")]
    #[arg(long)]
    mock: bool,

    /// Stop after this many seconds
    #[arg(long, value_parser = parse_duration)]
    duration: Option<Duration>,

    /// Only flush rows to the OS instead of syncing each one to disk
    #[arg(long)]
    no_sync: bool,

    /// Also write diagnostics to a daily rolling file in the app data directory
    #[arg(long)]
    trace_file: bool,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.trace_file);

    tracing::info!("Starting serial logger");

    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = config_path
        .as_ref()
        .map(AppConfig::load_or_default)
        .unwrap_or_default();
    let mut app_state = AppState::load_or_default();
    app_state.apply_to(&mut config);
    apply_cli(&cli, &mut config);

    if cli.save_config {
        let path = config_path
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file location"))?;
        config.save(&path)?;
        println!("Saved configuration to {}", path.display());
        return Ok(());
    }

    let factory = build_factory(&cli)?;
    let (mut controller, lines, window) = SessionController::with_channels(
        factory,
        config.window.capacity,
        config.relay.mode(),
    );
    let mut pump = PresentationPump::new(lines, window);
    let mut presenter = ConsolePresenter::new(std::io::stdout());

    if let Err(e) = controller.start(&config.session_config()) {
        // The error line is already in the relay
        pump.pump(&mut presenter);
        return Err(e.into());
    }

    app_state.remember(&config);
    if let Err(e) = app_state.save() {
        tracing::warn!("Failed to save app state: {}", e);
    }

    let enter_pressed = spawn_stdin_watcher();
    println!("Press Enter to stop.");

    let deadline = cli.duration.and_then(|d| Instant::now().checked_add(d));
    let refresh = config.presentation.refresh_interval();
    let span = config.window.display_span_secs;
    let mut tick: u32 = 0;

    loop {
        pump.pump(&mut presenter);

        tick = tick.wrapping_add(1);
        if tick % STATUS_EVERY_TICKS == 0 {
            presenter.print_window_status(pump.window().follow_range(span, controller.is_running()));
        }

        // A panicked acquisition thread is reaped without a summary
        if controller.poll().is_some() || !controller.has_session() {
            break;
        }

        let timed_out = deadline.is_some_and(|d| Instant::now() >= d);
        if timed_out || enter_pressed.load(Ordering::SeqCst) {
            controller.stop();
            break;
        }

        std::thread::sleep(refresh);
    }

    // Final lines: "Stopped logging." or the error
    pump.pump(&mut presenter);

    let summary = controller.last_summary().cloned();
    if let Some(summary) = summary {
        println!(
            "{} records ({} plotted, {} unparsed), {} rows in {} over {:.1}s",
            summary.records,
            summary.samples,
            summary.unparsed,
            summary.rows_written,
            summary.output_path.display(),
            summary.duration.as_secs_f64()
        );
        if summary.dropped_display_lines > 0 {
            println!("{} lines were not displayed", summary.dropped_display_lines);
        }
        if let serial_logger::session::SessionOutcome::Failed(reason) = summary.outcome {
            anyhow::bail!("Session failed: {}", reason);
        }
    }

    Ok(())
}

/// Initialize logging; the returned guard flushes the trace file on drop
fn init_tracing(trace_file: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,serial_logger=debug"));
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let dir = trace_file.then(app_data_dir).flatten();
    match dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), "serial-logger.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

fn apply_cli(cli: &Cli, config: &mut AppConfig) {
    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }
    if let Some(mode) = cli.mode {
        config.output.mode = mode;
    }
    if let Some(field) = &cli.plot_field {
        config.output.plot_field = Some(field.clone());
    }
    if cli.no_sync {
        config.output.flush = FlushPolicy::Flush;
    }
    if (cli.replay.is_some() || mock_requested(cli)) && config.serial.port.is_empty() {
        config.serial.port = VIRTUAL_PORT.to_string();
    }
}

#[cfg(feature = "mock-serial")]
fn mock_requested(cli: &Cli) -> bool {
    cli.mock
}

#[cfg(not(feature = "mock-serial"))]
fn mock_requested(_cli: &Cli) -> bool {
    false
}

fn build_factory(cli: &Cli) -> anyhow::Result<Box<dyn SourceFactory>> {
    #[cfg(feature = "mock-serial")]
    if cli.mock {
        use serial_logger::source::{MockDataPattern, MockSourceFactory};
        return Ok(Box::new(
            MockSourceFactory::new(MockDataPattern::default(), 50).with_chatter(25),
        ));
    }

    if let Some(path) = &cli.replay {
        let source = ReplaySource::from_file(path)?
            .with_interval(Duration::from_millis(cli.replay_interval_ms));
        tracing::info!("Replaying {} lines from {:?}", source.remaining(), path);
        return Ok(Box::new(ReplaySourceFactory::new(source)));
    }

    Ok(Box::new(SerialSourceFactory))
}

/// Parse a non-negative number of seconds
fn parse_duration(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid number of seconds: {}", e))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {}: {}", value, e))
}

/// Set a flag when a line arrives on stdin
fn spawn_stdin_watcher() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let flag_clone = flag.clone();
    let spawned = std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            // EOF (no terminal attached) is not a stop request
            let mut line = String::new();
            if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
                flag_clone.store(true, Ordering::SeqCst);
            }
        });
    if let Err(e) = spawned {
        tracing::warn!("Enter-to-stop unavailable: {}", e);
    }
    flag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1.5"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("inf").is_err());
        assert!(parse_duration("NaN").is_err());
        assert!(parse_duration("1e30").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_cli_rejects_unbounded_duration() {
        assert!(Cli::try_parse_from(["serial-logger", "--duration", "inf"]).is_err());
        let cli = Cli::try_parse_from(["serial-logger", "--duration", "2"]).unwrap();
        assert_eq!(cli.duration, Some(Duration::from_secs(2)));
    }
}
