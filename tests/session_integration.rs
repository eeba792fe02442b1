//! Integration tests for the session lifecycle
//!
//! These tests run complete sessions against scripted transports:
//! - Every line reaches the log, in order, exactly once
//! - Numeric and structured scenarios end up in the log and the window
//! - Transport failures close the session with a single error line
//! - Start/stop requests outside the happy path are harmless

mod common;

use common::builders::SessionConfigBuilder;
use common::mock_helpers::{scripted_source, ScriptedFactory, UnavailableFactory};
use common::{read_log, wait_for_samples, wait_for_summary, wait_until};
use serial_logger::error::ErrorKind;
use serial_logger::relay::RelayMode;
use serial_logger::session::{
    SessionController, SessionOutcome, SessionState, StartOutcome, STOPPED_MESSAGE,
};
use serial_logger::source::{ReplayEnd, ReplaySource, ReplaySourceFactory};
use serial_logger::types::ParserMode;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[test]
fn test_every_line_logged_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..200)
        .map(|i| match i % 4 {
            0 => format!("{}", i),
            1 => format!("noise {}", i),
            2 => String::new(),
            _ => format!("{}.5", i),
        })
        .collect();

    let (mut controller, _rx, _window) = SessionController::with_channels(
        ReplaySourceFactory::new(ReplaySource::new(lines.clone()).with_end(ReplayEnd::Disconnect)),
        1000,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path()).build();

    controller.start(&config).unwrap();
    let summary = wait_for_summary(&mut controller).unwrap();
    assert_eq!(summary.records, 200);
    assert_eq!(summary.rows_written, 200);
    assert_eq!(summary.unparsed, 100);

    let (header, rows) = read_log(&dir.path().join("output.csv"));
    assert_eq!(header, vec!["Timestamp", "Data"]);
    assert_eq!(rows.len(), lines.len());
    for (row, line) in rows.iter().zip(&lines) {
        assert_eq!(&row[1], line);
    }
}

#[test]
fn test_numeric_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, rx, window) = SessionController::with_channels(
        ScriptedFactory::single(scripted_source(&["1.5", "bad", "2.5"], None)),
        100,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path()).build();

    controller.start(&config).unwrap();
    assert!(wait_for_samples(&window, 2));
    let summary = controller.stop().unwrap();

    assert_eq!(summary.outcome, SessionOutcome::Stopped);
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.samples, 2);

    let values: Vec<f64> = window.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![1.5, 2.5]);

    let (_, rows) = read_log(&dir.path().join("output.csv"));
    let data: Vec<&str> = rows.iter().map(|r| r[1].as_str()).collect();
    assert_eq!(data, vec!["1.5", "bad", "2.5"]);

    let lines = rx.drain();
    assert!(lines[0].starts_with("Started logging"));
    assert!(lines[1].ends_with(": 1.5"));
    assert!(lines[2].ends_with(": bad"));
    assert!(lines[3].ends_with(": 2.5"));
    assert_eq!(lines.last().map(String::as_str), Some(STOPPED_MESSAGE));
}

#[test]
fn test_structured_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, rx, window) = SessionController::with_channels(
        ScriptedFactory::single(scripted_source(
            &["State: ON, Raw: 10, Current: 0.2", "garbage"],
            None,
        )),
        100,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path())
        .mode(ParserMode::Structured)
        .build();

    controller.start(&config).unwrap();
    assert!(wait_until(|| rx.pending() >= 3));
    controller.stop().unwrap();

    let (header, rows) = read_log(&dir.path().join("output.csv"));
    assert_eq!(header, vec!["Timestamp", "State", "Raw", "Current"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1..], &["ON", "10", "0.2"]);
    assert_eq!(&rows[1][1..], &["UNPARSED", "garbage", ""]);
    // ISO-8601 local time with milliseconds
    assert_eq!(rows[0][0].len(), "2024-01-01T12:00:00.000".len());
    assert_eq!(&rows[0][0][10..11], "T");

    // Log-only without a plot field
    assert!(window.is_empty());

    let lines = rx.drain();
    assert!(lines[1].ends_with(": State=ON, Raw=10, Current=0.2"));
    assert!(lines[2].ends_with(": Unparsed line: garbage"));
}

#[test]
fn test_structured_plot_field_feeds_window() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, _rx, window) = SessionController::with_channels(
        ScriptedFactory::single(scripted_source(
            &[
                "State: ON, Raw: 10, Current: 0.2",
                "State: ON, Raw: 11, Current: n/a",
                "State: OFF, Raw: 12, Current: 0.4",
            ],
            None,
        )),
        100,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path())
        .mode(ParserMode::Structured)
        .plot_field("Current")
        .build();

    controller.start(&config).unwrap();
    assert!(wait_for_samples(&window, 2));
    let summary = controller.stop().unwrap();

    assert_eq!(summary.rows_written, 3);
    let values: Vec<f64> = window.snapshot().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0.2, 0.4]);
}

#[test]
fn test_transport_failure_mid_session() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, rx, _window) = SessionController::with_channels(
        ScriptedFactory::single(scripted_source(&["1", "2"], Some("read fault"))),
        100,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path()).build();

    controller.start(&config).unwrap();
    let summary = wait_for_summary(&mut controller).unwrap();

    assert!(summary.is_failure());
    assert_eq!(summary.rows_written, 2);
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.last_error().unwrap().contains("read fault"));

    let (_, rows) = read_log(&dir.path().join("output.csv"));
    assert_eq!(rows.len(), 2);

    let lines = rx.drain();
    let errors: Vec<&String> = lines.iter().filter(|l| l.starts_with("Error: ")).collect();
    assert_eq!(errors.len(), 1);
    assert!(lines.last().unwrap().starts_with("Error: "));
    assert!(!lines.iter().any(|l| l == STOPPED_MESSAGE));
}

#[test]
fn test_invalid_config_never_opens_transport() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::single(scripted_source(&[], None));
    let opened = factory.opened();
    let (mut controller, rx, _window) =
        SessionController::with_channels(factory, 100, RelayMode::Unbounded);

    let no_output = SessionConfigBuilder::new(dir.path()).output(None).build();
    let err = controller.start(&no_output).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let no_baud = SessionConfigBuilder::new(dir.path()).baud_rate(0).build();
    assert!(controller.start(&no_baud).is_err());

    let no_port = SessionConfigBuilder::new(dir.path()).port("").build();
    assert!(controller.start(&no_port).is_err());

    assert_eq!(opened.load(Ordering::SeqCst), 0);
    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(rx.drain().len(), 3);
    assert!(!dir.path().join("output.csv").exists());

    // The untouched source is still closed exactly once when a session runs
    let ok = SessionConfigBuilder::new(dir.path()).build();
    controller.start(&ok).unwrap();
    assert!(controller.stop().is_some());
}

#[test]
fn test_unopenable_device_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, rx, _window) =
        SessionController::with_channels(UnavailableFactory, 100, RelayMode::Unbounded);
    let config = SessionConfigBuilder::new(dir.path()).port("/dev/ttyUSB9").build();

    let err = controller.start(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(controller.last_error().unwrap().contains("/dev/ttyUSB9"));

    let lines = rx.drain();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Error: "));
}

#[test]
fn test_unwritable_log_closes_transport() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, _rx, _window) = SessionController::with_channels(
        ScriptedFactory::single(scripted_source(&["1"], None)),
        100,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path())
        .output(Some(dir.path().join("missing-dir").join("out.csv")))
        .build();

    // MockSource verifies close() on drop
    assert!(controller.start(&config).is_err());
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn test_stop_while_idle_and_double_start() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::single(scripted_source(&["1"], None));
    let opened = factory.opened();
    let (mut controller, _rx, _window) =
        SessionController::with_channels(factory, 100, RelayMode::Unbounded);
    let config = SessionConfigBuilder::new(dir.path()).build();

    assert!(!controller.request_stop());
    assert!(controller.stop().is_none());

    assert_eq!(controller.start(&config).unwrap(), StartOutcome::Started);
    assert!(controller.is_running());
    assert_eq!(
        controller.start(&config).unwrap(),
        StartOutcome::AlreadyRunning
    );
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    controller.stop().unwrap();
    assert!(controller.stop().is_none());
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn test_elapsed_time_resets_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let factory = ScriptedFactory::new(vec![
        Box::new(scripted_source(&["1"], None)),
        Box::new(scripted_source(&["2"], None)),
    ]);
    let (mut controller, _rx, window) =
        SessionController::with_channels(factory, 100, RelayMode::Unbounded);
    let config = SessionConfigBuilder::new(dir.path()).build();

    controller.start(&config).unwrap();
    assert!(wait_for_samples(&window, 1));
    std::thread::sleep(Duration::from_millis(300));
    controller.stop().unwrap();
    assert_eq!(window.len(), 1);

    controller.start(&config).unwrap();
    assert!(wait_for_samples(&window, 1));
    controller.stop().unwrap();

    let samples = window.snapshot();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].value, 2.0);
    assert!(samples[0].elapsed_seconds < 0.25);

    // A fresh log per session
    let (_, rows) = read_log(&dir.path().join("output.csv"));
    assert_eq!(rows, vec![vec![rows[0][0].clone(), "2".to_string()]]);
}

#[test]
fn test_elapsed_time_never_decreases_within_session() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..5000).map(|i| format!("{}.25", i)).collect();
    let (mut controller, _rx, window) = SessionController::with_channels(
        ReplaySourceFactory::new(ReplaySource::new(lines).with_end(ReplayEnd::Disconnect)),
        5000,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path()).build();

    controller.start(&config).unwrap();
    let summary = wait_for_summary(&mut controller).unwrap();
    assert_eq!(summary.samples, 5000);

    let samples = window.snapshot();
    assert_eq!(samples.len(), 5000);
    assert!(samples[0].elapsed_seconds >= 0.0);
    assert!(samples
        .windows(2)
        .all(|p| p[0].elapsed_seconds <= p[1].elapsed_seconds));
    assert_eq!(samples.last().map(|s| s.value), Some(4999.25));
}

#[test]
fn test_bounded_relay_drops_display_not_log() {
    let dir = tempfile::tempdir().unwrap();
    let lines: Vec<String> = (0..500).map(|i| i.to_string()).collect();
    let (mut controller, rx, _window) = SessionController::with_channels(
        ReplaySourceFactory::new(ReplaySource::new(lines).with_end(ReplayEnd::Disconnect)),
        1000,
        RelayMode::Bounded(10),
    );
    let config = SessionConfigBuilder::new(dir.path()).build();

    controller.start(&config).unwrap();
    let summary = wait_for_summary(&mut controller).unwrap();

    assert_eq!(summary.rows_written, 500);
    assert!(summary.dropped_display_lines > 0);
    let shown = rx.drain();
    assert!(shown.len() <= 10);
    assert!(shown.last().unwrap().starts_with("Error: "));
    assert!(rx.dropped() >= summary.dropped_display_lines);
}

#[test]
fn test_session_elapsed_and_summary_duration() {
    let dir = tempfile::tempdir().unwrap();
    let (mut controller, _rx, _window) = SessionController::with_channels(
        ScriptedFactory::single(scripted_source(&[], None)),
        100,
        RelayMode::Unbounded,
    );
    let config = SessionConfigBuilder::new(dir.path()).build();

    assert!(controller.session_elapsed().is_none());
    controller.start(&config).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(controller.session_elapsed().unwrap() >= Duration::from_millis(50));

    let summary = controller.stop().unwrap();
    assert!(summary.duration >= Duration::from_millis(50));
    assert_eq!(controller.last_summary(), Some(&summary));
    assert!(controller.session_elapsed().is_none());
}
