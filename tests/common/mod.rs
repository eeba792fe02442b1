//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use serial_logger::session::{SessionController, SessionSummary};
use serial_logger::window::WindowReader;
use std::path::Path;
use std::time::{Duration, Instant};

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Poll until `condition` holds or the test timeout expires
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + test_timeout();
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Wait for the window to hold at least `n` samples
pub fn wait_for_samples(window: &WindowReader, n: usize) -> bool {
    wait_until(|| window.len() >= n)
}

/// Wait for a session to end on its own and collect its summary
pub fn wait_for_summary(controller: &mut SessionController) -> Option<SessionSummary> {
    let mut summary = None;
    wait_until(|| {
        summary = controller.poll();
        summary.is_some()
    });
    summary
}

/// Read a CSV log as header + rows
pub fn read_log(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}
