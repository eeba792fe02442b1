//! Test data builders for creating test objects

use serial_logger::session::SessionConfig;
use serial_logger::sink::FlushPolicy;
use serial_logger::source::PortSettings;
use serial_logger::types::ParserMode;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Builder for session configs writing into a temporary directory
pub struct SessionConfigBuilder {
    port: String,
    baud_rate: u32,
    poll_timeout: Duration,
    output: Option<PathBuf>,
    mode: ParserMode,
    plot_field: Option<String>,
    flush: FlushPolicy,
}

impl SessionConfigBuilder {
    pub fn new(dir: &Path) -> Self {
        Self {
            port: "test-port".to_string(),
            baud_rate: 115_200,
            poll_timeout: Duration::from_millis(10),
            output: Some(dir.join("output.csv")),
            mode: ParserMode::Numeric,
            plot_field: None,
            flush: FlushPolicy::Flush,
        }
    }

    pub fn port(mut self, port: &str) -> Self {
        self.port = port.to_string();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn output(mut self, path: Option<PathBuf>) -> Self {
        self.output = path;
        self
    }

    pub fn mode(mut self, mode: ParserMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn plot_field(mut self, field: &str) -> Self {
        self.plot_field = Some(field.to_string());
        self
    }

    pub fn flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }

    pub fn build(self) -> SessionConfig {
        SessionConfig {
            port: PortSettings::new(self.port, self.baud_rate).with_poll_timeout(self.poll_timeout),
            output_path: self.output,
            mode: self.mode,
            plot_field: self.plot_field,
            flush: self.flush,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let dir = Path::new("/tmp/logs");
        let config = SessionConfigBuilder::new(dir)
            .port("COM3")
            .mode(ParserMode::Structured)
            .plot_field("Current")
            .build();

        assert_eq!(config.port.port, "COM3");
        assert_eq!(config.output_path, Some(dir.join("output.csv")));
        assert_eq!(config.plot_field.as_deref(), Some("Current"));
        assert!(config.validate().is_ok());
    }
}
