//! Serial port line source
//!
//! Reads newline-delimited text from a device opened with the `serialport`
//! crate. The port's read timeout doubles as the acquisition poll interval.

use super::{LineReader, LineSource, PortSettings, SourceFactory};
use crate::error::{LoggerError, Result};
use crate::types::RawLine;
use serialport::SerialPort;
use std::time::Duration;

/// Line source backed by a serial device
pub struct SerialLineSource {
    reader: Option<LineReader<Box<dyn SerialPort>>>,
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialLineSource {
    /// Open the device described by `settings`
    pub fn open(settings: &PortSettings) -> Result<Self> {
        settings.validate()?;

        let port = serialport::new(&settings.port, settings.baud_rate)
            .timeout(settings.poll_timeout)
            .open()
            .map_err(|e| {
                LoggerError::Config(format!(
                    "Failed to open {} at {} baud: {}",
                    settings.port, settings.baud_rate, e
                ))
            })?;

        tracing::info!(
            "Opened serial port {} at {} baud",
            settings.port,
            settings.baud_rate
        );

        Ok(Self {
            reader: Some(LineReader::new(port)),
            port_name: settings.port.clone(),
            baud_rate: settings.baud_rate,
            timeout: settings.poll_timeout,
        })
    }
}

impl LineSource for SerialLineSource {
    fn next_line(&mut self, timeout: Duration) -> Result<Option<RawLine>> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(LoggerError::Disconnected);
        };

        if timeout != self.timeout {
            reader.get_mut().set_timeout(timeout)?;
            self.timeout = timeout;
        }

        reader.read_line()
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::info!("Closed serial port {}", self.port_name);
        }
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port_name, self.baud_rate)
    }
}

/// Opens real serial devices
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialSourceFactory;

impl SourceFactory for SerialSourceFactory {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn LineSource>> {
        Ok(Box::new(SerialLineSource::open(settings)?))
    }
}
