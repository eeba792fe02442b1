//! Mock construction helpers

use mockall::mock;
use serial_logger::error::{LoggerError, Result};
use serial_logger::source::{LineSource, PortSettings, SourceFactory};
use serial_logger::types::RawLine;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mock! {
    pub Source {}

    impl LineSource for Source {
        fn next_line(&mut self, timeout: Duration) -> Result<Option<RawLine>>;
        fn close(&mut self);
        fn describe(&self) -> String;
    }
}

/// A transport that yields `lines`, then either fails with a read fault
/// (`fail_with`) or keeps timing out
///
/// The mock checks on drop that the transport was closed exactly once.
pub fn scripted_source(lines: &[&str], fail_with: Option<&str>) -> MockSource {
    let mut script: VecDeque<String> = lines.iter().map(|l| l.to_string()).collect();
    let fault = fail_with.map(str::to_string);

    let mut source = MockSource::new();
    source
        .expect_next_line()
        .returning(move |timeout| match script.pop_front() {
            Some(line) => Ok(Some(RawLine::new(line))),
            None => match &fault {
                Some(msg) => Err(LoggerError::Transport(std::io::Error::other(msg.clone()))),
                None => {
                    std::thread::sleep(timeout);
                    Ok(None)
                }
            },
        });
    source.expect_close().times(1).return_const(());
    source
        .expect_describe()
        .return_const("scripted transport".to_string());
    source
}

/// Hands out prepared sources, one per session
pub struct ScriptedFactory {
    sources: Mutex<VecDeque<Box<dyn LineSource>>>,
    opened: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new(sources: Vec<Box<dyn LineSource>>) -> Self {
        Self {
            sources: Mutex::new(sources.into()),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn single(source: impl LineSource + 'static) -> Self {
        Self::new(vec![Box::new(source)])
    }

    /// Counter of successful opens, readable after the factory is moved
    pub fn opened(&self) -> Arc<AtomicUsize> {
        self.opened.clone()
    }
}

impl SourceFactory for ScriptedFactory {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn LineSource>> {
        let source = self
            .sources
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LoggerError::Config(format!("{} is not available", settings.port)))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(source)
    }
}

/// A factory whose device never opens
pub struct UnavailableFactory;

impl SourceFactory for UnavailableFactory {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn LineSource>> {
        Err(LoggerError::Config(format!(
            "Failed to open {} at {} baud: No such file or directory",
            settings.port, settings.baud_rate
        )))
    }
}
