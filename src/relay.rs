//! Cross-thread relay for display lines
//!
//! Ordered hand-off of display text from the acquisition thread to the
//! presentation thread over a crossbeam channel. Sending never blocks.
//!
//! In [`RelayMode::Bounded`] the relay keeps at most `n` undisplayed lines;
//! when it is full the oldest pending line is discarded to make room. This
//! only affects the display: the durable log is written independently.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Capacity policy of the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayMode {
    /// Never drops; memory grows if the display never drains
    #[default]
    Unbounded,
    /// Keeps at most this many pending lines, dropping the oldest
    Bounded(usize),
}

impl RelayMode {
    /// Bounded when a limit is given, unbounded otherwise
    pub fn from_limit(max_pending: Option<usize>) -> Self {
        match max_pending {
            Some(n) => RelayMode::Bounded(n.max(1)),
            None => RelayMode::Unbounded,
        }
    }
}

/// Create a relay pair
pub fn relay(mode: RelayMode) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = match mode {
        RelayMode::Unbounded => unbounded(),
        RelayMode::Bounded(n) => bounded(n.max(1)),
    };
    let dropped = Arc::new(AtomicU64::new(0));

    let sender = RelaySender {
        tx,
        evictor: matches!(mode, RelayMode::Bounded(_)).then(|| rx.clone()),
        dropped: dropped.clone(),
    };
    (sender, RelayReceiver { rx, dropped })
}

/// Acquisition-side handle
#[derive(Debug, Clone)]
pub struct RelaySender {
    tx: Sender<String>,
    /// Receiver clone used to discard the oldest line of a full bounded relay
    evictor: Option<Receiver<String>>,
    dropped: Arc<AtomicU64>,
}

impl RelaySender {
    /// Queue a line for display without blocking
    ///
    /// Returns `false` if the receiving side is gone.
    pub fn send(&self, line: impl Into<String>) -> bool {
        let mut line = line.into();
        loop {
            match self.tx.try_send(line) {
                Ok(()) => return true,
                Err(TrySendError::Disconnected(_)) => return false,
                Err(TrySendError::Full(back)) => {
                    line = back;
                    if let Some(evictor) = &self.evictor {
                        if evictor.try_recv().is_ok() {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
        }
    }

    /// Lines discarded so far because the bounded relay was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Presentation-side handle
#[derive(Debug)]
pub struct RelayReceiver {
    rx: Receiver<String>,
    dropped: Arc<AtomicU64>,
}

impl RelayReceiver {
    /// Take every pending line, in send order
    pub fn drain(&self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    /// Try to receive a single line without blocking
    pub fn try_recv(&self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Number of lines waiting
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Lines discarded so far because the bounded relay was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let (tx, rx) = relay(RelayMode::Unbounded);
        for i in 0..1000 {
            assert!(tx.send(format!("line {}", i)));
        }
        let lines = rx.drain();
        assert_eq!(lines.len(), 1000);
        assert!(lines.iter().enumerate().all(|(i, l)| *l == format!("line {}", i)));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_bounded_drops_oldest() {
        let (tx, rx) = relay(RelayMode::Bounded(3));
        for i in 0..5 {
            assert!(tx.send(i.to_string()));
        }
        assert_eq!(rx.drain(), vec!["2", "3", "4"]);
        assert_eq!(rx.dropped(), 2);
        assert_eq!(tx.dropped(), 2);
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = relay(RelayMode::Unbounded);
        drop(rx);
        assert!(!tx.send("lost"));
    }

    #[test]
    fn test_bounded_send_after_receiver_dropped_does_not_spin() {
        let (tx, rx) = relay(RelayMode::Bounded(1));
        drop(rx);
        // The evictor keeps the channel connected; sending still never blocks
        assert!(tx.send("a"));
        assert!(tx.send("b"));
        assert_eq!(tx.dropped(), 1);
    }

    #[test]
    fn test_cross_thread_order() {
        let (tx, rx) = relay(RelayMode::Unbounded);
        let producer = std::thread::spawn(move || {
            for i in 0..10_000u32 {
                tx.send(i.to_string());
            }
        });

        let mut received = Vec::new();
        while received.len() < 10_000 {
            received.extend(rx.drain());
            std::thread::yield_now();
        }
        producer.join().unwrap();

        let expected: Vec<String> = (0..10_000u32).map(|i| i.to_string()).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_mode_from_limit() {
        assert_eq!(RelayMode::from_limit(None), RelayMode::Unbounded);
        assert_eq!(RelayMode::from_limit(Some(0)), RelayMode::Bounded(1));
    }
}
