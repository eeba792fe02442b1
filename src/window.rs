//! Live window buffer
//!
//! A bounded store of the most recent [`Sample`]s, shared between the
//! acquisition thread (single writer) and the presentation thread (single
//! reader).
//!
//! # Memory Management
//!
//! Samples live in a [`RingBuffer`]: a fixed arena plus a head index. Once the
//! arena is full every push overwrites the oldest slot, so the window always
//! holds the `capacity` most recent samples and never more.
//!
//! # Writer Never Waits
//!
//! The shared ring sits behind a mutex, but the writer only ever calls
//! `try_lock`. When the reader is holding the lock (taking a snapshot), new
//! samples go into a writer-local ring of the same capacity and are published
//! on the next push or [`WindowWriter::publish`]. Publishing preserves order,
//! so the reader always sees a contiguous suffix of the stream.

use crate::types::Sample;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Fixed-capacity FIFO with overwrite-oldest semantics
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Backing arena; grows up to `capacity` then stays that size
    slots: Vec<T>,
    /// Index of the oldest element once the arena is full
    head: usize,
    capacity: usize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create an empty ring holding at most `capacity` elements (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append an element, returning the evicted oldest element if the ring was full
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
            return None;
        }
        let evicted = std::mem::replace(&mut self.slots[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest element
    pub fn front(&self) -> Option<&T> {
        self.slots.get(self.head)
    }

    /// Newest element
    pub fn back(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let newest = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots.get(newest)
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Copy out the contents, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Remove every element, oldest first
    pub fn drain(&mut self) -> Vec<T> {
        let out = self.to_vec();
        self.clear();
        out
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

/// Create a live window of `capacity` samples, split into its two halves
pub fn live_window(capacity: usize) -> (WindowWriter, WindowReader) {
    let shared = Arc::new(Mutex::new(RingBuffer::new(capacity)));
    let writer = WindowWriter {
        shared: shared.clone(),
        pending: RingBuffer::new(capacity),
    };
    (writer, WindowReader { shared })
}

/// Lock the shared ring, recovering from a poisoned mutex
///
/// The ring has no invariant a panicking holder could break halfway.
fn lock(shared: &Mutex<RingBuffer<Sample>>) -> MutexGuard<'_, RingBuffer<Sample>> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Acquisition-side handle
#[derive(Debug)]
pub struct WindowWriter {
    shared: Arc<Mutex<RingBuffer<Sample>>>,
    /// Samples not yet published because the reader held the lock
    pending: RingBuffer<Sample>,
}

impl WindowWriter {
    /// Re-create a writer for an existing window
    ///
    /// Used when the previous writer was lost with a panicked thread.
    pub(crate) fn attach(reader: &WindowReader) -> Self {
        let capacity = reader.capacity();
        Self {
            shared: reader.shared.clone(),
            pending: RingBuffer::new(capacity),
        }
    }

    /// Add a sample; never blocks
    pub fn push(&mut self, sample: Sample) {
        self.pending.push(sample);
        self.publish();
    }

    /// Try to move pending samples into the shared window without blocking
    ///
    /// Returns `true` when nothing is left pending.
    pub fn publish(&mut self) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        match self.shared.try_lock() {
            Ok(mut ring) => {
                Self::move_pending(&mut self.pending, &mut ring);
                true
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                Self::move_pending(&mut self.pending, &mut poisoned.into_inner());
                true
            }
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// Publish pending samples, waiting for the reader if necessary
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            let mut ring = lock(&self.shared);
            Self::move_pending(&mut self.pending, &mut ring);
        }
    }

    /// Empty the window, e.g. at the start of a new session
    pub fn clear(&mut self) {
        self.pending.clear();
        lock(&self.shared).clear();
    }

    /// Number of samples waiting to be published
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// A reader for the same window
    pub fn reader(&self) -> WindowReader {
        WindowReader {
            shared: self.shared.clone(),
        }
    }

    fn move_pending(pending: &mut RingBuffer<Sample>, ring: &mut RingBuffer<Sample>) {
        for sample in pending.drain() {
            ring.push(sample);
        }
    }
}

/// Presentation-side handle
#[derive(Debug, Clone)]
pub struct WindowReader {
    shared: Arc<Mutex<RingBuffer<Sample>>>,
}

impl WindowReader {
    /// Copy of the published window, oldest first
    pub fn snapshot(&self) -> Vec<Sample> {
        lock(&self.shared).to_vec()
    }

    pub fn len(&self) -> usize {
        lock(&self.shared).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.shared).is_empty()
    }

    pub fn capacity(&self) -> usize {
        lock(&self.shared).capacity()
    }

    /// Most recent published sample
    pub fn latest(&self) -> Option<Sample> {
        lock(&self.shared).back().copied()
    }

    /// X-axis range a live plot should show for a `span`-second view
    ///
    /// While running the view follows the newest sample; once stopped it shows
    /// the first `span` seconds until the data is longer than that, then the
    /// last `span` seconds.
    pub fn follow_range(&self, span: f64, running: bool) -> (f64, f64) {
        let ring = lock(&self.shared);
        let Some(latest) = ring.back().map(|s| s.elapsed_seconds) else {
            return (0.0, span);
        };

        if running {
            let left = (latest - span).max(0.0);
            return (left, left + span);
        }

        let max_time = ring
            .iter()
            .map(|s| s.elapsed_seconds)
            .fold(f64::MIN, f64::max);
        if max_time <= span {
            (0.0, span)
        } else {
            (max_time - span, max_time)
        }
    }
}
