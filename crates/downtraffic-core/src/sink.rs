//! Discard sink and the shared traffic counter.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide byte accumulator. Clones share the same counter; it only grows.
#[derive(Debug, Clone, Default)]
pub struct TrafficCounter(Arc<AtomicU64>);

impl TrafficCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `bytes` and returns the new total.
    pub fn add(&self, bytes: u64) -> u64 {
        self.0.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Swallows every byte handed to it after adding its length to the counter.
#[derive(Debug, Clone)]
pub struct ByteSink {
    counter: TrafficCounter,
}

impl ByteSink {
    pub fn new(counter: TrafficCounter) -> Self {
        Self { counter }
    }

    /// Accounts for `chunk` and drops it. Returns the chunk length.
    pub fn consume(&self, chunk: &[u8]) -> usize {
        self.counter.add(chunk.len() as u64);
        chunk.len()
    }

    pub fn counter(&self) -> &TrafficCounter {
        &self.counter
    }
}

impl io::Write for ByteSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.consume(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
