//! Running total of body bytes copied across all transfers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic byte total shared by every transfer of a [`crate::Fetcher`].
///
/// Partial bodies count too: whatever reached a sink before a failure is added.
#[derive(Debug, Default)]
pub struct ByteCounter {
    total: AtomicU64,
}

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` bytes and return the new total.
    pub fn add(&self, n: u64) -> u64 {
        self.total.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Current total. Safe to read from any thread at any time.
    pub fn get(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
