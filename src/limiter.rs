//! Blocking counting semaphore bounding concurrent in-memory fetches.
//!
//! Callers hold a [`SlotGuard`] for the whole transfer; the slot goes back to
//! the pool when the guard drops, whichever way the guarded section exits.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Fixed-capacity slot pool. Admission order among waiters is unspecified.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    capacity: usize,
    in_flight: Mutex<usize>,
    freed: Condvar,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots (clamped to at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_flight: Mutex::new(0),
            freed: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        *self.lock()
    }

    /// Block until a slot is free, then take it.
    pub fn acquire(&self) -> SlotGuard<'_> {
        let mut in_flight = self.lock();
        while *in_flight >= self.capacity {
            in_flight = self
                .freed
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_flight += 1;
        SlotGuard { limiter: self }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<SlotGuard<'_>> {
        let mut in_flight = self.lock();
        if *in_flight >= self.capacity {
            return None;
        }
        *in_flight += 1;
        Some(SlotGuard { limiter: self })
    }

    fn release(&self) {
        let mut in_flight = self.lock();
        *in_flight = in_flight.saturating_sub(1);
        drop(in_flight);
        self.freed.notify_one();
    }

    // The guarded value is a plain count, so a panic elsewhere cannot leave it inconsistent.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases its slot when dropped.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    limiter: &'a ConcurrencyLimiter,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
