//! Fixed-cadence admission gate for disk saves.
//!
//! A single "last admission" cursor under a mutex; callers wait on a condvar
//! until `last + interval` has passed, then claim the cursor. There is no
//! background timer. [`RateThrottle::close`] is the dispose path: it wakes every
//! waiter and turns all further admissions into errors.

use crate::error::{FetchError, Result};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct ThrottleState {
    last: Option<Instant>,
    admitted: u64,
    closed: bool,
}

/// Admits callers no closer than `interval` apart. It paces admission only;
/// admitted callers may run their transfers concurrently.
#[derive(Debug)]
pub struct RateThrottle {
    interval: Duration,
    state: Mutex<ThrottleState>,
    wake: Condvar,
}

impl RateThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(ThrottleState::default()),
            wake: Condvar::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until at least `interval` has passed since the previous admission.
    /// Returns the instant this caller was admitted at.
    pub fn admit(&self) -> Result<Instant> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(FetchError::ThrottleClosed);
            }
            let now = Instant::now();
            let ready_at = state.last.map(|last| last + self.interval);
            match ready_at {
                Some(at) if at > now => {
                    let (next, _) = self
                        .wake
                        .wait_timeout(state, at - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = next;
                }
                _ => {
                    state.last = Some(now);
                    state.admitted += 1;
                    return Ok(now);
                }
            }
        }
    }

    /// Number of callers admitted so far.
    pub fn admitted(&self) -> u64 {
        self.lock().admitted
    }

    /// Reject pending and future admissions.
    pub fn close(&self) {
        self.lock().closed = true;
        self.wake.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
