//! Fetch a URL's body into memory or save it to disk.
//!
//! Both paths go through one transfer routine ([`TransferClient::transfer`])
//! that enforces the request timeout, accepts only `200 OK` and counts body
//! bytes. In-memory fetches are bounded by a [`ConcurrencyLimiter`]; disk saves
//! are paced by a [`RateThrottle`]. A [`Fetcher`] owns all of them.
//!
//! The free functions [`fetch`], [`save`] and [`bytes_downloaded`] use a
//! lazily built process-wide `Fetcher` with the default settings
//! (15s timeout, 10 concurrent fetches, one save admission per 50ms).

pub mod client;
pub mod config;
pub mod counter;
pub mod error;
pub mod fetcher;
pub mod limiter;
pub mod logging;
pub mod throttle;

pub use client::TransferClient;
pub use config::FetchConfig;
pub use counter::ByteCounter;
pub use error::{FetchError, FetchErrorKind, Result, StreamFault};
pub use fetcher::Fetcher;
pub use limiter::{ConcurrencyLimiter, SlotGuard};
pub use throttle::RateThrottle;

use std::path::Path;
use std::sync::OnceLock;

static DEFAULT_FETCHER: OnceLock<Fetcher> = OnceLock::new();

/// The process-wide fetcher behind the free functions. Lives until process exit.
pub fn default_fetcher() -> &'static Fetcher {
    DEFAULT_FETCHER.get_or_init(Fetcher::default)
}

/// Fetch `url` into memory through the process-wide fetcher.
/// Partial content is discarded on error; use [`fetch_into`] to keep it.
pub fn fetch(url: &str) -> Result<Vec<u8>> {
    default_fetcher().fetch(url)
}

/// Fetch `url` into `buf` through the process-wide fetcher. On a `Stream`
/// error `buf` holds the bytes received before the fault.
pub fn fetch_into(url: &str, buf: &mut Vec<u8>) -> Result<u64> {
    default_fetcher().fetch_into(url, buf)
}

/// Save `url` to `path` through the process-wide fetcher.
pub fn save(url: &str, path: impl AsRef<Path>) -> Result<u64> {
    default_fetcher().save(url, path)
}

/// Bytes copied so far by the process-wide fetcher.
pub fn bytes_downloaded() -> u64 {
    default_fetcher().bytes_downloaded()
}
