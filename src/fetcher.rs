//! Fetch (into memory) and save (to disk) entry points.
//!
//! `Fetcher` owns the process-wide pieces: transfer client, byte counter,
//! in-memory concurrency limiter and save throttle. Build one per process (or
//! per test) and share it by reference or `Arc`.

use crate::client::TransferClient;
use crate::config::FetchConfig;
use crate::counter::ByteCounter;
use crate::error::{FetchError, Result};
use crate::limiter::ConcurrencyLimiter;
use crate::throttle::RateThrottle;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
pub struct Fetcher {
    client: TransferClient,
    counter: Arc<ByteCounter>,
    limiter: ConcurrencyLimiter,
    throttle: RateThrottle,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self::with_counter(config, Arc::new(ByteCounter::new()))
    }

    /// Build with an externally owned counter (e.g. one shared by several fetchers).
    pub fn with_counter(config: &FetchConfig, counter: Arc<ByteCounter>) -> Self {
        Self {
            client: TransferClient::new(config),
            counter,
            limiter: ConcurrencyLimiter::new(config.fetch_capacity()),
            throttle: RateThrottle::new(config.save_interval()),
        }
    }

    /// GET `url` into `buf` while holding a limiter slot. Returns the bytes appended.
    ///
    /// On a `Stream` error `buf` keeps the partial body; check the error before
    /// treating the content as complete.
    pub fn fetch_into(&self, url: &str, buf: &mut Vec<u8>) -> Result<u64> {
        let _slot = self.limiter.acquire();
        self.client.transfer(url, buf, &self.counter)
    }

    /// GET `url` into a fresh buffer. Partial content is discarded on error.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.fetch_into(url, &mut buf)?;
        Ok(buf)
    }

    /// GET `url` into the file at `path`, creating missing parent directories.
    ///
    /// Local setup (directories, file create/truncate) happens before the
    /// throttle admission, so a filesystem failure never spends one. A failed
    /// transfer leaves whatever was written in place.
    pub fn save(&self, url: &str, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        tracing::info!(url, "queueing {} to {}", url, path.display());

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| FetchError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut file = File::create(path).map_err(|source| FetchError::FileCreate {
            path: path.to_path_buf(),
            source,
        })?;

        self.throttle.admit()?;
        self.client.transfer(url, &mut file, &self.counter)
    }

    /// Total body bytes copied by this fetcher (and anything sharing its counter).
    pub fn bytes_downloaded(&self) -> u64 {
        self.counter.get()
    }

    pub fn counter(&self) -> &Arc<ByteCounter> {
        &self.counter
    }

    pub fn client(&self) -> &TransferClient {
        &self.client
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn throttle(&self) -> &RateThrottle {
        &self.throttle
    }

    /// Close the save throttle; pending and later saves fail with `ThrottleClosed`.
    /// Fetches are unaffected.
    pub fn shutdown(&self) {
        self.throttle.close();
    }
}
