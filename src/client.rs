//! Shared HTTP transfer client and the core GET-into-sink routine.
//!
//! Uses the curl crate (libcurl). One `TransferClient` holds the transport
//! settings for the whole process; each transfer gets a fresh `Easy` handle,
//! which is dropped (closing the connection) on every exit path.

use crate::config::FetchConfig;
use crate::counter::ByteCounter;
use crate::error::{FetchError, Result, StreamFault};
use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::str;
use std::time::Duration;

const HTTP_OK: u32 = 200;
const MAX_REDIRECTS: u32 = 10;

/// Transport settings shared by every transfer. Immutable once built.
#[derive(Debug, Clone)]
pub struct TransferClient {
    timeout: Duration,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    follow_redirects: bool,
}

impl TransferClient {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            user_agent: config.user_agent.clone(),
            follow_redirects: config.follow_redirects,
        }
    }

    /// Whole-request timeout applied to every transfer.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn easy_for(&self, url: &str) -> std::result::Result<curl::easy::Easy, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.get(true)?;
        // Timeouts must not rely on SIGALRM when transfers run on many threads.
        easy.signal(false)?;
        easy.follow_location(self.follow_redirects)?;
        if self.follow_redirects {
            easy.max_redirections(MAX_REDIRECTS)?;
        }
        easy.timeout(self.timeout)?;
        if let Some(connect) = self.connect_timeout {
            easy.connect_timeout(connect)?;
        }
        if let Some(agent) = &self.user_agent {
            easy.useragent(agent)?;
        }
        Ok(easy)
    }

    /// GET `url` and stream a 200 body into `sink`. Returns the number of bytes copied.
    ///
    /// Bytes that reach the sink are added to `counter` on every path, including
    /// a body cut short by a read or write fault. A non-200 response copies
    /// nothing: the status is taken from the header stream before the first body
    /// chunk is delivered.
    pub fn transfer(&self, url: &str, sink: &mut dyn Write, counter: &ByteCounter) -> Result<u64> {
        tracing::debug!(url, "getting");
        let result = self.transfer_inner(url, sink, counter);
        match &result {
            Ok(n) => tracing::debug!(url, bytes = *n, "transfer complete"),
            Err(e) => tracing::warn!(url, copied = e.bytes_copied(), "transfer failed: {}", e),
        }
        result
    }

    fn transfer_inner(&self, url: &str, sink: &mut dyn Write, counter: &ByteCounter) -> Result<u64> {
        url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut easy = self.easy_for(url).map_err(|e| transport(url, e))?;

        // Last status line seen; with redirects the final hop wins.
        let status: Cell<Option<u32>> = Cell::new(None);
        let copied = Cell::new(0u64);
        let rejected = Cell::new(false);
        let sink_error: RefCell<Option<io::Error>> = RefCell::new(None);

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|line| {
                    if let Some(code) = parse_status_line(line) {
                        status.set(Some(code));
                    }
                    true
                })
                .map_err(|e| transport(url, e))?;
            transfer
                .write_function(|data| {
                    if status.get() != Some(HTTP_OK) {
                        // Abort: an error page is never copied into the sink.
                        rejected.set(true);
                        return Ok(0);
                    }
                    match write_chunk(&mut *sink, data, &copied) {
                        Ok(()) => Ok(data.len()),
                        Err(e) => {
                            *sink_error.borrow_mut() = Some(e);
                            Ok(0)
                        }
                    }
                })
                .map_err(|e| transport(url, e))?;
            transfer.perform()
        };

        let copied = copied.get();
        if copied > 0 {
            counter.add(copied);
        }

        if let Some(source) = sink_error.into_inner() {
            return Err(FetchError::Stream {
                url: url.to_string(),
                copied,
                source: StreamFault::Write(source),
            });
        }

        if let Err(e) = performed {
            return Err(match status.get() {
                Some(HTTP_OK) => FetchError::Stream {
                    url: url.to_string(),
                    copied,
                    source: StreamFault::Read(e),
                },
                Some(code) if rejected.get() => FetchError::BadStatus {
                    url: url.to_string(),
                    status: code,
                },
                _ => transport(url, e),
            });
        }

        let code = easy.response_code().map_err(|e| transport(url, e))?;
        if code != HTTP_OK {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: code,
            });
        }

        Ok(copied)
    }
}

fn transport(url: &str, source: curl::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Write all of `data`, counting every byte the sink accepts, even on a short failure.
fn write_chunk(sink: &mut dyn Write, data: &[u8], copied: &Cell<u64>) -> io::Result<()> {
    let mut off = 0;
    while off < data.len() {
        match sink.write(&data[off..]) {
            Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "sink accepted no bytes")),
            Ok(n) => {
                off += n;
                copied.set(copied.get() + n as u64);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Parse the code out of a status line such as `HTTP/1.1 200 OK` or `HTTP/2 404`.
/// Returns None for ordinary header lines.
fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = str::from_utf8(line).ok()?.trim();
    let rest = line.strip_prefix("HTTP/")?;
    rest.split_whitespace().nth(1)?.parse().ok()
}
