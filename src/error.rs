//! Transfer error taxonomy.
//!
//! Every failure carries enough context (URL, status, partial byte count, path)
//! to be diagnosed without re-deriving it, and keeps the original cause as its
//! `source()`.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// What interrupted a body that had already started streaming.
#[derive(Debug, Error)]
pub enum StreamFault {
    /// The sink rejected a write (disk full, closed pipe, ...).
    #[error("sink write failed: {0}")]
    Write(#[source] io::Error),
    /// The transport failed while reading the body (reset, timeout, short body).
    #[error("body read failed: {0}")]
    Read(#[source] curl::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request could not be sent, or the connection failed before a
    /// successful response arrived.
    #[error("could not fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },

    /// A response arrived with a status other than 200. Nothing was copied.
    #[error("bad status for {url}: HTTP {status}")]
    BadStatus { url: String, status: u32 },

    /// The body was cut short after `copied` bytes had reached the sink.
    #[error("connection reset for {url} after {copied} bytes: {source}")]
    Stream {
        url: String,
        copied: u64,
        #[source]
        source: StreamFault,
    },

    #[error("failed to create directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create file {}: {source}", .path.display())]
    FileCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("save throttle is closed")]
    ThrottleClosed,
}

/// Tag for matching on the error class without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    InvalidUrl,
    Transport,
    BadStatus,
    Stream,
    Directory,
    FileCreate,
    ThrottleClosed,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidUrl { .. } => FetchErrorKind::InvalidUrl,
            FetchError::Transport { .. } => FetchErrorKind::Transport,
            FetchError::BadStatus { .. } => FetchErrorKind::BadStatus,
            FetchError::Stream { .. } => FetchErrorKind::Stream,
            FetchError::Directory { .. } => FetchErrorKind::Directory,
            FetchError::FileCreate { .. } => FetchErrorKind::FileCreate,
            FetchError::ThrottleClosed => FetchErrorKind::ThrottleClosed,
        }
    }

    /// URL the failed request targeted, for network-side errors.
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::BadStatus { url, .. }
            | FetchError::Stream { url, .. } => Some(url.as_str()),
            _ => None,
        }
    }

    /// Filesystem path involved, for local setup errors.
    pub fn path(&self) -> Option<&Path> {
        match self {
            FetchError::Directory { path, .. } | FetchError::FileCreate { path, .. } => {
                Some(path.as_path())
            }
            _ => None,
        }
    }

    /// HTTP status of a rejected response.
    pub fn status(&self) -> Option<u32> {
        match self {
            FetchError::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Bytes that reached the sink before the failure. Zero for everything but `Stream`.
    pub fn bytes_copied(&self) -> u64 {
        match self {
            FetchError::Stream { copied, .. } => *copied,
            _ => 0,
        }
    }

    /// True if the request timed out, whether before or during the body.
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Transport { source, .. }
            | FetchError::Stream {
                source: StreamFault::Read(source),
                ..
            } => source.is_operation_timedout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn bad_status_carries_url_and_code() {
        let e = FetchError::BadStatus {
            url: "http://example.test/a".to_string(),
            status: 404,
        };
        assert_eq!(e.kind(), FetchErrorKind::BadStatus);
        assert_eq!(e.url(), Some("http://example.test/a"));
        assert_eq!(e.status(), Some(404));
        assert_eq!(e.bytes_copied(), 0);
        assert_eq!(e.to_string(), "bad status for http://example.test/a: HTTP 404");
        assert!(e.source().is_none());
    }

    #[test]
    fn stream_error_keeps_partial_count_and_cause() {
        let e = FetchError::Stream {
            url: "http://example.test/b".to_string(),
            copied: 400,
            source: StreamFault::Write(io::Error::new(io::ErrorKind::Other, "disk full")),
        };
        assert_eq!(e.kind(), FetchErrorKind::Stream);
        assert_eq!(e.bytes_copied(), 400);
        assert!(!e.is_timeout());
        let fault = e.source().expect("stream fault");
        assert!(fault.to_string().contains("disk full"));
        assert!(fault.source().is_some(), "io cause is chained");
    }

    #[test]
    fn filesystem_errors_carry_path() {
        let e = FetchError::Directory {
            path: PathBuf::from("/nope/a/b"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(e.kind(), FetchErrorKind::Directory);
        assert_eq!(e.path(), Some(Path::new("/nope/a/b")));
        assert!(e.url().is_none());
        assert!(e.to_string().contains("/nope/a/b"));
    }

    #[test]
    fn timeout_detection() {
        let e = FetchError::Transport {
            url: "http://example.test/".to_string(),
            source: curl::Error::new(28),
        };
        assert!(e.is_timeout());
        let e = FetchError::Transport {
            url: "http://example.test/".to_string(),
            source: curl::Error::new(7),
        };
        assert!(!e.is_timeout());
    }
}
