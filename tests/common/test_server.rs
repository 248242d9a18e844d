//! Minimal HTTP/1.1 server for integration tests.
//!
//! Routes (all GET, `Connection: close`):
//! - `/ok/<n>`                   200 with `n` bytes of [`body`]
//! - `/status/<code>`            `<code>` with a short error page
//! - `/slow/<ms>/<n>`            waits `ms`, then 200 with `n` bytes; tracked as in flight
//! - `/hang`                     reads the request and never answers
//! - `/truncated/<sent>/<len>`   claims `Content-Length: len`, sends `sent` bytes, closes
//! - `/redirect/<n>`             302 to `/ok/<n>`

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const ERROR_PAGE: &[u8] = b"<html>error page</html>";

#[derive(Debug, Default)]
pub struct ServerStats {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: AtomicUsize,
}

pub struct TestServer {
    base: String,
    stats: Arc<ServerStats>,
}

impl TestServer {
    /// Absolute URL for `path` (which should start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Highest number of `/slow` requests observed being served at once.
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.stats.requests.load(Ordering::SeqCst)
    }
}

/// Deterministic body of `n` bytes.
pub fn body(n: usize) -> Vec<u8> {
    (0u8..=250).cycle().take(n).collect()
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let stats = Arc::new(ServerStats::default());
    let server_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let stats = Arc::clone(&server_stats);
            thread::spawn(move || handle(stream, &stats));
        }
    });
    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        stats,
    }
}

fn handle(mut stream: TcpStream, stats: &ServerStats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    stats.requests.fetch_add(1, Ordering::SeqCst);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match parts.as_slice() {
        ["ok", n] => respond(&mut stream, "200 OK", &body(parse(n)), ""),
        ["status", code] => {
            let status = format!("{} Test", code);
            respond(&mut stream, &status, ERROR_PAGE, "");
        }
        ["slow", ms, n] => {
            let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(parse(ms) as u64));
            respond(&mut stream, "200 OK", &body(parse(n)), "");
            stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        ["hang"] => thread::sleep(Duration::from_secs(10)),
        ["truncated", sent, len] => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                parse(len)
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body(parse(sent)));
            let _ = stream.flush();
        }
        ["redirect", n] => {
            let location = format!("Location: /ok/{}\r\n", n);
            respond(&mut stream, "302 Found", b"", &location);
        }
        _ => respond(&mut stream, "404 Not Found", ERROR_PAGE, ""),
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8], extra_headers: &str) {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        status,
        body.len(),
        extra_headers
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn parse(s: &str) -> usize {
    s.parse().unwrap_or(0)
}
