//! Minimal HTTP/1.1 server standing in for the book archive in integration tests.
//!
//! Answers `GET /cache/epub/<id>/pg<id>.txt` with a scripted reply per id and 404 for
//! everything else. Every response closes the connection. Keeps count of how many
//! requests it is handling at once.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with this body.
    Body(Vec<u8>),
    /// Bare status with an empty body.
    Status(u16),
    /// Close the connection without answering.
    Hangup,
    /// 200 promising more bytes than it sends, then closes.
    Truncated(Vec<u8>),
    /// 200 promising more bytes than it sends, then goes silent for a long time.
    Stall(Vec<u8>),
}

#[derive(Default)]
struct Stats {
    requests: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub struct BookServer {
    pub base_url: String,
    stats: Arc<Stats>,
}

impl BookServer {
    /// Ids requested so far, in arrival order. Clears the log.
    pub fn take_requests(&self) -> Vec<u32> {
        std::mem::take(&mut *self.stats.requests.lock().unwrap())
    }

    /// Most requests ever handled at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Starts a server on a random port. Every request waits `delay` before it is answered.
/// The server runs until the process exits.
pub fn start(routes: HashMap<u32, Reply>, delay: Duration) -> BookServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let stats = Arc::new(Stats::default());
    thread::spawn({
        let stats = Arc::clone(&stats);
        move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let stats = Arc::clone(&stats);
                thread::spawn(move || handle(stream, &routes, &stats, delay));
            }
        }
    });
    BookServer {
        base_url: format!("http://127.0.0.1:{port}"),
        stats,
    }
}

/// Same body for every id in `ids`.
pub fn serving(ids: impl IntoIterator<Item = u32>, body: &[u8]) -> HashMap<u32, Reply> {
    ids.into_iter()
        .map(|id| (id, Reply::Body(body.to_vec())))
        .collect()
}

fn handle(mut stream: TcpStream, routes: &HashMap<u32, Reply>, stats: &Stats, delay: Duration) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_head(&mut stream) else {
        return;
    };
    let id = parse_book_id(&request);

    let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if let Some(id) = id {
        stats.requests.lock().unwrap().push(id);
    }
    thread::sleep(delay);
    // Leave before answering: the client may start its next request as soon as it has the reply.
    stats.in_flight.fetch_sub(1, Ordering::SeqCst);

    let reply = id
        .and_then(|id| routes.get(&id).cloned())
        .unwrap_or(Reply::Status(404));
    match reply {
        Reply::Body(body) => respond(&mut stream, 200, body.len(), &body),
        Reply::Status(code) => respond(&mut stream, code, 0, b""),
        Reply::Hangup => {}
        Reply::Truncated(body) => respond(&mut stream, 200, body.len() + 1024, &body),
        Reply::Stall(body) => {
            respond(&mut stream, 200, body.len() + 1024, &body);
            let _ = stream.flush();
            thread::sleep(Duration::from_secs(10));
        }
    }
}

fn respond(stream: &mut TcpStream, code: u16, content_length: usize, body: &[u8]) {
    let reason = match code {
        200 => "OK",
        404 => "Not Found",
        _ => "Whatever",
    };
    let head = format!(
        "HTTP/1.1 {code} {reason}\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n"
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8(buf).ok()
}

/// `GET /cache/epub/7/pg7.txt HTTP/1.1` -> 7
fn parse_book_id(request: &str) -> Option<u32> {
    let path = request.lines().next()?.split_whitespace().nth(1)?;
    let rest = path.strip_prefix("/cache/epub/")?;
    let (id, file) = rest.split_once('/')?;
    (file == format!("pg{id}.txt")).then(|| id.parse().ok())?
}
