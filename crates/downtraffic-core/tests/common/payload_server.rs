//! Minimal HTTP/1.1 server for integration tests.
//!
//! Every connection serves one GET and then closes. The body is a fixed-size
//! blob, an endless stream, a slow trickle, or just an error status. Counts
//! the requests it has seen so tests can check that nothing new arrives after
//! cancellation.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum Payload {
    /// `len` bytes with a Content-Length.
    Fixed(usize),
    /// Writes `chunk`-sized pieces until the client goes away.
    Endless { chunk: usize },
    /// Endless, but one `chunk` per `every`.
    Trickle { chunk: usize, every: Duration },
    /// Status line only, empty body.
    Status(u16),
}

pub struct PayloadServer {
    pub url: String,
    requests: Arc<AtomicUsize>,
}

impl PayloadServer {
    /// GET requests received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(payload: Payload) -> PayloadServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, payload, &counter));
        }
    });
    PayloadServer {
        url: format!("http://127.0.0.1:{}/payload.bin", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, payload: Payload, requests: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let method = request.split_whitespace().next().unwrap_or("");
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }
    requests.fetch_add(1, Ordering::SeqCst);

    match payload {
        Payload::Fixed(len) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
                len
            );
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            let body: Vec<u8> = (0u8..251).cycle().take(len).collect();
            let _ = stream.write_all(&body);
        }
        Payload::Endless { chunk } => stream_forever(stream, chunk, None),
        Payload::Trickle { chunk, every } => stream_forever(stream, chunk, Some(every)),
        Payload::Status(code) => {
            let head = format!(
                "HTTP/1.1 {} Test Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                code
            );
            let _ = stream.write_all(head.as_bytes());
        }
    }
}

fn stream_forever(mut stream: TcpStream, chunk: usize, every: Option<Duration>) {
    let head = "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n";
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    let block = vec![0x5au8; chunk];
    loop {
        if stream.write_all(&block).is_err() {
            return;
        }
        if let Some(pause) = every {
            thread::sleep(pause);
        }
    }
}
