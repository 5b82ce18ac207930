//! Minimal HTTP/1.1 server that answers GET requests with scripted replies.
//!
//! Replies are served in order; the last one repeats once the script runs out.
//! Used to exercise the curl backend against OSRM-shaped responses.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    /// Wait this long before answering (simulates a slow router).
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Handle to a running server.
pub struct Server {
    pub base_url: String,
    requests: Arc<AtomicUsize>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl Server {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Request targets (path + query) in arrival order.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

pub const OK_ROUTE: &str = r#"{"code":"Ok","routes":[{"geometry":{"type":"LineString","coordinates":[[-122.41,37.77],[-122.405,37.775],[-122.4,37.78],[-122.39,37.79]]},"duration":420.0,"distance":2940.0}],"waypoints":[]}"#;

pub const NO_ROUTE: &str = r#"{"code":"NoRoute","message":"Impossible route between points"}"#;

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(script: Vec<Reply>) -> Server {
    assert!(!script.is_empty());
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script = Arc::new(script);
    let requests = Arc::new(AtomicUsize::new(0));
    let paths = Arc::new(Mutex::new(Vec::new()));
    {
        let requests = Arc::clone(&requests);
        let paths = Arc::clone(&paths);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let n = requests.fetch_add(1, Ordering::SeqCst);
                let reply = script[n.min(script.len() - 1)].clone();
                let paths = Arc::clone(&paths);
                thread::spawn(move || handle(stream, reply, &paths));
            }
        });
    }
    Server {
        base_url: format!("http://127.0.0.1:{}/", port),
        requests,
        paths,
    }
}

fn handle(mut stream: std::net::TcpStream, reply: Reply, paths: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let target = request
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    paths.lock().unwrap().push(target);

    if !reply.delay.is_zero() {
        thread::sleep(reply.delay);
    }
    let reason = match reply.status {
        200 => "OK",
        400 => "Bad Request",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason,
        reply.body.len(),
        reply.body
    );
    let _ = stream.write_all(response.as_bytes());
}
