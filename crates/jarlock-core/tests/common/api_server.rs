//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves registered paths with fixed bodies, can fail the first N requests
//! to a path with 503, can stall mid-body, and counts hits per path.
//! Unknown paths get 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Route {
    pub body: Vec<u8>,
    /// Answer this many requests with 503 before serving the body.
    pub fail_first: usize,
    /// Send the first body byte, then pause this long before the rest.
    pub stall: Option<Duration>,
}

impl Route {
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            body: serde_json::to_vec(&value).unwrap(),
            ..Self::default()
        }
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn stalling_for(mut self, pause: Duration) -> Self {
        self.stall = Some(pause);
        self
    }
}

#[derive(Default)]
struct Shared {
    routes: HashMap<String, Route>,
    hits: HashMap<String, usize>,
}

pub struct ApiServer {
    base: String,
    shared: Arc<Mutex<Shared>>,
}

impl ApiServer {
    /// Starts a server in a background thread. It runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Mutex::new(Shared::default()));
        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let shared = Arc::clone(&accept_shared);
                thread::spawn(move || handle(stream, &shared));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            shared,
        }
    }

    pub fn route(&self, path: &str, route: Route) {
        self.shared
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), route);
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.shared
            .lock()
            .unwrap()
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

fn handle(mut stream: std::net::TcpStream, shared: &Mutex<Shared>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();

    let reply = {
        let mut shared = shared.lock().unwrap();
        let hit = {
            let count = shared.hits.entry(path.clone()).or_insert(0);
            *count += 1;
            *count
        };
        match shared.routes.get(&path) {
            None => None,
            Some(route) if hit <= route.fail_first => Some(Err(())),
            Some(route) => Some(Ok((route.body.clone(), route.stall))),
        }
    };

    let (status, body, stall) = match reply {
        None => ("404 Not Found", Vec::new(), None),
        Some(Err(())) => ("503 Service Unavailable", Vec::new(), None),
        Some(Ok((body, stall))) => ("200 OK", body, stall),
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    match stall {
        Some(pause) if !body.is_empty() => {
            let _ = stream.write_all(&body[..1]);
            let _ = stream.flush();
            thread::sleep(pause);
            let _ = stream.write_all(&body[1..]);
        }
        _ => {
            let _ = stream.write_all(&body);
        }
    }
}
