//! Minimal HTTP/1.1 server imitating a comic site for integration tests.
//!
//! `GET /~{comic}/{n}` returns an issue page with a `#mainImage` and a
//! `.issueNumber` counter; ids past the last issue show the last issue, like
//! the real site. `GET /upload/{n}.png` returns the image body, or redirects
//! to `/cdn/{n}.gif` when images are moved.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Default)]
pub struct ComicServerOptions {
    /// Images answered with 500.
    pub broken_images: HashSet<u64>,
    /// Serve images without a Content-Type and from an extension-less path.
    pub bare_image_paths: bool,
    /// Answer image links with a 302 to `/cdn/{n}.gif`.
    pub moved_images: bool,
    /// Pages render without the `.issueNumber` counter.
    pub no_counter: bool,
}

#[derive(Debug, Clone)]
pub struct ComicServer {
    pub base: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl ComicServer {
    pub fn image_requests(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with("/upload/"))
            .count()
    }
}

/// Body served for image `n`.
pub fn image_body(n: u64) -> Vec<u8> {
    format!("PNG issue {n} ").repeat(200).into_bytes()
}

pub fn start(comic: &str, total: u64) -> ComicServer {
    start_with_options(comic, total, ComicServerOptions::default())
}

pub fn start_with_options(comic: &str, total: u64, opts: ComicServerOptions) -> ComicServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    let comic = comic.to_string();
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let log = Arc::clone(&log);
            let comic = comic.clone();
            let opts = Arc::clone(&opts);
            thread::spawn(move || handle(stream, &comic, total, &opts, &log));
        }
    });
    ComicServer {
        base: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    comic: &str,
    total: u64,
    opts: &ComicServerOptions,
    log: &Mutex<Vec<String>>,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    log.lock().unwrap().push(path.clone());

    let page_prefix = format!("/~{}/", comic);
    if let Some(id) = path.strip_prefix(&page_prefix).and_then(|s| s.parse::<u64>().ok()) {
        if total == 0 {
            respond(&mut stream, "404 Not Found", None, b"");
            return;
        }
        let shown = id.clamp(1, total);
        let src = if opts.bare_image_paths {
            format!("/upload/raw/{shown}")
        } else {
            format!("/upload/{shown}.png")
        };
        let counter = if opts.no_counter {
            String::new()
        } else {
            format!("<span class=\"issueNumber\">{shown}/{total}</span>")
        };
        let html = format!(
            "<html><body>{counter}<img id=\"mainImage\" src=\"{src}\"></body></html>"
        );
        respond(&mut stream, "200 OK", Some("text/html"), html.as_bytes());
        return;
    }

    if let Some(id) = path.strip_prefix("/cdn/").and_then(|s| s.strip_suffix(".gif")) {
        match id.parse::<u64>() {
            Ok(id) if (1..=total).contains(&id) => {
                respond(&mut stream, "200 OK", Some("image/png"), &image_body(id))
            }
            _ => respond(&mut stream, "404 Not Found", None, b""),
        }
        return;
    }

    let image_id = path
        .strip_prefix("/upload/raw/")
        .or_else(|| path.strip_prefix("/upload/").and_then(|s| s.strip_suffix(".png")))
        .and_then(|s| s.parse::<u64>().ok());
    match image_id {
        Some(id) if opts.broken_images.contains(&id) => {
            respond(&mut stream, "500 Internal Server Error", None, b"")
        }
        Some(id) if opts.moved_images => redirect(&mut stream, &format!("/cdn/{id}.gif")),
        Some(id) if (1..=total).contains(&id) => {
            let content_type = (!opts.bare_image_paths).then_some("image/png");
            respond(&mut stream, "200 OK", content_type, &image_body(id));
        }
        _ => respond(&mut stream, "404 Not Found", None, b""),
    }
}

fn respond(stream: &mut std::net::TcpStream, status: &str, content_type: Option<&str>, body: &[u8]) {
    let content_type = content_type
        .map(|t| format!("Content-Type: {}\r\n", t))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        body.len(),
        content_type
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn redirect(stream: &mut std::net::TcpStream, location: &str) {
    let head = format!(
        "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        location
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.flush();
}
