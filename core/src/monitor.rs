//! One-shot HTTP status endpoint.
//!
//! Minimal HTTP/1.0-style behavior: read one request head, answer
//! `GET /status` with the JSON snapshot, close everything else without a
//! body. The snapshot comes from the event core over a oneshot reply so
//! session state stays single-owner.

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::broker::core::Event;

/// Largest request head we are willing to buffer.
const MAX_REQUEST_BYTES: usize = 8 * 1024;
/// A monitor client gets this long to produce a request line.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) async fn serve(listener: TcpListener, events: mpsc::Sender<Event>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(%addr, "monitor request");
                tokio::spawn(respond(stream, events.clone()));
            }
            Err(e) => warn!("monitor accept failed: {e}"),
        }
    }
}

async fn respond(mut stream: TcpStream, events: mpsc::Sender<Event>) {
    let Some(request_line) = read_request_line(&mut stream).await else {
        return;
    };

    if request_line.contains("GET /status") {
        let (reply, answer) = oneshot::channel();
        if events.send(Event::StatusRequest { reply }).await.is_err() {
            return;
        }
        let Ok(snapshot) = answer.await else {
            return;
        };
        let body = match serde_json::to_string(&snapshot) {
            Ok(body) => body,
            Err(e) => {
                warn!("status serialization failed: {e}");
                return;
            }
        };
        let response = format!(
            "HTTP/1.0 200 OK\r\n\
             Content-Type: application/json\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            body.len(),
            body
        );
        if let Err(e) = stream.write_all(response.as_bytes()).await {
            debug!("monitor write failed: {e}");
        }
    }

    let _ = stream.shutdown().await;
}

/// Accumulate bytes until the request line is complete. Returns `None` on
/// EOF, timeout, or an oversized head.
async fn read_request_line(stream: &mut TcpStream) -> Option<String> {
    let mut buf = BytesMut::with_capacity(1024);
    let deadline = tokio::time::Instant::now() + REQUEST_TIMEOUT;

    loop {
        if let Some(end) = buf.iter().position(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(&buf[..end]).into_owned();
            return Some(line);
        }
        if buf.len() >= MAX_REQUEST_BYTES {
            return None;
        }
        match tokio::time::timeout_at(deadline, stream.read_buf(&mut buf)).await {
            Ok(Ok(0)) | Err(_) => return None,
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => {
                debug!("monitor read failed: {e}");
                return None;
            }
        }
    }
}
