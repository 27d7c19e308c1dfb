//! Canned-response HTTP fixtures for tests.
//!
//! The device protocol is plain HTTP/1.1 with small bodies, so tests serve
//! scripted responses straight off a `TcpListener` instead of pulling in a
//! mock-HTTP framework.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Spawn a one-shot HTTP server on an ephemeral port. `respond` receives
/// the raw request (headers + body) and returns the raw response to write.
/// Returns the `host:port` string to aim the client at.
pub async fn spawn_http_fixture<F>(respond: F) -> String
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let request = read_request(&mut stream).await;
            let response = respond(&request);
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    format!("127.0.0.1:{}", addr.port())
}

/// Read a full HTTP/1.1 request: headers, then `Content-Length` body bytes.
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = stream.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            continue;
        };
        let content_length = text
            .lines()
            .find_map(|l| {
                let lower = l.to_ascii_lowercase();
                let value = lower.strip_prefix("content-length:")?;
                value.trim().parse::<usize>().ok()
            })
            .unwrap_or(0);
        if raw.len() >= header_end + 4 + content_length {
            break;
        }
    }

    String::from_utf8_lossy(&raw).into_owned()
}

/// Wrap a JSON body in a minimal HTTP/1.1 200 response.
pub fn json_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}
