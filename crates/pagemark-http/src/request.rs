//! Minimal HTTP/1.1 request reading.

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

// Annotation payloads carry DOM snippets and nearby text; 1 MiB is far
// beyond anything the reviewer UI produces.
const MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub(crate) struct Request {
    pub method: String,
    pub path: String,
    pub body: String,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Read one request from the socket: request line, headers, and as many
/// body bytes as Content-Length announces. The query string is dropped;
/// no route uses it.
pub(crate) async fn read_request(socket: &mut TcpStream) -> anyhow::Result<Request> {
    let mut buf: Vec<u8> = Vec::with_capacity(8192);
    let mut chunk = [0_u8; 8192];

    let header_end = loop {
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            anyhow::bail!("request head too large");
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            anyhow::bail!("connection closed before request head was complete");
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("malformed request line"))?
        .to_ascii_uppercase();
    let target = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("malformed request line"))?;
    let path = target.split('?').next().unwrap_or("/").to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    if content_length > MAX_REQUEST_BYTES {
        anyhow::bail!("request body too large");
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            anyhow::bail!("connection closed before request body was complete");
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();

    Ok(Request { method, path, body })
}
