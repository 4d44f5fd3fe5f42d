//! Network collaborator and the small slice of HTTP the station speaks
//!
//! Both remote services (forecast and telemetry) are plain `GET` requests
//! over unencrypted HTTP, so the station only needs to split a URL into
//! host/port/path, percent-encode query values, and pull the status code and
//! body out of an HTTP/1.x response. The transport itself lives behind
//! [`HttpClient`], which every back-end must bound with a timeout.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    #[error("network is not connected")]
    Disconnected,
    #[error("request timed out")]
    Timeout,
    #[error("DNS lookup failed")]
    Dns,
    #[error("TCP connect failed")]
    Connect,
    #[error("socket I/O error")]
    Io,
    #[error("unsupported or malformed URL")]
    InvalidUrl,
    #[error("malformed HTTP response")]
    MalformedResponse,
    #[error("response body exceeds buffer")]
    BodyTooLarge,
    #[error("server answered HTTP {0}")]
    Status(u16),
}

/// Status code and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking-free HTTP transport.
///
/// Implementations must give up after a bounded time and report
/// [`NetError::Timeout`]; a hung request would otherwise stall every other
/// activity in the loop.
pub trait HttpClient {
    /// Whether the link is up and has an address.
    fn is_connected(&self) -> bool;

    /// Issue a `GET` for an absolute `http://` URL.
    fn get(&mut self, url: &str) -> impl Future<Output = Result<HttpResponse, NetError>>;
}

/// An `http://` URL split into the parts a socket needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpUrl<'a> {
    pub host: &'a str,
    pub port: u16,
    /// Path plus query, always starting with `/`.
    pub path: &'a str,
}

impl<'a> HttpUrl<'a> {
    pub const DEFAULT_PORT: u16 = 80;

    pub fn parse(url: &'a str) -> Result<Self, NetError> {
        let rest = url.strip_prefix("http://").ok_or(NetError::InvalidUrl)?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| NetError::InvalidUrl)?),
            None => (authority, Self::DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(NetError::InvalidUrl);
        }

        Ok(Self { host, port, path })
    }

    /// Write the `HTTP/1.0` request head for a `GET` of this URL.
    ///
    /// HTTP/1.0 keeps servers from answering with chunked encoding and
    /// closes the connection after the body.
    pub fn request_head(&self) -> String {
        let mut head = String::with_capacity(self.path.len() + self.host.len() + 64);
        let _ = write!(
            head,
            "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.path, self.host
        );
        head
    }
}

/// Append `value` to `out`, percent-encoding everything but unreserved
/// characters.
pub fn push_query_value(out: &mut String, value: &str) {
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse a complete HTTP/1.x response held in memory.
pub fn parse_response(raw: &[u8]) -> Result<HttpResponse, NetError> {
    let head_end = find_subslice(raw, b"\r\n\r\n").ok_or(NetError::MalformedResponse)?;
    let head = core::str::from_utf8(&raw[..head_end]).map_err(|_| NetError::MalformedResponse)?;
    let body = &raw[head_end + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().ok_or(NetError::MalformedResponse)?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(NetError::MalformedResponse);
    }
    let status: u16 = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or(NetError::MalformedResponse)?;

    let mut content_length: Option<usize> = None;
    let mut chunked = false;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(value.parse().map_err(|_| NetError::MalformedResponse)?);
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && value.eq_ignore_ascii_case("chunked")
        {
            chunked = true;
        }
    }

    let body = if chunked {
        decode_chunked(body)?
    } else if let Some(len) = content_length {
        body.get(..len).ok_or(NetError::MalformedResponse)?.to_vec()
    } else {
        body.to_vec()
    };

    Ok(HttpResponse { status, body })
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, NetError> {
    let mut body = Vec::with_capacity(data.len());
    loop {
        let line_end = find_subslice(data, b"\r\n").ok_or(NetError::MalformedResponse)?;
        let size_line =
            core::str::from_utf8(&data[..line_end]).map_err(|_| NetError::MalformedResponse)?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size =
            usize::from_str_radix(size_hex, 16).map_err(|_| NetError::MalformedResponse)?;
        data = &data[line_end + 2..];

        if size == 0 {
            return Ok(body);
        }

        let chunk = data.get(..size).ok_or(NetError::MalformedResponse)?;
        body.extend_from_slice(chunk);
        data = data.get(size + 2..).ok_or(NetError::MalformedResponse)?;
    }
}
