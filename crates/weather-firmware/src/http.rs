//! Plain-HTTP `GET` client over the embassy-net TCP stack

use alloc::vec::Vec;

use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, Ipv4Address, Stack};
use embassy_time::{Duration, with_timeout};
use log::debug;
use weather_core::net::{HttpClient, HttpResponse, HttpUrl, NetError, parse_response};

/// Largest response kept in memory, headers included.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024;

const SOCKET_BUFFER_BYTES: usize = 1536;

/// One-request-per-connection HTTP/1.0 client.
///
/// Every request, from DNS lookup to the last body byte, is bounded by
/// `timeout`.
pub struct StackHttpClient {
    stack: Stack<'static>,
    timeout: Duration,
    rx_buffer: [u8; SOCKET_BUFFER_BYTES],
    tx_buffer: [u8; SOCKET_BUFFER_BYTES],
}

impl StackHttpClient {
    pub fn new(stack: Stack<'static>, timeout: Duration) -> Self {
        Self {
            stack,
            timeout,
            rx_buffer: [0; SOCKET_BUFFER_BYTES],
            tx_buffer: [0; SOCKET_BUFFER_BYTES],
        }
    }

    async fn resolve(&self, host: &str) -> Result<IpAddress, NetError> {
        if let Ok(ip) = host.parse::<Ipv4Address>() {
            return Ok(IpAddress::Ipv4(ip));
        }
        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|_| NetError::Dns)?;
        addresses.first().copied().ok_or(NetError::Dns)
    }

    async fn request(&mut self, url: &str) -> Result<HttpResponse, NetError> {
        let url = HttpUrl::parse(url)?;
        let address = self.resolve(url.host).await?;
        debug!("GET {}:{}{}", url.host, url.port, url.path);

        let stack = self.stack;
        let mut socket = TcpSocket::new(stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(self.timeout));
        socket
            .connect((address, url.port))
            .await
            .map_err(|_| NetError::Connect)?;

        let head = url.request_head();
        let mut sent = 0;
        while sent < head.len() {
            let n = socket
                .write(&head.as_bytes()[sent..])
                .await
                .map_err(|_| NetError::Io)?;
            if n == 0 {
                return Err(NetError::Io);
            }
            sent += n;
        }
        socket.flush().await.map_err(|_| NetError::Io)?;

        let mut raw = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            let n = socket.read(&mut chunk).await.map_err(|_| NetError::Io)?;
            if n == 0 {
                break;
            }
            if raw.len() + n > MAX_RESPONSE_BYTES {
                socket.abort();
                return Err(NetError::BodyTooLarge);
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        socket.close();

        parse_response(&raw)
    }
}

impl HttpClient for StackHttpClient {
    fn is_connected(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }

    async fn get(&mut self, url: &str) -> Result<HttpResponse, NetError> {
        if !self.is_connected() {
            return Err(NetError::Disconnected);
        }
        let timeout = self.timeout;
        with_timeout(timeout, self.request(url))
            .await
            .map_err(|_| NetError::Timeout)?
    }
}
