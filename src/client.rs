//! Synchronous DNS transport clients.
//!
//! Each client serializes a query [`Message`] (with name compression
//! enabled), performs one logical exchange over its transport, and parses
//! the response. Retry policy beyond a receive timeout is up to the caller;
//! the codec itself never retries.

use std::{
    io::{self, Read, Write},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, UdpSocket},
    time::Duration,
};

use base64::Engine;
use socket2::{Domain, Protocol, Socket, Type};

use crate::{hex::Hex, packet::message::Message, DNS_BUFFER_SIZE};

/// Media type of DNS-over-HTTPS request and response bodies (RFC 8484).
const DNS_MESSAGE_MEDIA_TYPE: &str = "application/dns-message";

/// A client that exchanges DNS messages over UDP datagrams.
///
/// One datagram out, one datagram back; responses that don't answer the
/// query are logged and skipped until the receive timeout elapses.
pub struct UdpClient {
    sock: UdpSocket,
    server: SocketAddr,
}

impl UdpClient {
    const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

    /// Creates a client that will query the given server.
    pub fn new(server: SocketAddr) -> io::Result<Self> {
        let bind_addr: SocketAddr = if server.is_ipv6() {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let sock = Socket::new(Domain::for_address(bind_addr), Type::DGRAM, Some(Protocol::UDP))?;
        sock.set_read_timeout(Some(Self::DEFAULT_TIMEOUT))?;
        sock.bind(&bind_addr.into())?;
        Ok(Self {
            sock: UdpSocket::from(sock),
            server,
        })
    }

    /// Sets the timeout for individual receive operations.
    ///
    /// Datagrams that do not answer the query are skipped, but still reset
    /// the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.sock.set_read_timeout(Some(timeout))
    }

    /// Sends `query` and waits for a response with a matching id.
    ///
    /// If no acceptable response arrives in time, an error of kind
    /// [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`] is
    /// returned.
    pub fn query(&self, query: &Message) -> io::Result<Message> {
        let mut buf = [0; DNS_BUFFER_SIZE];
        let len = query.format(&mut buf, true)?;
        log::trace!("query to {}: {}", self.server, Hex(&buf[..len]));
        self.sock.send_to(&buf[..len], self.server)?;

        loop {
            let mut recv_buf = [0; DNS_BUFFER_SIZE];
            let (len, addr) = self.sock.recv_from(&mut recv_buf)?;
            let recv = &recv_buf[..len];
            log::trace!("recv from {}: {}", addr, Hex(recv));

            match Message::parse(recv) {
                Ok((response, _)) if response.is_response && response.id == query.id => {
                    return Ok(response);
                }
                Ok(_) => log::warn!("ignoring unrelated message from {}", addr),
                Err(e) => log::warn!("failed to decode response from {}: {:?}", addr, e),
            }
        }
    }
}

/// A client that exchanges DNS messages over TCP, one connection per query.
///
/// Messages are framed with a 2-byte big-endian length prefix in both
/// directions.
pub struct TcpClient {
    server: SocketAddr,
}

impl TcpClient {
    pub fn new(server: SocketAddr) -> Self {
        Self { server }
    }

    /// Connects to the server, sends `query`, and reads the framed response.
    pub fn query(&self, query: &Message) -> io::Result<Message> {
        let mut buf = [0; DNS_BUFFER_SIZE + 2];
        let len = query.format(&mut buf[2..], true)?;
        buf[..2].copy_from_slice(&(len as u16).to_be_bytes());

        let mut stream = TcpStream::connect(self.server)?;
        log::trace!("query to {}: {}", self.server, Hex(&buf[2..len + 2]));
        stream.write_all(&buf[..len + 2])?;

        let mut len_buf = [0; 2];
        stream.read_exact(&mut len_buf)?;
        let mut response = vec![0; usize::from(u16::from_be_bytes(len_buf))];
        stream.read_exact(&mut response)?;
        log::trace!("recv from {}: {}", self.server, Hex(&response));

        let (response, _) = Message::parse(&response)?;
        Ok(response)
    }
}

/// HTTP method used for a DNS-over-HTTPS exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DohMethod {
    /// The message travels base64url-encoded in the `dns` query parameter.
    Get,
    /// The message travels as the raw request body.
    Post,
}

/// A DNS-over-HTTPS client in the RFC 8484 style.
pub struct HttpsClient {
    url: String,
    http: reqwest::blocking::Client,
}

impl HttpsClient {
    /// Creates a client for the given DoH endpoint, e.g.
    /// `https://cloudflare-dns.com/dns-query`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Sends `query` with the chosen HTTP method and parses the response
    /// body.
    pub fn query(&self, query: &Message, method: DohMethod) -> io::Result<Message> {
        let mut buf = [0; DNS_BUFFER_SIZE];
        let len = query.format(&mut buf, true)?;
        let message = &buf[..len];
        log::trace!("query to {}: {}", self.url, Hex(message));

        let request = match method {
            DohMethod::Get => self.http.get(&self.url).query(&[("dns", base64url(message))]),
            DohMethod::Post => self
                .http
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, DNS_MESSAGE_MEDIA_TYPE)
                .body(message.to_vec()),
        };

        let body = request
            .header(reqwest::header::ACCEPT, DNS_MESSAGE_MEDIA_TYPE)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let (response, _) = Message::parse(&body)?;
        Ok(response)
    }
}

/// Unpadded base64url, as required for the `dns` query parameter.
fn base64url(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}
