//! DNS wire codec and stub resolver clients.
//!
//! The [`packet`] module implements the RFC 1035 binary message format:
//! parsing and formatting of whole messages, domain names with backward
//! compression pointers, per-type resource record payloads, and RFC 3492
//! PunyCode transcoding for internationalized (`xn--`) labels. The codec
//! performs no I/O of its own.
//!
//! The [`client`] module contains synchronous one-shot clients that carry
//! such messages over UDP, TCP (with length-prefix framing), and HTTPS
//! (`application/dns-message`).

pub mod client;
pub mod packet;

mod hex;
mod num;

pub use packet::Error;

/// Size of DNS message buffers.
///
/// Classic DNS messages over UDP are limited to 512 bytes.
pub const DNS_BUFFER_SIZE: usize = 512;

/// Port DNS servers listen on, for both UDP and TCP.
pub const DNS_PORT: u16 = 53;
