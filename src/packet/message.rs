//! DNS message value objects.

use core::fmt;

use super::{decoder, encoder, records::ResourceRecord, Class, Error, Opcode, RCode, Type};

/// A single entry of the *Question* section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The domain name being queried, in Unicode (IDNA labels decoded).
    pub name: String,
    pub qtype: Type,
    pub class: Class,
}

impl Query {
    /// Creates an Internet-class query for `name`.
    pub fn new(name: impl Into<String>, qtype: Type) -> Self {
        Self {
            name: name.into(),
            qtype,
            class: Class::IN,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.name, self.class, self.qtype)
    }
}

/// A decoded DNS message.
///
/// Messages are plain value objects: build one by hand (or via
/// [`Message::query`]) and serialize it with [`Message::format`], or obtain
/// one from [`Message::parse`]. The codec itself performs no I/O and no
/// semantic validation of the message contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u16,
    pub is_response: bool,
    pub opcode: Opcode,
    pub authoritative: bool,
    /// Whether the message was cut short to fit its transport.
    ///
    /// This flag is read faithfully from received messages, but
    /// [`Message::format`] never sets it on output: truncation is decided by
    /// whoever shortens the message, not by the serializer.
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub rcode: RCode,
    pub queries: Vec<Query>,
    /// `None` and `Some(vec![])` are equivalent on the wire; both encode as
    /// a count of zero. Parsing an empty section yields `None`.
    pub answers: Option<Vec<ResourceRecord>>,
    pub authorities: Option<Vec<ResourceRecord>>,
    pub additional: Option<Vec<ResourceRecord>>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            id: 0,
            is_response: false,
            opcode: Opcode::QUERY,
            authoritative: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            rcode: RCode::NO_ERROR,
            queries: Vec::new(),
            answers: None,
            authorities: None,
            additional: None,
        }
    }
}

impl Message {
    /// Builds a recursion-desired query message with a single question.
    pub fn query(id: u16, query: Query) -> Self {
        Self {
            id,
            recursion_desired: true,
            queries: vec![query],
            ..Self::default()
        }
    }

    /// Parses a message from the start of `buffer`.
    ///
    /// Returns the message and the number of bytes it occupied. Trailing
    /// bytes are ignored; a buffer that ends before the header or any
    /// section is complete fails with [`Error::InsufficientData`].
    pub fn parse(buffer: &[u8]) -> Result<(Self, usize), Error> {
        decoder::parse_message(buffer)
    }

    /// Formats this message into `destination` and returns the number of
    /// bytes written.
    ///
    /// With `enable_name_compression`, repeated name suffixes are emitted as
    /// backward pointers. Fails with [`Error::DestinationTooSmall`] if the
    /// buffer cannot hold the message and [`Error::CountOverflow`] if a
    /// section exceeds 65535 entries.
    pub fn format(
        &self,
        destination: &mut [u8],
        enable_name_compression: bool,
    ) -> Result<usize, Error> {
        encoder::format_message(self, destination, enable_name_compression)
    }

    /// Iterates over the records of the answer, authority, and additional
    /// sections, in that order.
    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.answers
            .iter()
            .flatten()
            .chain(self.authorities.iter().flatten())
            .chain(self.additional.iter().flatten())
    }
}

#[cfg(test)]
mod tests {
    use crate::packet::records::RecordData;
    use crate::DNS_BUFFER_SIZE;

    use super::*;

    fn roundtrip(message: &Message) -> Message {
        let mut buf = [0; DNS_BUFFER_SIZE];
        let len = message.format(&mut buf, false).unwrap();
        let (reparsed, consumed) = Message::parse(&buf[..len]).unwrap();
        assert_eq!(consumed, len);
        reparsed
    }

    #[test]
    fn roundtrip_all_record_variants() {
        let message = Message {
            id: 0xbeef,
            is_response: true,
            authoritative: true,
            recursion_desired: true,
            recursion_available: true,
            rcode: RCode::NX_DOMAIN,
            queries: vec![Query::new("example.com", Type::ALL)],
            answers: Some(vec![
                ResourceRecord::new(
                    "example.com",
                    60,
                    RecordData::Address("93.184.216.34".parse().unwrap()),
                ),
                ResourceRecord::new(
                    "example.com",
                    60,
                    RecordData::Address("2606:2800:220:1:248:1893:25c8:1946".parse().unwrap()),
                ),
                ResourceRecord::new(
                    "www.example.com",
                    3600,
                    RecordData::DomainName("example.com".into()),
                ),
                ResourceRecord::new(
                    "example.com",
                    -1,
                    RecordData::MailExchange {
                        preference: 10,
                        exchange: "mail.example.com".into(),
                    },
                ),
                ResourceRecord::new("example.com", 0, RecordData::Text("v=spf1 -all".into())),
            ]),
            authorities: Some(vec![ResourceRecord::new(
                "com",
                86400,
                RecordData::StartOfAuthority {
                    zone: "a.gtld-servers.net".into(),
                    mailbox: "nstld.verisign-grs.com".into(),
                    serial: 1681234567,
                    refresh: 1800,
                    retry: -900,
                    expire: 604800,
                    minimum_ttl: 86400,
                },
            )]),
            additional: Some(vec![ResourceRecord {
                name: "opaque.example".into(),
                rtype: Type(999),
                class: Class::CH,
                ttl: 1,
                data: RecordData::Unknown(vec![0xde, 0xad, 0xbe, 0xef]),
            }]),
            ..Message::default()
        };

        assert_eq!(roundtrip(&message), message);
    }

    #[test]
    fn roundtrip_unicode_name() {
        let message = Message::query(1, Query::new("世界大学.top", Type::A));
        let mut buf = [0; DNS_BUFFER_SIZE];
        let len = message.format(&mut buf, false).unwrap();

        // The label must hit the wire as its IDNA form.
        let needle = b"xn--rhqr3ykwbxv0c";
        assert!(buf[..len]
            .windows(needle.len())
            .any(|window| window == needle));

        let (reparsed, _) = Message::parse(&buf[..len]).unwrap();
        assert_eq!(reparsed.queries[0].name, "世界大学.top");
    }

    #[test]
    fn truncated_flag_does_not_roundtrip() {
        let message = Message {
            truncated: true,
            is_response: true,
            recursion_desired: true,
            ..Message::default()
        };
        let reparsed = roundtrip(&message);
        assert!(!reparsed.truncated, "format must never set TC");
        assert!(reparsed.is_response);
        assert!(reparsed.recursion_desired);
    }

    #[test]
    fn flags_roundtrip() {
        let message = Message {
            id: 0xffff,
            is_response: true,
            opcode: Opcode::STATUS,
            authoritative: true,
            recursion_desired: true,
            recursion_available: true,
            rcode: RCode::REFUSED,
            ..Message::default()
        };
        assert_eq!(roundtrip(&message), message);
    }

    #[test]
    fn empty_sections_parse_as_absent() {
        let message = Message {
            answers: Some(Vec::new()),
            authorities: Some(Vec::new()),
            additional: Some(Vec::new()),
            ..Message::default()
        };
        let reparsed = roundtrip(&message);
        assert_eq!(reparsed.answers, None);
        assert_eq!(reparsed.authorities, None);
        assert_eq!(reparsed.additional, None);
    }

    #[test]
    fn compressed_roundtrip_of_record_names() {
        let message = Message {
            is_response: true,
            queries: vec![Query::new("example.com", Type::MX)],
            answers: Some(vec![ResourceRecord::new(
                "example.com",
                300,
                RecordData::MailExchange {
                    preference: 5,
                    exchange: "mail.example.com".into(),
                },
            )]),
            ..Message::default()
        };

        let mut buf = [0; DNS_BUFFER_SIZE];
        let compressed_len = message.format(&mut buf, true).unwrap();
        let (reparsed, consumed) = Message::parse(&buf[..compressed_len]).unwrap();
        assert_eq!(consumed, compressed_len);
        assert_eq!(reparsed.queries, message.queries);
        assert_eq!(reparsed.answers, message.answers);

        let mut plain = [0; DNS_BUFFER_SIZE];
        let plain_len = message.format(&mut plain, false).unwrap();
        assert!(compressed_len < plain_len);
    }
}
