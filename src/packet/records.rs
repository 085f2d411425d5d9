//! DNS resource records and their type-specific payloads.

use core::fmt;
use std::net::IpAddr;

use crate::hex::Hex;

use super::{decoder::Reader, encoder::Writer, Class, Error, Type};

/// Type-specific payload of a [`ResourceRecord`].
///
/// Record types without a dedicated variant are carried as [`Unknown`]
/// payloads, which round-trip their RDATA bytes untouched.
///
/// [`Unknown`]: RecordData::Unknown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// A raw IPv4 (A) or IPv6 (AAAA) host address.
    Address(IpAddr),
    /// A single target domain name, used for CNAME.
    DomainName(String),
    /// Mail exchange preference and target mail server (MX).
    MailExchange { preference: u16, exchange: String },
    /// Text payload (TXT), interpreted as UTF-8.
    ///
    /// The whole RDATA is treated as one string; the RFC 1035
    /// character-string framing (length-prefixed segments) is deliberately
    /// not applied. Bytes that are not valid UTF-8 are replaced with U+FFFD.
    Text(String),
    /// Zone administration data (SOA).
    StartOfAuthority {
        zone: String,
        mailbox: String,
        serial: u32,
        refresh: i32,
        retry: i32,
        expire: i32,
        minimum_ttl: u32,
    },
    /// Opaque payload of a record type without a dedicated variant.
    Unknown(Vec<u8>),
}

impl RecordData {
    /// Decodes the payload of a record of type `rtype` from `r`, which is
    /// clamped to exactly `rdlength` bytes.
    ///
    /// The cursor must advance by exactly `rdlength`; any shortfall or
    /// overrun is a [`Error::DataLengthOverrun`].
    pub(crate) fn decode(r: &mut Reader<'_>, rtype: Type, rdlength: u16) -> Result<Self, Error> {
        let rdlength = usize::from(rdlength);
        let start = r.position();
        let data = Self::decode_variant(r, rtype, rdlength).map_err(|e| match e {
            // The reader is clamped to the declared RDATA, so running out of
            // data here means the payload disagrees with its RDLENGTH.
            Error::InsufficientData => Error::DataLengthOverrun,
            other => other,
        })?;
        if r.position() - start != rdlength {
            return Err(Error::DataLengthOverrun);
        }
        Ok(data)
    }

    fn decode_variant(r: &mut Reader<'_>, rtype: Type, rdlength: usize) -> Result<Self, Error> {
        Ok(match rtype {
            Type::A | Type::AAAA => match rdlength {
                4 => RecordData::Address(IpAddr::from(*r.read_array::<4>()?)),
                16 => RecordData::Address(IpAddr::from(*r.read_array::<16>()?)),
                _ => return Err(Error::DataLengthOverrun),
            },
            Type::CNAME => RecordData::DomainName(r.read_domain_name()?),
            Type::MX => RecordData::MailExchange {
                preference: r.read_u16()?,
                exchange: r.read_domain_name()?,
            },
            Type::TXT => {
                RecordData::Text(String::from_utf8_lossy(r.read_slice(rdlength)?).into_owned())
            }
            Type::SOA => RecordData::StartOfAuthority {
                zone: r.read_domain_name()?,
                mailbox: r.read_domain_name()?,
                serial: r.read_u32()?,
                refresh: r.read_i32()?,
                retry: r.read_i32()?,
                expire: r.read_i32()?,
                minimum_ttl: r.read_u32()?,
            },
            _ => RecordData::Unknown(r.read_slice(rdlength)?.to_vec()),
        })
    }

    /// Writes this payload's RDATA to `w`. The RDLENGTH field is backfilled
    /// by the caller.
    pub(crate) fn encode(&self, w: &mut Writer<'_>) -> Result<(), Error> {
        match self {
            RecordData::Address(IpAddr::V4(addr)) => w.write_slice(&addr.octets()),
            RecordData::Address(IpAddr::V6(addr)) => w.write_slice(&addr.octets()),
            RecordData::DomainName(name) => w.write_domain_name(name),
            RecordData::MailExchange {
                preference,
                exchange,
            } => {
                w.write_u16(*preference)?;
                w.write_domain_name(exchange)
            }
            RecordData::Text(text) => w.write_slice(text.as_bytes()),
            RecordData::StartOfAuthority {
                zone,
                mailbox,
                serial,
                refresh,
                retry,
                expire,
                minimum_ttl,
            } => {
                w.write_domain_name(zone)?;
                w.write_domain_name(mailbox)?;
                w.write_u32(*serial)?;
                w.write_i32(*refresh)?;
                w.write_i32(*retry)?;
                w.write_i32(*expire)?;
                w.write_u32(*minimum_ttl)
            }
            RecordData::Unknown(data) => w.write_slice(data),
        }
    }

    /// Returns the record type this payload has a dedicated encoding for.
    ///
    /// [`Address`] distinguishes A and AAAA by address family; [`Unknown`]
    /// payloads carry no type of their own and return `None`.
    ///
    /// [`Address`]: RecordData::Address
    /// [`Unknown`]: RecordData::Unknown
    pub fn record_type(&self) -> Option<Type> {
        match self {
            RecordData::Address(IpAddr::V4(_)) => Some(Type::A),
            RecordData::Address(IpAddr::V6(_)) => Some(Type::AAAA),
            RecordData::DomainName(_) => Some(Type::CNAME),
            RecordData::MailExchange { .. } => Some(Type::MX),
            RecordData::Text(_) => Some(Type::TXT),
            RecordData::StartOfAuthority { .. } => Some(Type::SOA),
            RecordData::Unknown(_) => None,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::Address(addr) => addr.fmt(f),
            RecordData::DomainName(name) => name.fmt(f),
            RecordData::MailExchange {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            RecordData::Text(text) => text.fmt(f),
            RecordData::StartOfAuthority {
                zone,
                mailbox,
                serial,
                refresh,
                retry,
                expire,
                minimum_ttl,
            } => write!(
                f,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                zone, mailbox, serial, refresh, retry, expire, minimum_ttl
            ),
            RecordData::Unknown(data) => Hex(data).fmt(f),
        }
    }
}

/// A resource record from the *Answer*, *Authority*, or *Additional* section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: Type,
    pub class: Class,
    /// Seconds the record may be cached before it must be queried again.
    /// Carried as a signed 32-bit field despite being semantically
    /// non-negative.
    pub ttl: i32,
    pub data: RecordData,
}

impl ResourceRecord {
    /// Creates an Internet-class record, deriving the record type from the
    /// payload variant.
    ///
    /// # Panics
    ///
    /// Panics if `data` is an [`RecordData::Unknown`] payload, which has no
    /// inherent type; build such records with a struct literal instead.
    pub fn new(name: impl Into<String>, ttl: i32, data: RecordData) -> Self {
        let rtype = data
            .record_type()
            .expect("cannot derive a record type from an opaque payload");
        Self {
            name: name.into(),
            rtype,
            class: Class::IN,
            ttl,
            data,
        }
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.class, self.rtype, self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::packet::message::Message;

    use super::*;

    /// Builds a response packet with one answer record of the given type,
    /// TTL 0x1234, and RDATA.
    fn answer_packet(rtype: u16, rdata: &[u8]) -> Vec<u8> {
        let mut packet = vec![0, 0, 0x80, 0, 0, 0, 0, 1, 0, 0, 0, 0];
        packet.extend_from_slice(&[
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
        ]);
        packet.extend_from_slice(&rtype.to_be_bytes());
        packet.extend_from_slice(&[0, 1, 0, 0, 0x12, 0x34]);
        packet.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        packet.extend_from_slice(rdata);
        packet
    }

    fn parse_answer(packet: &[u8]) -> ResourceRecord {
        let (message, consumed) = Message::parse(packet).unwrap();
        assert_eq!(consumed, packet.len());
        assert!(message.is_response);
        let answers = message.answers.unwrap();
        assert_eq!(answers.len(), 1);
        answers.into_iter().next().unwrap()
    }

    #[test]
    fn ipv4_answer() {
        let packet = answer_packet(1, &[93, 184, 216, 34]);
        let rr = parse_answer(&packet);
        assert_eq!(rr.rtype, Type::A);
        assert_eq!(rr.class, Class::IN);
        assert_eq!(rr.ttl, 0x1234);
        assert_eq!(rr.data, RecordData::Address("93.184.216.34".parse().unwrap()));
        expect!["example.com\t4660\tIN\tA\t93.184.216.34"].assert_eq(&rr.to_string());
    }

    #[test]
    fn ipv6_answer() {
        let packet = answer_packet(
            28,
            &[
                0x26, 0x06, 0x28, 0x00, 0x02, 0x20, 0x00, 0x01, //
                0x02, 0x48, 0x18, 0x93, 0x25, 0xc8, 0x19, 0x46,
            ],
        );
        let rr = parse_answer(&packet);
        assert_eq!(rr.rtype, Type::AAAA);
        assert_eq!(rr.ttl, 0x1234);
        assert_eq!(
            rr.data,
            RecordData::Address("2606:2800:220:1:248:1893:25c8:1946".parse().unwrap())
        );
    }

    #[test]
    fn address_answer_with_bad_length() {
        let packet = answer_packet(1, &[93, 184, 216]);
        assert_eq!(Message::parse(&packet), Err(Error::DataLengthOverrun));
    }

    #[test]
    fn txt_answer() {
        let packet = answer_packet(16, b"Hello, world!");
        let rr = parse_answer(&packet);
        assert_eq!(rr.rtype, Type::TXT);
        assert_eq!(rr.data, RecordData::Text("Hello, world!".into()));
    }

    #[test]
    fn cname_answer() {
        let packet = answer_packet(5, &[3, b'w', b'w', b'w', 1, b'x', 0]);
        let rr = parse_answer(&packet);
        assert_eq!(rr.data, RecordData::DomainName("www.x".into()));
    }

    #[test]
    fn mx_answer() {
        let packet = answer_packet(15, &[0, 10, 4, b'm', b'a', b'i', b'l', 1, b'x', 0]);
        let rr = parse_answer(&packet);
        assert_eq!(
            rr.data,
            RecordData::MailExchange {
                preference: 10,
                exchange: "mail.x".into(),
            }
        );
    }

    #[test]
    fn soa_answer() {
        let mut rdata = vec![2, b'n', b's', 1, b'x', 0, 4, b'm', b'a', b'i', b'l', 1, b'x', 0];
        rdata.extend_from_slice(&999999u32.to_be_bytes());
        rdata.extend_from_slice(&888888i32.to_be_bytes());
        rdata.extend_from_slice(&777777i32.to_be_bytes());
        rdata.extend_from_slice(&666666i32.to_be_bytes());
        rdata.extend_from_slice(&555555u32.to_be_bytes());
        let packet = answer_packet(6, &rdata);
        let rr = parse_answer(&packet);
        assert_eq!(
            rr.data,
            RecordData::StartOfAuthority {
                zone: "ns.x".into(),
                mailbox: "mail.x".into(),
                serial: 999999,
                refresh: 888888,
                retry: 777777,
                expire: 666666,
                minimum_ttl: 555555,
            }
        );
    }

    #[test]
    fn unrecognized_type_is_opaque() {
        // NS has no dedicated payload variant; its RDATA stays raw.
        let packet = answer_packet(2, &[2, b'n', b's', 1, b'x', 0]);
        let rr = parse_answer(&packet);
        assert_eq!(rr.rtype, Type::NS);
        assert_eq!(rr.data, RecordData::Unknown(vec![2, b'n', b's', 1, b'x', 0]));
        expect!["example.com\t4660\tIN\tNS\t026e73017800"].assert_eq(&rr.to_string());
    }

    #[test]
    fn rdlength_shorter_than_payload() {
        // An MX payload needs a domain name after the preference, but the
        // declared length ends right there.
        let packet = answer_packet(15, &[0, 10]);
        assert_eq!(Message::parse(&packet), Err(Error::DataLengthOverrun));
    }

    #[test]
    fn rdlength_longer_than_payload() {
        // Two stray bytes after the CNAME target.
        let packet = answer_packet(5, &[1, b'x', 0, 0xde, 0xad]);
        assert_eq!(Message::parse(&packet), Err(Error::DataLengthOverrun));
    }

    #[test]
    fn rdlength_overruns_buffer() {
        let mut packet = answer_packet(16, b"hi");
        let len = packet.len();
        packet[len - 4..len - 2].copy_from_slice(&100u16.to_be_bytes());
        assert_eq!(Message::parse(&packet), Err(Error::InsufficientData));
    }

    #[test]
    fn derived_record_types() {
        let rr = ResourceRecord::new("a", 60, RecordData::Text("x".into()));
        assert_eq!(rr.rtype, Type::TXT);
        assert_eq!(rr.class, Class::IN);
        assert_eq!(
            RecordData::Address("::1".parse().unwrap()).record_type(),
            Some(Type::AAAA)
        );
        assert_eq!(RecordData::Unknown(Vec::new()).record_type(), None);
    }
}
