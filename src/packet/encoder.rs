//! DNS message encoder.

use bytemuck::NoUninit;

use super::{
    message::Message,
    punycode,
    records::ResourceRecord,
    Error, Header, IDNA_PREFIX,
};

/// Maximum length of an encoded label; the two top bits of the length byte
/// are claimed by the pointer encoding.
const MAX_LABEL_LEN: usize = 0b0011_1111;

/// Largest message offset a 14-bit compression pointer can express.
const MAX_POINTER_OFFSET: usize = 0b0011_1111_1111_1111;

const POINTER_TAG: u16 = 0b1100_0000_0000_0000;

pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    pub(crate) pos: usize,
    /// Suffixes already written to this message and the offsets they were
    /// first written at, for name compression. `None` when compression is
    /// disabled.
    suffixes: Option<Vec<(usize, String)>>,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8], compress: bool) -> Self {
        Self {
            buf,
            pos: 0,
            suffixes: compress.then(Vec::new),
        }
    }

    pub(crate) fn write_slice(&mut self, data: &[u8]) -> Result<(), Error> {
        let dest = self
            .buf
            .get_mut(self.pos..self.pos + data.len())
            .ok_or(Error::DestinationTooSmall)?;
        dest.copy_from_slice(data);
        self.pos += data.len();
        Ok(())
    }

    pub(crate) fn write_obj<T: NoUninit>(&mut self, obj: T) -> Result<(), Error> {
        self.write_slice(bytemuck::bytes_of(&obj))
    }

    pub(crate) fn write_u8(&mut self, b: u8) -> Result<(), Error> {
        self.write_slice(&[b])
    }

    pub(crate) fn write_u16(&mut self, v: u16) -> Result<(), Error> {
        self.write_slice(&v.to_be_bytes())
    }

    pub(crate) fn write_u32(&mut self, v: u32) -> Result<(), Error> {
        self.write_slice(&v.to_be_bytes())
    }

    pub(crate) fn write_i32(&mut self, v: i32) -> Result<(), Error> {
        self.write_slice(&v.to_be_bytes())
    }

    /// Overwrites a big-endian `u16` that was already written at `pos`.
    ///
    /// Used to backfill a record's RDLENGTH once its payload size is known.
    fn patch_u16(&mut self, pos: usize, v: u16) {
        debug_assert!(pos + 2 <= self.pos);
        self.buf[pos..pos + 2].copy_from_slice(&v.to_be_bytes());
    }

    fn saved_suffix_offset(&self, suffix: &str) -> Option<usize> {
        self.suffixes
            .as_ref()?
            .iter()
            .find(|(_, s)| s == suffix)
            .map(|&(offset, _)| offset)
    }

    fn save_suffix(&mut self, suffix: &str) {
        // Offsets beyond the pointer range can never be referenced, so they
        // are not worth remembering.
        if self.pos <= MAX_POINTER_OFFSET {
            if let Some(suffixes) = &mut self.suffixes {
                suffixes.push((self.pos, suffix.to_string()));
            }
        }
    }

    /// Writes a `<domain-name>` value as length-prefixed labels, compressing
    /// repeated suffixes into pointers when compression is enabled.
    pub(crate) fn write_domain_name(&mut self, name: &str) -> Result<(), Error> {
        // A single trailing dot is allowed and carries no meaning.
        let mut rest = name.strip_suffix('.').unwrap_or(name);

        while !rest.is_empty() {
            if let Some(offset) = self.saved_suffix_offset(rest) {
                return self.write_u16(POINTER_TAG | offset as u16);
            }
            self.save_suffix(rest);

            let (label, tail) = match rest.split_once('.') {
                Some((label, tail)) => (label, tail),
                None => (rest, ""),
            };
            rest = tail;

            if label.is_empty() {
                return Err(Error::InvalidEmptyLabel);
            }
            self.write_label(label)?;
        }

        // Implicit root label at the end.
        self.write_u8(0)
    }

    fn write_label(&mut self, label: &str) -> Result<(), Error> {
        if label.is_ascii() {
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::LabelTooLong);
            }
            self.write_u8(label.len() as u8)?;
            self.write_slice(label.as_bytes())
        } else {
            let encoded = punycode::encode(label)?;
            let len = IDNA_PREFIX.len() + encoded.len();
            if len > MAX_LABEL_LEN {
                return Err(Error::LabelTooLong);
            }
            self.write_u8(len as u8)?;
            self.write_slice(IDNA_PREFIX)?;
            self.write_slice(encoded.as_bytes())
        }
    }

    fn write_resource_record(&mut self, rr: &ResourceRecord) -> Result<(), Error> {
        self.write_domain_name(&rr.name)?;
        self.write_u16(rr.rtype.0)?;
        self.write_u16(rr.class.0)?;
        self.write_i32(rr.ttl)?;

        // RDLENGTH is only known once the payload has been written, so a
        // placeholder goes first and is patched afterwards.
        let lenpos = self.pos;
        self.write_u16(0)?;
        let before_rdata = self.pos;
        rr.data.encode(self)?;
        let rdlength =
            u16::try_from(self.pos - before_rdata).map_err(|_| Error::CountOverflow)?;
        self.patch_u16(lenpos, rdlength);
        Ok(())
    }

    fn write_section(&mut self, section: &Option<Vec<ResourceRecord>>) -> Result<(), Error> {
        for rr in section.iter().flatten() {
            self.write_resource_record(rr)?;
        }
        Ok(())
    }
}

fn section_count(len: usize) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| Error::CountOverflow)
}

/// Formats a whole DNS message into `destination`, returning the number of
/// bytes written.
pub(crate) fn format_message(
    message: &Message,
    destination: &mut [u8],
    compress: bool,
) -> Result<usize, Error> {
    let mut w = Writer::new(destination, compress);

    let mut header = Header::default();
    header.set_id(message.id);
    header.set_response(message.is_response);
    header.set_opcode(message.opcode);
    header.set_authoritative(message.authoritative);
    // The truncated flag is never set on output, regardless of the
    // in-memory value: truncation is decided by whoever cuts the message
    // down to transport size, not by the serializer.
    header.set_recursion_desired(message.recursion_desired);
    header.set_recursion_available(message.recursion_available);
    header.set_rcode(message.rcode);
    header.set_qdcount(section_count(message.queries.len())?);
    header.set_ancount(section_count(message.answers.as_ref().map_or(0, Vec::len))?);
    header.set_nscount(section_count(message.authorities.as_ref().map_or(0, Vec::len))?);
    header.set_arcount(section_count(message.additional.as_ref().map_or(0, Vec::len))?);
    w.write_obj(header)?;

    for query in &message.queries {
        w.write_domain_name(&query.name)?;
        w.write_u16(query.qtype.0)?;
        w.write_u16(query.class.0)?;
    }
    w.write_section(&message.answers)?;
    w.write_section(&message.authorities)?;
    w.write_section(&message.additional)?;

    Ok(w.pos)
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::hex::Hex;
    use crate::packet::message::{Message, Query};
    use crate::packet::Type;

    use super::*;

    fn format(message: &Message, compress: bool) -> Vec<u8> {
        let mut buf = [0; crate::DNS_BUFFER_SIZE];
        let len = message.format(&mut buf, compress).unwrap();
        buf[..len].to_vec()
    }

    #[test]
    fn format_empty_message() {
        let message = Message {
            id: 0x1234,
            ..Message::default()
        };
        expect!["123400000000000000000000"].assert_eq(&Hex(&format(&message, false)).to_string());
    }

    #[test]
    fn format_query() {
        let message = Message::query(0x0102, Query::new("a.bc", Type::A));
        expect!["01020100000100000000000001610262630000010001"]
            .assert_eq(&Hex(&format(&message, false)).to_string());
    }

    #[test]
    fn format_empty_name() {
        let message = Message::query(0, Query::new("", Type::ALL));
        let bytes = format(&message, true);
        // Just the root terminator, no labels, no pointer.
        assert_eq!(&bytes[12..], &[0, 0, 255, 0, 1]);
    }

    #[test]
    fn format_rejects_empty_label() {
        let mut buf = [0; 64];
        let message = Message::query(0, Query::new("a..b", Type::A));
        assert_eq!(message.format(&mut buf, false), Err(Error::InvalidEmptyLabel));
        let message = Message::query(0, Query::new(".com", Type::A));
        assert_eq!(message.format(&mut buf, false), Err(Error::InvalidEmptyLabel));
    }

    #[test]
    fn format_allows_trailing_dot() {
        let with_dot = Message::query(7, Query::new("example.com.", Type::A));
        let without = Message::query(7, Query::new("example.com", Type::A));
        assert_eq!(format(&with_dot, false), format(&without, false));
    }

    #[test]
    fn format_rejects_overlong_label() {
        let mut buf = [0; 128];
        let message = Message::query(0, Query::new("a".repeat(64), Type::A));
        assert_eq!(message.format(&mut buf, false), Err(Error::LabelTooLong));
    }

    #[test]
    fn format_destination_too_small() {
        let mut buf = [0; 11];
        let message = Message::default();
        assert_eq!(message.format(&mut buf, false), Err(Error::DestinationTooSmall));

        let mut buf = [0; 14];
        let message = Message::query(0, Query::new("example.com", Type::A));
        assert_eq!(message.format(&mut buf, false), Err(Error::DestinationTooSmall));
    }

    #[test]
    fn format_count_overflow() {
        let mut buf = [0; 32];
        let mut message = Message::default();
        message.queries = vec![Query::new("", Type::A); 65536];
        assert_eq!(message.format(&mut buf, false), Err(Error::CountOverflow));
    }

    #[test]
    fn compression_uses_pointers() {
        let mut message = Message::default();
        message.queries = vec![
            Query::new("example.com", Type::A),
            Query::new("www.example.com", Type::A),
            Query::new("com", Type::A),
        ];

        let compressed = format(&message, true);
        let uncompressed = format(&message, false);
        assert!(
            compressed.len() < uncompressed.len(),
            "{} >= {}",
            compressed.len(),
            uncompressed.len()
        );

        // "www.example.com" shares the "example.com" suffix written at
        // offset 12; "com" was first written at offset 20.
        let (reparsed, consumed) = Message::parse(&compressed).unwrap();
        assert_eq!(consumed, compressed.len());
        assert_eq!(reparsed.queries[0].name, "example.com");
        assert_eq!(reparsed.queries[1].name, "www.example.com");
        assert_eq!(reparsed.queries[2].name, "com");
    }
}
