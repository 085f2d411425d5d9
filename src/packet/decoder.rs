//! DNS message decoder.

use core::mem;
use std::{cmp, mem::size_of};

use bytemuck::AnyBitPattern;

use crate::num::{U16, U32};

use super::{
    message::{Message, Query},
    punycode,
    records::{RecordData, ResourceRecord},
    Class, Error, Header, Type, IDNA_PREFIX,
};

/// Maximum length of a decoded domain name, in characters.
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    /// The buffer containing the whole DNS message.
    ///
    /// Compression pointers are absolute offsets from the start of the
    /// message, so the reader always keeps the full buffer around.
    full_buf: &'a [u8],
    /// The current reader position in the buffer.
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            full_buf: buf,
            pos: 0,
        }
    }

    fn buf(&self) -> &'a [u8] {
        &self.full_buf[self.pos..]
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn read_obj<T: AnyBitPattern>(&mut self) -> Result<T, Error> {
        let bytes = self
            .buf()
            .get(..size_of::<T>())
            .ok_or(Error::InsufficientData)?;
        self.pos += mem::size_of::<T>();
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    fn peek_u8(&self) -> Result<u8, Error> {
        self.full_buf
            .get(self.pos)
            .copied()
            .ok_or(Error::InsufficientData)
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        match self.full_buf.get(self.pos..self.pos + len) {
            Some(slice) => {
                self.pos += len;
                Ok(slice)
            }
            None => Err(Error::InsufficientData),
        }
    }

    pub(crate) fn read_array<const LEN: usize>(&mut self) -> Result<&'a [u8; LEN], Error> {
        let slice = self.read_slice(LEN)?;
        Ok(slice.try_into().unwrap())
    }

    /// Splits off another `Reader` at the current position, with a backing
    /// store truncated to `self.pos + len`.
    ///
    /// Record payloads are decoded through such a clamped reader: they may
    /// not read past their declared RDLENGTH, but domain names inside them
    /// can still follow compression pointers to earlier message data.
    fn split_off(&mut self, len: usize) -> Result<Reader<'a>, Error> {
        if self.buf().len() >= len {
            let mut copy = self.clone();
            copy.full_buf = &copy.full_buf[..self.pos + len];
            self.pos += len;
            Ok(copy)
        } else {
            Err(Error::InsufficientData)
        }
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(self.read_obj::<U16>()?.get())
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(self.read_obj::<U32>()?.get())
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a `<domain-name>` value, resolving compression pointers and
    /// transcoding IDNA (`xn--`) labels back to Unicode.
    ///
    /// The reader's forward progress covers the name's forward extent only:
    /// after the first pointer jump, the jumped-to bytes are a back-reference
    /// and do not advance the position any further.
    pub(crate) fn read_domain_name(&mut self) -> Result<String, Error> {
        let mut name = String::new();
        let mut min_pos = self.pos;
        let mut copy = self.clone();
        loop {
            let length = copy.peek_u8()?;
            match length & 0b1100_0000 {
                0b1100_0000 => {
                    // 16-bit pointer to somewhere else in the message.
                    let ptr = usize::from(copy.read_u16()? & 0b0011_1111_1111_1111);
                    if ptr >= min_pos {
                        // We require every pointer to target an earlier part
                        // of the message than the previous one, to prevent
                        // loops. The specification is unclear about what
                        // exactly is allowed.
                        return Err(Error::PointerOutOfRange);
                    }
                    self.pos = cmp::max(self.pos, copy.pos);
                    min_pos = ptr;
                    copy.pos = ptr;
                }
                0b0000_0000 => {
                    copy.pos += 1;

                    // Length byte followed by a label of that many bytes.
                    let length = usize::from(length);
                    if length == 0 {
                        break;
                    }
                    if !name.is_empty() {
                        name.push('.');
                    }
                    let label = copy.read_slice(length)?;
                    match label.strip_prefix(IDNA_PREFIX) {
                        Some(encoded) => name.push_str(&punycode::decode(encoded)?),
                        None => {
                            for &b in label {
                                if !b.is_ascii() {
                                    return Err(Error::InvalidValue);
                                }
                                name.push(b as char);
                            }
                        }
                    }
                    if name.chars().count() > MAX_NAME_LEN {
                        return Err(Error::NameTooLong);
                    }
                }
                _ => return Err(Error::InvalidValue), // length prefixes 01 and 10 are reserved
            }
        }

        self.pos = cmp::max(self.pos, copy.pos);
        Ok(name)
    }

    fn read_query(&mut self) -> Result<Query, Error> {
        let name = self.read_domain_name()?;
        let qtype = Type(self.read_u16()?);
        let class = Class(self.read_u16()?);
        Ok(Query { name, qtype, class })
    }

    fn read_resource_record(&mut self) -> Result<ResourceRecord, Error> {
        let name = self.read_domain_name()?;
        let rtype = Type(self.read_u16()?);
        let class = Class(self.read_u16()?);
        let ttl = self.read_i32()?;
        let rdlength = self.read_u16()?;
        let mut rdata = self.split_off(usize::from(rdlength))?;
        let data = RecordData::decode(&mut rdata, rtype, rdlength)?;
        Ok(ResourceRecord {
            name,
            rtype,
            class,
            ttl,
            data,
        })
    }

    fn read_section(&mut self, count: u16) -> Result<Option<Vec<ResourceRecord>>, Error> {
        if count == 0 {
            return Ok(None);
        }
        let mut records = Vec::new();
        for _ in 0..count {
            records.push(self.read_resource_record()?);
        }
        Ok(Some(records))
    }
}

/// Parses a whole DNS message, returning it together with the number of
/// bytes consumed from `buffer`.
pub(crate) fn parse_message(buffer: &[u8]) -> Result<(Message, usize), Error> {
    let mut r = Reader::new(buffer);
    let header = r.read_obj::<Header>()?;

    let mut queries = Vec::new();
    for _ in 0..header.query_count() {
        queries.push(r.read_query()?);
    }
    let answers = r.read_section(header.answer_count())?;
    let authorities = r.read_section(header.authority_count())?;
    let additional = r.read_section(header.additional_count())?;

    let message = Message {
        id: header.id(),
        is_response: header.is_response(),
        opcode: header.opcode(),
        authoritative: header.is_authoritative(),
        truncated: header.is_truncated(),
        recursion_desired: header.is_recursion_desired(),
        recursion_available: header.is_recursion_available(),
        rcode: header.rcode(),
        queries,
        answers,
        authorities,
        additional,
    };
    Ok((message, r.pos))
}
