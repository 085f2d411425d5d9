//! DNS message decoder and encoder.
//!
//! The packet codec is pure: it reads from and writes to caller-supplied
//! buffers and never touches the network. [`message::Message::parse`] and
//! [`message::Message::format`] are the two entry points; everything else in
//! this module exists in service of them.

#[macro_use]
mod macros;
mod decoder;
mod encoder;
mod error;
pub mod message;
pub mod punycode;
pub mod records;

use core::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::num::U16;

pub use self::error::Error;

/// ASCII prefix marking a PunyCode-encoded label (RFC 5890 "xn--").
pub(crate) const IDNA_PREFIX: &[u8] = b"xn--";

ffi_enum! {
    /// DNS message operation codes.
    pub enum Opcode: u8 {
        /// Standard query (or the response to one).
        QUERY = 0,

        /// Inverse query. Optional; servers may answer with `NOT_IMP`.
        IQUERY = 1,

        /// Server status request.
        STATUS = 2,

        NOTIFY = 4,
        UPDATE = 5,
    }
}

ffi_enum! {
    /// Server response codes.
    ///
    /// The message header carries 4 bits of response code, so only values up
    /// to 15 can appear on the wire.
    pub enum RCode: u8 {
        /// No error.
        NO_ERROR = 0,
        /// The query sent by the client was erroneous.
        FORM_ERR = 1,
        /// A server-side error prevented processing of the query.
        SERV_FAIL = 2,
        /// The queried domain name does not exist.
        ///
        /// May only be sent by an authoritative name server.
        NX_DOMAIN = 3,
        /// The requested query type is not supported by the server.
        NOT_IMP = 4,
        /// The server refused to answer the query for policy reasons.
        REFUSED = 5,
        YX_DOMAIN = 6,
        YX_RR_SET = 7,
        NX_RR_SET = 8,
        NOT_AUTH = 9,
        NOT_ZONE = 10,
    }
}

ffi_enum! {
    /// Resource record types.
    ///
    /// Types with a dedicated payload representation are listed in
    /// [`records::RecordData`]; anything else is carried as an opaque
    /// payload.
    pub enum Type: u16 {
        /// IPv4 host address.
        A = 1,
        /// Authoritative name server.
        NS = 2,
        /// Canonical name for an alias.
        CNAME = 5,
        /// Start of a zone of authority.
        SOA = 6,
        /// Domain name pointer (reverse lookups).
        PTR = 12,
        /// Mail exchange.
        MX = 15,
        /// Text strings.
        TXT = 16,
        /// IPv6 host address.
        AAAA = 28,
        /// Service locator.
        SRV = 33,
        /// EDNS pseudo-record.
        OPT = 41,
        DS = 43,
        RRSIG = 46,
        DNSKEY = 48,
        HTTPS = 65,

        /// Request for all record types. Only valid in a query.
        ALL = 255,
    }
}

impl FromStr for Type {
    type Err = Error;

    /// Parses a record type from its mnemonic (case-insensitive) or from its
    /// raw numeric code.
    fn from_str(s: &str) -> Result<Self, Error> {
        let ty = match s.to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "NS" => Self::NS,
            "CNAME" => Self::CNAME,
            "SOA" => Self::SOA,
            "PTR" => Self::PTR,
            "MX" => Self::MX,
            "TXT" => Self::TXT,
            "AAAA" => Self::AAAA,
            "SRV" => Self::SRV,
            "ALL" | "ANY" | "*" => Self::ALL,
            other => return other.parse::<u16>().map(Type).map_err(|_| Error::InvalidValue),
        };
        Ok(ty)
    }
}

ffi_enum! {
    /// Resource record classes.
    pub enum Class: u16 {
        /// The Internet.
        IN = 1,
        /// CSNET.
        CS = 2,
        /// Chaosnet.
        CH = 3,
        /// Hesiod.
        HS = 4,

        /// Request for all classes. Only valid in a query.
        ANY = 255,
    }
}

// Bit positions in the header flags are inverted, because RFC 1035 starts
// counting at the MSb.
const fn be_pos(pos: u16) -> u16 {
    15 - pos
}

bitflags! {
    #[derive(Debug)]
    #[repr(transparent)]
    struct HeaderFlags: u16 {
        /// If set, the message is a response to a query. If unset, it is a query.
        const QR = 1 << be_pos(0);
        const OPCODE = Self::OPCODE_MASK;
        /// Set if this response was sent from a name server that is the
        /// authority for the queried domain name.
        const AA = 1 << be_pos(5);
        /// Set if the message was truncated because it is longer than the
        /// maximum allowed length of the transmission channel.
        const TC = 1 << be_pos(6);
        /// Recursion Desired: set in a query to instruct recursive resolvers
        /// to perform a recursive query. Copied to the response.
        const RD = 1 << be_pos(7);
        /// Recursion Available: set in a response to indicate that the
        /// responding server supports recursion.
        const RA = 1 << be_pos(8);
        /// Reserved bits. Ignored on read, always zero on write.
        const Z = 0b111 << be_pos(9);
        const RCODE = Self::RCODE_MASK;
    }
}

impl HeaderFlags {
    const OPCODE_POS: u16 = 11;
    const OPCODE_MASK: u16 = 0b1111 << Self::OPCODE_POS;

    const RCODE_POS: u16 = 0;
    const RCODE_MASK: u16 = 0b1111 << Self::RCODE_POS;

    fn opcode(&self) -> Opcode {
        Opcode(((self.bits() & Self::OPCODE_MASK) >> Self::OPCODE_POS) as u8)
    }

    fn rcode(&self) -> RCode {
        RCode(((self.bits() & Self::RCODE_MASK) >> Self::RCODE_POS) as u8)
    }
}

/// The wire-level message header: id, flags, and the four section counts.
///
/// [`message::Message`] carries the same information in unpacked form; this
/// type is the 12-byte layout that actually crosses the wire.
#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct Header {
    id: U16,
    flags: U16,
    qdcount: U16,
    ancount: U16,
    nscount: U16,
    arcount: U16,
}

impl Header {
    fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_retain(self.flags.get())
    }

    fn modify_flags(&mut self, with: impl FnOnce(&mut HeaderFlags)) {
        let mut flags = self.flags();
        with(&mut flags);
        self.flags = flags.bits().into();
    }

    /// Returns the 16-bit message ID.
    ///
    /// Servers copy this ID to the corresponding response so that the client
    /// can match responses to its queries.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id.get()
    }

    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.id = id.into();
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags().contains(HeaderFlags::QR)
    }

    pub fn set_response(&mut self, is_response: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::QR, is_response));
    }

    /// Returns whether the truncation flag is set, indicating that the
    /// message was cut short to fit in the transport channel.
    pub fn is_truncated(&self) -> bool {
        self.flags().contains(HeaderFlags::TC)
    }

    pub fn set_truncated(&mut self, trunc: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::TC, trunc));
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.flags().contains(HeaderFlags::RD)
    }

    pub fn set_recursion_desired(&mut self, rd: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::RD, rd));
    }

    pub fn is_recursion_available(&self) -> bool {
        self.flags().contains(HeaderFlags::RA)
    }

    pub fn set_recursion_available(&mut self, ra: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::RA, ra));
    }

    pub fn is_authoritative(&self) -> bool {
        self.flags().contains(HeaderFlags::AA)
    }

    pub fn set_authoritative(&mut self, aa: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::AA, aa));
    }

    pub fn opcode(&self) -> Opcode {
        self.flags().opcode()
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.modify_flags(|f| {
            f.remove(HeaderFlags::OPCODE);
            f.insert(HeaderFlags::from_bits_retain(
                (u16::from(opcode.0) << HeaderFlags::OPCODE_POS) & HeaderFlags::OPCODE_MASK,
            ));
        });
    }

    pub fn rcode(&self) -> RCode {
        self.flags().rcode()
    }

    pub fn set_rcode(&mut self, rcode: RCode) {
        self.modify_flags(|f| {
            f.remove(HeaderFlags::RCODE);
            f.insert(HeaderFlags::from_bits_retain(
                (u16::from(rcode.0) << HeaderFlags::RCODE_POS) & HeaderFlags::RCODE_MASK,
            ));
        });
    }

    pub fn query_count(&self) -> u16 {
        self.qdcount.get()
    }

    pub fn answer_count(&self) -> u16 {
        self.ancount.get()
    }

    pub fn authority_count(&self) -> u16 {
        self.nscount.get()
    }

    pub fn additional_count(&self) -> u16 {
        self.arcount.get()
    }

    fn set_qdcount(&mut self, qdcount: u16) {
        self.qdcount = qdcount.into();
    }

    fn set_ancount(&mut self, ancount: u16) {
        self.ancount = ancount.into();
    }

    fn set_nscount(&mut self, nscount: u16) {
        self.nscount = nscount.into();
    }

    fn set_arcount(&mut self, arcount: u16) {
        self.arcount = arcount.into();
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("id", &self.id())
            .field("flags", &self.flags())
            .field("qdcount", &self.qdcount.get())
            .field("ancount", &self.ancount.get())
            .field("nscount", &self.nscount.get())
            .field("arcount", &self.arcount.get())
            .finish()
    }
}
