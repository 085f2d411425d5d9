use std::{fmt, io};

/// Errors reported by the message, name, record, and PunyCode codecs.
///
/// Every failure is reported once, synchronously, to the immediate caller;
/// nothing is retried or recovered inside the codec, and no partial result
/// is returned alongside an error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// The buffer ended before a required fixed-size field could be read.
    InsufficientData,
    /// A compression pointer targeted a position outside the buffer, or did
    /// not point strictly backwards.
    PointerOutOfRange,
    /// A record payload did not consume exactly its declared RDLENGTH.
    DataLengthOverrun,
    /// The destination buffer is too small for the formatted message. The
    /// caller must retry with a larger buffer.
    DestinationTooSmall,
    /// A section holds more than 65535 entries, or a record payload exceeds
    /// 65535 bytes.
    CountOverflow,
    /// A field was set to an invalid (reserved for future use or illegal)
    /// value.
    InvalidValue,
    /// An empty label was encountered where it is not allowed.
    InvalidEmptyLabel,
    /// A label exceeded the maximum encodable label length of 63 bytes.
    LabelTooLong,
    /// A decoded domain name exceeded the 255-character name ceiling.
    NameTooLong,
    /// PunyCode arithmetic exceeded the representable range.
    Overflow,
    /// PunyCode input contained a character that is not a valid digit, or
    /// decoded to a code point that is itself ASCII.
    InvalidInput,
    /// A PunyCode digit sequence was cut off before its terminating digit.
    Incomplete,
}

impl Error {
    fn description(&self) -> &str {
        match self {
            Error::InsufficientData => "unexpected end of data",
            Error::PointerOutOfRange => "domain name pointer does not point backwards",
            Error::DataLengthOverrun => "record data length mismatch",
            Error::DestinationTooSmall => "destination buffer too small",
            Error::CountOverflow => "count exceeds 16-bit range",
            Error::InvalidValue => "invalid value",
            Error::InvalidEmptyLabel => "invalid empty label",
            Error::LabelTooLong => "label too long",
            Error::NameTooLong => "domain name too long",
            Error::Overflow => "punycode arithmetic overflow",
            Error::InvalidInput => "invalid punycode input",
            Error::Incomplete => "incomplete punycode input",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for Error {}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::InsufficientData => io::ErrorKind::UnexpectedEof.into(),
            Error::PointerOutOfRange => io::Error::new(
                io::ErrorKind::InvalidData,
                "a forward or looping domain name pointer was encountered; this may indicate a \
                 malicious message",
            ),
            Error::DestinationTooSmall => io::ErrorKind::OutOfMemory.into(),
            Error::InvalidEmptyLabel
            | Error::LabelTooLong
            | Error::NameTooLong
            | Error::CountOverflow => io::Error::new(io::ErrorKind::InvalidInput, e.description()),
            _ => io::Error::new(io::ErrorKind::InvalidData, e.description()),
        }
    }
}
