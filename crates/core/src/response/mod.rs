//! APDU response definitions
//!
//! This module provides the [`ResponseApdu`] value type for ISO/IEC
//! 7816-3 response APDUs. Both the data field and the trailer may be
//! wildcards that match anything in comparisons; the wildcard data
//! field and an empty data field are distinct values.

mod diff;
pub mod status;

pub use diff::{Difference, Differences};

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};
use status::StatusWord;

/// Canonical encoding of the wildcard trailer.
pub const WILDCARD_TRAILER: u32 = 0x1_0000;

/// Data field of a response APDU.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseData {
    /// Matches any data field of any length.
    Wildcard,
    /// A concrete data field, possibly empty.
    Bytes(Bytes),
}

impl ResponseData {
    /// The concrete bytes, or `None` for the wildcard.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Wildcard => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }

    /// Whether this is the wildcard.
    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

/// Trailer (SW1-SW2) of a response APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trailer {
    /// Matches any trailer.
    Wildcard,
    /// A concrete status word.
    Sw(StatusWord),
}

impl Trailer {
    /// Canonical integer encoding: the status word, or [`WILDCARD_TRAILER`].
    pub const fn value(&self) -> u32 {
        match self {
            Self::Wildcard => WILDCARD_TRAILER,
            Self::Sw(sw) => sw.to_u16() as u32,
        }
    }

    /// First trailer byte of the canonical encoding.
    pub const fn sw1(&self) -> u8 {
        (self.value() >> 8) as u8
    }

    /// Second trailer byte of the canonical encoding.
    pub const fn sw2(&self) -> u8 {
        self.value() as u8
    }

    /// The concrete status word, or `None` for the wildcard.
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::Wildcard => None,
            Self::Sw(sw) => Some(*sw),
        }
    }

    /// Whether this is the wildcard.
    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

/// An ISO 7816-3 response APDU.
///
/// Immutable value type: data field followed by the two trailer bytes.
/// Equality keeps the wildcard data field distinct from an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseApdu {
    data: ResponseData,
    trailer: Trailer,
}

impl ResponseApdu {
    /// Response with concrete data and trailer.
    pub fn new<T: Into<Bytes>>(data: T, sw: u16) -> Self {
        Self {
            data: ResponseData::Bytes(data.into()),
            trailer: Trailer::Sw(StatusWord::from_u16(sw)),
        }
    }

    /// Response with an empty data field.
    pub fn status_only(sw: u16) -> Self {
        Self::new(Bytes::new(), sw)
    }

    /// Response matching any data field.
    pub const fn with_wildcard_data(sw: u16) -> Self {
        Self {
            data: ResponseData::Wildcard,
            trailer: Trailer::Sw(StatusWord::from_u16(sw)),
        }
    }

    /// Response matching any trailer.
    pub fn with_wildcard_trailer<T: Into<Bytes>>(data: T) -> Self {
        Self {
            data: ResponseData::Bytes(data.into()),
            trailer: Trailer::Wildcard,
        }
    }

    /// Response matching anything.
    pub const fn wildcard() -> Self {
        Self {
            data: ResponseData::Wildcard,
            trailer: Trailer::Wildcard,
        }
    }

    /// Assemble a response from its parts.
    pub const fn from_parts(data: ResponseData, trailer: Trailer) -> Self {
        Self { data, trailer }
    }

    /// Parse from raw bytes: a data field followed by SW1 SW2.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some((data, trailer)) = bytes.split_last_chunk::<2>() else {
            return Err(Error::InvalidApdu("response shorter than two bytes"));
        };
        Ok(Self {
            data: ResponseData::Bytes(Bytes::copy_from_slice(data)),
            trailer: Trailer::Sw(StatusWord::new(trailer[0], trailer[1])),
        })
    }

    /// Parse from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(hex)?)
    }

    /// Data field.
    pub const fn data(&self) -> &ResponseData {
        &self.data
    }

    /// Trailer.
    pub const fn trailer(&self) -> Trailer {
        self.trailer
    }

    /// The concrete status word, or `None` for a wildcard trailer.
    pub const fn status_word(&self) -> Option<StatusWord> {
        self.trailer.status_word()
    }

    /// Response data length Nr; 0 for the wildcard.
    pub fn nr(&self) -> usize {
        self.data.bytes().map_or(0, <[u8]>::len)
    }

    /// Whether the data field is the wildcard.
    pub const fn is_wildcard_data(&self) -> bool {
        self.data.is_wildcard()
    }

    /// Serialize: data field (the wildcard as empty) followed by the
    /// trailer bytes of the canonical encoding.
    pub fn to_bytes(&self) -> Bytes {
        let data = self.data.bytes().unwrap_or_default();
        let mut buf = BytesMut::with_capacity(data.len() + 2);
        buf.put_slice(data);
        buf.put_u8(self.trailer.sw1());
        buf.put_u8(self.trailer.sw2());
        buf.freeze()
    }
}

impl TryFrom<&[u8]> for ResponseApdu {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for ResponseApdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.trailer.status_word() {
            Some(sw) => write!(f, "SW1SW2='{:04x}'", sw.to_u16())?,
            None => write!(f, "SW1SW2='*'")?,
        }
        match &self.data {
            ResponseData::Wildcard => write!(f, "  Data='*'")?,
            ResponseData::Bytes(bytes) if !bytes.is_empty() => write!(
                f,
                "  Nr='{:04x}'  Data='{}'",
                bytes.len(),
                hex::encode(bytes)
            )?,
            ResponseData::Bytes(_) => {}
        }
        Ok(())
    }
}
