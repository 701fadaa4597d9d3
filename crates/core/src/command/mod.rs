//! APDU command definitions
//!
//! This module provides the [`CommandApdu`] value type for ISO/IEC 7816-3
//! command APDUs, covering the four ISO cases, the short and extended
//! length encodings, and the logical-channel and secure-messaging bits
//! of the class byte. The [`ApduCommand`] trait is the seam for command
//! families built on top of it.

mod case;
mod class;
mod ne;

pub use case::Case;
pub use ne::{ExpectedLength, NE_EXTENDED_WILDCARD, NE_SHORT_WILDCARD};

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::{BufMut, Bytes, BytesMut};

use crate::response::status::StatusWord;
use crate::{Error, Result};

/// Trait for command families built on top of [`CommandApdu`].
///
/// Concrete command sets (Select, Read Binary, ...) wrap a
/// [`CommandApdu`] and may shadow selected trailer explanations; the
/// shared ISO 7816 table is consulted on miss.
pub trait ApduCommand {
    /// The encoded command APDU.
    fn command(&self) -> &CommandApdu;

    /// Family-specific trailer explanations, consulted before the shared table.
    fn explain_trailer_override(&self, _trailer: u16) -> Option<&'static str> {
        None
    }

    /// Explain a trailer, falling back to the shared ISO 7816 table.
    fn explain_trailer(&self, trailer: u16) -> Cow<'static, str> {
        self.explain_trailer_override(trailer).map_or_else(
            || StatusWord::from_u16(trailer).explain(),
            Cow::Borrowed,
        )
    }

    /// Serialized command bytes, short form when possible.
    fn to_bytes(&self) -> Bytes {
        self.command().to_bytes()
    }
}

/// An ISO 7816-3 command APDU.
///
/// `CommandApdu` is an immutable value type: channel manipulation
/// returns new instances and never mutates in place. Byte inputs are
/// copied at construction, so later mutation of a source buffer cannot
/// invalidate a parsed command.
///
/// Equality covers the full value including the data field. Hashing
/// covers the header and Ne only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandApdu {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Bytes,
    ne: ExpectedLength,
}

impl CommandApdu {
    /// Create a case 1 command (header only).
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Result<Self> {
        Self::build(cla, ins, p1, p2, Bytes::new(), ExpectedLength::Absent)
    }

    /// Create a case 2 command (header and expected response length).
    ///
    /// `ne` uses the canonical encoding: 1..=65535 for an exact length,
    /// [`NE_SHORT_WILDCARD`] for "up to 256" or [`NE_EXTENDED_WILDCARD`]
    /// for "up to 65536".
    pub fn new_with_ne(cla: u8, ins: u8, p1: u8, p2: u8, ne: u32) -> Result<Self> {
        Self::build(cla, ins, p1, p2, Bytes::new(), Self::required_ne(ne)?)
    }

    /// Create a case 3 command (header and command data).
    ///
    /// The data field must be non-empty.
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Result<Self> {
        Self::build(
            cla,
            ins,
            p1,
            p2,
            Self::required_data(data.into())?,
            ExpectedLength::Absent,
        )
    }

    /// Create a case 4 command (header, command data and expected response length).
    ///
    /// The data field must be non-empty.
    pub fn new_with_data_and_ne<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        ne: u32,
    ) -> Result<Self> {
        Self::build(
            cla,
            ins,
            p1,
            p2,
            Self::required_data(data.into())?,
            Self::required_ne(ne)?,
        )
    }

    /// Parse a whole command APDU.
    ///
    /// The short and expanded length encodings are distinguished by the
    /// first body byte, per ISO 7816-3 clause 12.1.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some((header, body)) = bytes.split_at_checked(4) else {
            return Err(Error::InvalidApdu("header shorter than four bytes"));
        };
        let (data, ne) = match body {
            [] => (Bytes::new(), ExpectedLength::Absent),
            [le] => (Bytes::new(), ExpectedLength::from_wire_short(*le)),
            [0, hi, lo, tail @ ..] => {
                let field = u16::from_be_bytes([*hi, *lo]);
                if tail.is_empty() {
                    (Bytes::new(), ExpectedLength::from_wire_extended(field))
                } else {
                    let lc = field as usize;
                    match tail.len().checked_sub(lc) {
                        None => return Err(Error::InvalidApdu("command data field truncated")),
                        Some(0) => (Bytes::copy_from_slice(tail), ExpectedLength::Absent),
                        Some(2) => {
                            let (data, le) = tail.split_at(lc);
                            (
                                Bytes::copy_from_slice(data),
                                ExpectedLength::from_wire_extended(u16::from_be_bytes([
                                    le[0], le[1],
                                ])),
                            )
                        }
                        Some(1) => return Err(Error::InvalidApdu("expanded Le field truncated")),
                        Some(_) => return Err(Error::InvalidApdu("trailing bytes after Le field")),
                    }
                }
            }
            [0, _] => return Err(Error::InvalidApdu("expanded length field truncated")),
            [lc, tail @ ..] => {
                let lc = *lc as usize;
                match tail.len().checked_sub(lc) {
                    None => return Err(Error::InvalidApdu("command data field truncated")),
                    Some(0) => (Bytes::copy_from_slice(tail), ExpectedLength::Absent),
                    Some(1) => (
                        Bytes::copy_from_slice(&tail[..lc]),
                        ExpectedLength::from_wire_short(tail[lc]),
                    ),
                    Some(_) => return Err(Error::InvalidApdu("trailing bytes after Le field")),
                }
            }
        };
        Self::build(header[0], header[1], header[2], header[3], data, ne)
    }

    /// Parse a whole command APDU from a subrange of `bytes`.
    pub fn from_bytes_at(bytes: &[u8], offset: usize, length: usize) -> Result<Self> {
        let out_of_bounds = Error::OutOfBounds {
            offset,
            length,
            available: bytes.len(),
        };
        let end = offset.checked_add(length).ok_or(out_of_bounds.clone())?;
        Self::from_bytes(bytes.get(offset..end).ok_or(out_of_bounds)?)
    }

    /// Parse a whole command APDU from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(hex)?)
    }

    fn required_ne(ne: u32) -> Result<ExpectedLength> {
        let ne = ExpectedLength::from_value(ne)?;
        if ne.is_absent() {
            return Err(Error::LeFieldAbsent);
        }
        Ok(ne)
    }

    fn required_data(data: Bytes) -> Result<Bytes> {
        if data.is_empty() {
            return Err(Error::DataFieldAbsent);
        }
        Ok(data)
    }

    fn build(cla: u8, ins: u8, p1: u8, p2: u8, data: Bytes, ne: ExpectedLength) -> Result<Self> {
        let apdu = Self {
            cla,
            ins,
            p1,
            p2,
            data,
            ne,
        };
        apdu.check(apdu.case())?;
        Ok(apdu)
    }

    /// Validate this command against an ISO case.
    pub fn check(&self, case: Case) -> Result<()> {
        if self.cla == 0xFF {
            return Err(Error::InvalidClass);
        }
        if case.expects_data() {
            if self.data.is_empty() {
                return Err(Error::DataFieldAbsent);
            }
            if self.data.len() > usize::from(u16::MAX) {
                return Err(Error::DataFieldTooLong(self.data.len()));
            }
        } else if !self.data.is_empty() {
            return Err(Error::DataFieldPresent);
        }
        if case.expects_ne() {
            if self.ne.is_absent() {
                return Err(Error::LeFieldAbsent);
            }
        } else if !self.ne.is_absent() {
            return Err(Error::LeFieldPresent);
        }
        Ok(())
    }

    /// Class byte.
    pub const fn cla(&self) -> u8 {
        self.cla
    }

    /// Instruction byte.
    pub const fn ins(&self) -> u8 {
        self.ins
    }

    /// First parameter byte.
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter byte.
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Command data field.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Command data field as a cheaply clonable handle.
    pub fn data_bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Command data length (Nc).
    pub fn nc(&self) -> usize {
        self.data.len()
    }

    /// Expected response length (Ne) in the canonical integer encoding.
    pub const fn ne(&self) -> u32 {
        self.ne.value()
    }

    /// Expected response length (Ne).
    pub const fn expected_length(&self) -> ExpectedLength {
        self.ne
    }

    /// The ISO case derived from Nc and Ne.
    pub fn case(&self) -> Case {
        Case::of(self.data.len(), self.ne.value())
    }

    /// Whether this command fits the short length encoding.
    pub fn is_short(&self) -> bool {
        self.data.len() <= 0xFF && self.ne.fits_short()
    }

    /// Serialize, using the short encoding when possible.
    pub fn to_bytes(&self) -> Bytes {
        if self.is_short() {
            self.encode_short()
        } else {
            self.to_bytes_extended()
        }
    }

    /// Serialize in the short length encoding.
    pub fn to_bytes_short(&self) -> Result<Bytes> {
        if !self.is_short() {
            return Err(Error::ShortFormUnavailable {
                nc: self.data.len(),
                ne: self.ne.value(),
            });
        }
        Ok(self.encode_short())
    }

    fn encode_short(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + 1 + self.data.len() + 1);
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);
        if !self.data.is_empty() {
            buf.put_u8(self.data.len() as u8);
            buf.put_slice(&self.data);
        }
        if !self.ne.is_absent() {
            buf.put_u8(self.ne.value() as u8);
        }
        buf.freeze()
    }

    /// Serialize in the extended length encoding.
    ///
    /// An `UpToShort` Ne widens to `0000` on the extended wire (its low
    /// 16 bits are zero) and parses back as `UpToExtended`.
    pub fn to_bytes_extended(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(4 + 3 + self.data.len() + 2);
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);
        if !self.data.is_empty() || !self.ne.is_absent() {
            buf.put_u8(0x00);
        }
        if !self.data.is_empty() {
            buf.put_u16(self.data.len() as u16);
            buf.put_slice(&self.data);
        }
        if !self.ne.is_absent() {
            buf.put_u16(self.ne.value() as u16);
        }
        buf.freeze()
    }

    /// Logical channel number encoded in CLA, 0..=19.
    pub const fn channel_number(&self) -> u8 {
        class::channel_number(self.cla)
    }

    /// Whether CLA indicates secure messaging.
    pub const fn secure_messaging_indicated(&self) -> bool {
        class::secure_messaging_indicated(self.cla)
    }

    /// Equivalent command on channel 0 with secure messaging not indicated.
    ///
    /// A no-op when the command is already on channel 0 without secure
    /// messaging.
    pub fn remove_channel_number(&self) -> Self {
        if self.channel_number() == 0 && !self.secure_messaging_indicated() {
            return self.clone();
        }
        Self {
            cla: class::clear_channel(self.cla),
            ..self.clone()
        }
    }

    /// Equivalent command on logical channel `channel`.
    ///
    /// A no-op when `channel` is 0, when a non-zero channel is already
    /// encoded, or when secure messaging is indicated.
    pub fn set_channel_number(&self, channel: u8) -> Result<Self> {
        if channel > class::MAX_CHANNEL {
            return Err(Error::InvalidChannel(channel));
        }
        if channel == 0 || self.channel_number() != 0 || self.secure_messaging_indicated() {
            return Ok(self.clone());
        }
        Ok(Self {
            cla: class::apply_channel(self.cla, channel),
            ..self.clone()
        })
    }
}

impl ApduCommand for CommandApdu {
    fn command(&self) -> &Self {
        self
    }
}

impl Hash for CommandApdu {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The data field is deliberately left out of the hash.
        let header = u32::from_be_bytes([self.cla, self.ins, self.p1, self.p2]);
        state.write_u32(header.wrapping_mul(31).wrapping_add(self.ne.value()));
    }
}

impl fmt::Display for CommandApdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CLA='{:02x}' INS='{:02x}' P1='{:02x}' P2='{:02x}'",
            self.cla, self.ins, self.p1, self.p2
        )?;
        if !self.data.is_empty() {
            write!(
                f,
                " Lc='{:04x}' Data='{}'",
                self.data.len(),
                hex::encode(&self.data)
            )?;
        }
        if !self.ne.is_absent() {
            write!(f, " Ne={}", self.ne.value())?;
        }
        Ok(())
    }
}

impl TryFrom<&[u8]> for CommandApdu {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}
