//! Core value types for ISO/IEC 7816 APDU construction, parsing and comparison
//!
//! This crate models smart card APDUs (Application Protocol Data Units)
//! at the byte level:
//!
//! - [`CommandApdu`]: the four ISO cases, short and extended length
//!   encodings, the two "up to" Ne wildcards, and the logical-channel
//!   and secure-messaging bits of the class byte
//! - [`ResponseApdu`]: response data and trailer, either of which may be
//!   a wildcard, plus the structural difference between a received and
//!   an expected response, optionally under a bitmask
//! - [`ApduTransport`]: the seam to whatever moves bytes to a card,
//!   with conveniences that compare the response against expectations
//!
//! All value types are immutable; "mutating" operations such as channel
//! manipulation return new instances, and byte inputs are copied at
//! construction.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod command;
pub mod response;
pub mod transport;

// Core error types
mod error;
pub use error::{Error, Result, ResultExt};

// Re-exports for common types
pub use command::{
    ApduCommand, Case, CommandApdu, ExpectedLength, NE_EXTENDED_WILDCARD, NE_SHORT_WILDCARD,
};
pub use response::status::StatusWord;
pub use response::{
    Difference, Differences, ResponseApdu, ResponseData, Trailer, WILDCARD_TRAILER,
};
pub use transport::ApduTransport;

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        ApduCommand, ApduTransport, Bytes, BytesMut, Case, CommandApdu, Difference, Differences,
        Error, ExpectedLength, ResponseApdu, Result, ResultExt, StatusWord, Trailer,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test the basic types are re-exported correctly
    #[test]
    fn test_reexports() {
        let cmd = CommandApdu::new(0x00, 0xA4, 0x04, 0x00).unwrap();
        assert_eq!(cmd.cla(), 0x00);
        assert_eq!(cmd.ins(), 0xA4);
        assert_eq!(cmd.case(), Case::Case1);

        let resp = ResponseApdu::new(Bytes::from_static(&[0x01, 0x02, 0x03]), 0x9000);
        assert!(resp.status_word().unwrap().is_success());
        assert_eq!(resp.nr(), 3);
    }
}
