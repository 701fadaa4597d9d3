//! Error types for scenario recording and replay
//!
//! This module centralizes all error variants of the crate. Transport
//! and codec failures bubble up transparently from the core crate; the
//! remaining variants cover the DER wire format.

use iso7816_tlv::TlvError;
use thiserror::Error;

/// Result type for scenario operations
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Error type for scenario operations
#[derive(Debug, Error)]
pub enum Error {
    /// Core APDU error
    #[error(transparent)]
    Core(#[from] cardware_apdu_core::Error),

    /// TLV encoding/decoding error
    #[error("TLV error: {0}")]
    Tlv(TlvError),

    /// Malformed scenario encoding
    #[error("malformed scenario: {0}")]
    Der(&'static str),

    /// Scenario version outside the supported set
    #[error("unsupported scenario version: {0}")]
    UnsupportedVersion(u32),

    /// Log level integer outside the known set
    #[error("invalid log level: {0}")]
    InvalidLogLevel(u32),
}

impl From<TlvError> for Error {
    fn from(error: TlvError) -> Self {
        Self::Tlv(error)
    }
}
