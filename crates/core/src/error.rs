//! Core error type for all APDU operations
//!
//! All error variants are consolidated here to simplify error handling
//! and error bubbling through the call stack. Every constructor and
//! operation failure propagates to the caller; nothing is caught inside
//! this crate.

use crate::response::{Differences, ResponseApdu};
use crate::transport::error::TransportError;

/// Result type for APDU operations
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    //
    // Class byte
    //
    /// CLA has the value 0xFF, reserved for protocol and parameter selection
    #[error("invalid CLA: 'ff' is reserved")]
    InvalidClass,

    //
    // Byte layout
    //
    /// Malformed APDU byte layout
    #[error("invalid APDU: {0}")]
    InvalidApdu(&'static str),

    /// Subrange escapes the input buffer
    #[error("offset {offset} plus length {length} escapes buffer of {available} bytes")]
    OutOfBounds {
        /// Requested start of the subrange
        offset: usize,
        /// Requested length of the subrange
        length: usize,
        /// Bytes actually available
        available: usize,
    },

    /// Input is not valid hex
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    //
    // Case validation
    //
    /// The case requires a command data field
    #[error("command data field absent, but SHALL be present")]
    DataFieldAbsent,

    /// The case forbids a command data field
    #[error("command data field present, but SHALL be absent")]
    DataFieldPresent,

    /// Nc exceeds the extended-length maximum
    #[error("command data field too long: Nc={0}")]
    DataFieldTooLong(usize),

    /// The case requires an Le-field
    #[error("Le-field absent, but SHALL be present")]
    LeFieldAbsent,

    /// The case forbids an Le-field
    #[error("Le-field present, but SHALL be absent")]
    LeFieldPresent,

    /// Ne outside the canonical set
    #[error("invalid Ne: {0}")]
    InvalidNe(u32),

    /// ISO case outside 1..=4
    #[error("invalid ISO case: {0}")]
    InvalidCase(u8),

    //
    // Channel and encoding
    //
    /// Logical channel number not encodable in CLA
    #[error("channel number {0} out of range [0, 19]")]
    InvalidChannel(u8),

    /// Short-form serialization requested for an extended-only APDU
    #[error("APDU cannot be encoded in short form: Nc={nc}, Ne={ne}")]
    ShortFormUnavailable {
        /// Command data length
        nc: usize,
        /// Expected response length in canonical encoding
        ne: u32,
    },

    //
    // Transport conveniences
    //
    /// Response carried a trailer outside the expected set
    #[error("unexpected trailer: got '{sw:04x}' ({explanation}) in response {response}")]
    UnexpectedTrailer {
        /// Received status word
        sw: u16,
        /// Explanation of the received status word
        explanation: String,
        /// The full received response
        response: ResponseApdu,
    },

    /// Response differs structurally from the expected response
    #[error("response mismatch ({differences}): received {received}, expected {expected}")]
    ResponseMismatch {
        /// The non-empty difference set
        differences: Differences,
        /// The received response
        received: ResponseApdu,
        /// The expected response
        expected: ResponseApdu,
    },

    /// Error from the underlying transport
    #[error(transparent)]
    Transport(#[from] TransportError),

    //
    // General errors
    //
    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },
}

impl Error {
    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for Result with APDU Errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}
