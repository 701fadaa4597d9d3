//! Transport abstraction for APDU exchanges
//!
//! A transport moves raw command bytes to a card and raw response bytes
//! back; it has no knowledge of command structure, secure channels or
//! protocol details. The provided conveniences encode, decode and
//! compare APDUs around the raw exchange.

pub mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::command::CommandApdu;
use crate::response::ResponseApdu;
use crate::{Error, Result};

/// Trait for APDU transports.
pub trait ApduTransport: Send + Sync + fmt::Debug {
    /// Error type returned by the transport.
    type Error: Into<Error> + fmt::Debug;

    /// Send raw command bytes to the card and return raw response bytes.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        trace!(command = ?hex::encode(command), "transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = ?hex::encode(response), "received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of `transmit_raw`
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error>;

    /// Send a command APDU and parse the response.
    fn transmit(&mut self, command: &CommandApdu) -> Result<ResponseApdu> {
        let response = self
            .transmit_raw(&command.to_bytes())
            .map_err(Into::into)?;
        ResponseApdu::from_bytes(&response)
    }

    /// Send a command APDU and require one of the `expected` trailers.
    fn transmit_expecting(
        &mut self,
        command: &CommandApdu,
        expected: &[u16],
    ) -> Result<ResponseApdu> {
        let response = self.transmit(command)?;
        let sw = (response.trailer().value() & 0xFFFF) as u16;
        if response.status_word().is_some() && expected.contains(&sw) {
            return Ok(response);
        }
        Err(Error::UnexpectedTrailer {
            sw,
            explanation: crate::StatusWord::from_u16(sw).explain().into_owned(),
            response,
        })
    }

    /// Send a command APDU and require a response structurally matching
    /// `expected`.
    fn transmit_matching(
        &mut self,
        command: &CommandApdu,
        expected: &ResponseApdu,
    ) -> Result<ResponseApdu> {
        let response = self.transmit(command)?;
        let differences = response.difference(expected);
        if differences.is_empty() {
            return Ok(response);
        }
        Err(Error::ResponseMismatch {
            differences,
            received: response,
            expected: expected.clone(),
        })
    }

    /// Send a command APDU and require a response matching `expected`
    /// under the bits set in `mask`.
    fn transmit_matching_masked(
        &mut self,
        command: &CommandApdu,
        expected: &ResponseApdu,
        mask: &ResponseApdu,
    ) -> Result<ResponseApdu> {
        let response = self.transmit(command)?;
        let differences = response.difference_masked(expected, mask);
        if differences.is_empty() {
            return Ok(response);
        }
        Err(Error::ResponseMismatch {
            differences,
            received: response,
            expected: expected.clone(),
        })
    }
}

#[cfg(test)]
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct MockTransport {
    /// Mock responses to return
    pub responses: Vec<Bytes>,
    /// Commands that were sent
    pub commands: Vec<Bytes>,
}

#[cfg(test)]
impl MockTransport {
    /// Create a new mock transport with the given responses
    pub fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
        }
    }

    /// Create a new mock transport that always returns the given response
    pub fn with_response(response: Bytes) -> Self {
        Self::new(vec![response])
    }

    /// Create a new mock transport that always returns success (90 00)
    pub fn with_success() -> Self {
        Self::with_response(Bytes::from_static(&[0x90, 0x00]))
    }
}

#[cfg(test)]
impl ApduTransport for MockTransport {
    type Error = TransportError;

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        self.commands.push(Bytes::copy_from_slice(command));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }

        // Either clone the single response or take the next one
        if self.responses.len() == 1 {
            Ok(self.responses[0].clone())
        } else {
            Ok(self.responses.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{Difference, ResponseData};

    fn select() -> CommandApdu {
        CommandApdu::new(0x00, 0xA4, 0x04, 0x0C).unwrap()
    }

    #[test]
    fn test_transmit_parses_the_response() {
        let mut transport =
            MockTransport::with_response(Bytes::from_static(&[0x01, 0x02, 0x90, 0x00]));
        let response = transport.transmit(&select()).unwrap();
        assert_eq!(response.data().bytes().unwrap(), &[0x01, 0x02]);
        assert_eq!(response.status_word().unwrap().to_u16(), 0x9000);
        assert_eq!(transport.commands[0], select().to_bytes());
    }

    #[test]
    fn test_transmit_expecting_accepts_listed_trailers() {
        let mut transport = MockTransport::with_success();
        let response = transport.transmit_expecting(&select(), &[0x9000]).unwrap();
        assert!(response.status_word().unwrap().is_success());

        let mut transport = MockTransport::with_response(Bytes::from_static(&[0x61, 0x10]));
        let response = transport
            .transmit_expecting(&select(), &[0x9000, 0x6110])
            .unwrap();
        assert_eq!(response.status_word().unwrap().to_u16(), 0x6110);
    }

    #[test]
    fn test_transmit_expecting_reports_trailer_and_response() {
        let mut transport =
            MockTransport::with_response(Bytes::from_static(&[0xAB, 0x6A, 0x82]));
        let err = transport
            .transmit_expecting(&select(), &[0x9000])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected trailer: got '6a82' (FileNotFound) in response \
             SW1SW2='6a82'  Nr='0001'  Data='ab'"
        );
    }

    #[test]
    fn test_transmit_matching() {
        let mut transport =
            MockTransport::with_response(Bytes::from_static(&[0x01, 0x02, 0x90, 0x00]));
        let expected = ResponseApdu::with_wildcard_data(0x9000);
        assert!(transport.transmit_matching(&select(), &expected).is_ok());

        let expected = ResponseApdu::new(vec![0x01, 0x03], 0x9000);
        let err = transport
            .transmit_matching(&select(), &expected)
            .unwrap_err();
        match err {
            Error::ResponseMismatch { differences, .. } => {
                assert!(differences.contains(Difference::Content));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transmit_matching_masked() {
        let mut transport =
            MockTransport::with_response(Bytes::from_static(&[0x54, 0xDE, 0xF7, 0x61, 0x00]));
        let expected = ResponseApdu::new(vec![0x54, 0xDE, 0xF6], 0x6100);
        let mask = ResponseApdu::from_parts(
            ResponseData::Bytes(Bytes::from_static(&[0xFF, 0xFF, 0xFE])),
            crate::Trailer::Sw(crate::StatusWord::from_u16(0xFFFF)),
        );
        assert!(
            transport
                .transmit_matching_masked(&select(), &expected, &mask)
                .is_ok()
        );
    }

    #[test]
    fn test_transport_errors_propagate() {
        let mut transport = MockTransport::new(Vec::new());
        let err = transport.transmit(&select()).unwrap_err();
        assert_eq!(err, Error::Transport(TransportError::Transmission));
    }
}
