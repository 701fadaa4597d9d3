//! Recorded APDU scenarios and their replay
//!
//! A [`Scenario`] is an ordered, immutable list of three element kinds:
//! expected-status-word sets, command APDUs and log entries. Scenarios
//! serialize to DER (via `iso7816-tlv`) and replay against any
//! [`ApduTransport`], stopping at the first unexpected status word.
//!
//! Replay issues commands strictly in order: the response to one
//! command is received and checked before the next command is sent.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod der;
mod error;
mod item;

pub use error::{Error, Result};
pub use item::{LogEntry, LogLevel, ScenarioItem};

use std::collections::BTreeSet;

use cardware_apdu_core::{ApduTransport, ResponseApdu};
use tracing::{instrument, warn};

/// A recorded sequence of APDU exchanges.
///
/// Immutable after construction. Replay state (the set of currently
/// accepted status words) lives entirely inside [`run`](Self::run).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Scenario {
    items: Vec<ScenarioItem>,
}

impl Scenario {
    /// Serialization format version.
    pub const VERSION: u32 = 0;

    /// Create a scenario from its items.
    pub fn new(items: Vec<ScenarioItem>) -> Self {
        Self { items }
    }

    /// The recorded items, in replay order.
    pub fn items(&self) -> &[ScenarioItem] {
        &self.items
    }

    /// Play the scenario against a transport.
    ///
    /// Commands are sent in order and their responses collected. A
    /// response whose status word is not in the currently expected set
    /// logs a warning and stops the replay; items after the stopping
    /// point are not processed. The expected set starts out empty, so a
    /// command before the first [`ScenarioItem::ExpectedStatus`] always
    /// stops the replay.
    ///
    /// Transport and parse errors propagate; an unexpected status word
    /// is not an error.
    #[instrument(level = "trace", skip_all)]
    pub fn run<T: ApduTransport>(&self, transport: &mut T) -> Result<Vec<ResponseApdu>> {
        let no_expectations = BTreeSet::new();
        let mut expected = &no_expectations;
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                ScenarioItem::ExpectedStatus(status_words) => expected = status_words,
                ScenarioItem::Command(command) => {
                    let response = transport.transmit(command).map_err(Error::Core)?;
                    let accepted = response
                        .status_word()
                        .is_some_and(|sw| expected.contains(&sw.to_u16()));
                    let trailer = response.trailer();
                    out.push(response);
                    if !accepted {
                        warn!(
                            "unexpected status word: got '{:04x}', expected {}",
                            trailer.value() & 0xFFFF,
                            format_status_words(expected),
                        );
                        break;
                    }
                }
                ScenarioItem::Log(entry) => entry.emit(),
            }
        }
        Ok(out)
    }

    /// Serialize to DER.
    pub fn to_tlv(&self) -> Result<Vec<u8>> {
        der::encode(self)
    }

    /// Deserialize from DER.
    ///
    /// Items of unknown tag are ignored.
    pub fn from_tlv(input: &[u8]) -> Result<Self> {
        der::decode(input)
    }
}

impl FromIterator<ScenarioItem> for Scenario {
    fn from_iter<I: IntoIterator<Item = ScenarioItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Render a status word set as `['9000', '6100']`.
fn format_status_words(status_words: &BTreeSet<u16>) -> String {
    let rendered: Vec<String> = status_words
        .iter()
        .map(|sw| format!("'{sw:04x}'"))
        .collect();
    format!("[{}]", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use cardware_apdu_core::transport::TransportError;
    use cardware_apdu_core::{Bytes, CommandApdu};

    use super::*;

    /// Transport that replays a scripted list of responses.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        responses: Vec<Bytes>,
        commands: Vec<Bytes>,
    }

    impl ScriptedTransport {
        fn new(responses: &[&'static [u8]]) -> Self {
            Self {
                responses: responses.iter().copied().map(Bytes::from_static).collect(),
                commands: Vec::new(),
            }
        }
    }

    impl ApduTransport for ScriptedTransport {
        type Error = TransportError;

        fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
            self.commands.push(Bytes::copy_from_slice(command));
            if self.responses.is_empty() {
                return Err(TransportError::Transmission);
            }
            Ok(self.responses.remove(0))
        }
    }

    fn select(p2: u8) -> CommandApdu {
        CommandApdu::new(0x00, 0xA4, 0x04, p2).unwrap()
    }

    #[test]
    fn test_run_collects_responses_in_order() {
        let scenario = Scenario::new(vec![
            ScenarioItem::expect([0x9000]),
            ScenarioItem::Command(select(0x00)),
            ScenarioItem::log(LogLevel::Info, "selected"),
            ScenarioItem::Command(select(0x0C)),
        ]);
        let mut transport = ScriptedTransport::new(&[&[0xAA, 0x90, 0x00], &[0x90, 0x00]]);
        let out = scenario.run(&mut transport).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].data().bytes().unwrap(), &[0xAA]);
        assert_eq!(transport.commands.len(), 2);
        assert_eq!(transport.commands[0], select(0x00).to_bytes());
        assert_eq!(transport.commands[1], select(0x0C).to_bytes());
    }

    #[test]
    fn test_run_stops_on_unexpected_status_word() {
        let scenario = Scenario::new(vec![
            ScenarioItem::expect([0x9000]),
            ScenarioItem::Command(select(0x00)),
            ScenarioItem::Command(select(0x0C)),
        ]);
        let mut transport = ScriptedTransport::new(&[&[0x6A, 0x82], &[0x90, 0x00]]);
        let out = scenario.run(&mut transport).unwrap();
        // the mismatching response is still collected, the second
        // command is never sent
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status_word().unwrap().to_u16(), 0x6A82);
        assert_eq!(transport.commands.len(), 1);
    }

    #[test]
    fn test_run_with_no_expectations_stops_at_first_command() {
        let scenario = Scenario::new(vec![ScenarioItem::Command(select(0x00))]);
        let mut transport = ScriptedTransport::new(&[&[0x90, 0x00]]);
        let out = scenario.run(&mut transport).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_run_updates_expectations_between_commands() {
        let scenario = Scenario::new(vec![
            ScenarioItem::expect([0x9000]),
            ScenarioItem::Command(select(0x00)),
            ScenarioItem::expect([0x6A82, 0x6A8A]),
            ScenarioItem::Command(select(0x0C)),
        ]);
        let mut transport = ScriptedTransport::new(&[&[0x90, 0x00], &[0x6A, 0x82]]);
        let out = scenario.run(&mut transport).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(transport.commands.len(), 2);
    }

    #[test]
    fn test_run_propagates_transport_errors() {
        let scenario = Scenario::new(vec![
            ScenarioItem::expect([0x9000]),
            ScenarioItem::Command(select(0x00)),
        ]);
        let mut transport = ScriptedTransport::new(&[]);
        assert!(matches!(
            scenario.run(&mut transport).unwrap_err(),
            Error::Core(_)
        ));
    }

    #[test]
    fn test_format_status_words() {
        let set: BTreeSet<u16> = [0x9000].into_iter().collect();
        assert_eq!(format_status_words(&set), "['9000']");
        let set: BTreeSet<u16> = [0x9000, 0x6100].into_iter().collect();
        assert_eq!(format_status_words(&set), "['6100', '9000']");
        assert_eq!(format_status_words(&BTreeSet::new()), "[]");
    }

    #[test]
    fn test_tlv_round_trip() {
        let scenario = Scenario::new(vec![
            ScenarioItem::expect([0x9000, 0x6283]),
            ScenarioItem::Command(select(0x0C)),
            ScenarioItem::Command(
                CommandApdu::new_with_data_and_ne(0x00, 0xD6, 0x00, 0x00, vec![0u8; 300], 256)
                    .unwrap(),
            ),
            ScenarioItem::log(LogLevel::Warn, "card returned an odd trailer"),
            ScenarioItem::log(LogLevel::Trace, ""),
        ]);
        let der = scenario.to_tlv().unwrap();
        assert_eq!(Scenario::from_tlv(&der).unwrap(), scenario);
    }
}
