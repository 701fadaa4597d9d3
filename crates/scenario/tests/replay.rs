//! End-to-end replay tests against a scripted transport

use cardware_apdu_core::transport::TransportError;
use cardware_apdu_core::{ApduTransport, Bytes, CommandApdu};
use cardware_apdu_scenario::{LogLevel, Scenario, ScenarioItem};

/// Transport backed by a script of canned responses.
#[derive(Debug, Default)]
struct CannedTransport {
    responses: Vec<Bytes>,
    commands: Vec<Bytes>,
}

impl CannedTransport {
    fn new(responses: &[&'static [u8]]) -> Self {
        Self {
            responses: responses.iter().copied().map(Bytes::from_static).collect(),
            commands: Vec::new(),
        }
    }
}

impl ApduTransport for CannedTransport {
    type Error = TransportError;

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Self::Error> {
        self.commands.push(Bytes::copy_from_slice(command));
        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.responses.remove(0))
    }
}

fn sample_scenario() -> Scenario {
    Scenario::new(vec![
        ScenarioItem::log(LogLevel::Info, "select the application"),
        ScenarioItem::expect([0x9000]),
        ScenarioItem::Command(CommandApdu::from_hex("00a4040c").unwrap()),
        ScenarioItem::expect([0x9000, 0x6282]),
        ScenarioItem::Command(CommandApdu::new_with_ne(0x00, 0xB0, 0x81, 0x02, 3).unwrap()),
    ])
}

#[test]
fn replay_runs_to_completion_on_expected_status_words() {
    let mut transport = CannedTransport::new(&[&[0x90, 0x00], &[0x01, 0x02, 0x03, 0x62, 0x82]]);
    let out = sample_scenario().run(&mut transport).unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out[1].data().bytes().unwrap(), &[0x01, 0x02, 0x03]);
    assert_eq!(hex::encode(&transport.commands[0]), "00a4040c");
    assert_eq!(hex::encode(&transport.commands[1]), "00b0810203");
}

#[test]
fn replay_stops_at_the_first_unexpected_status_word() {
    let mut transport = CannedTransport::new(&[&[0x6a, 0x82], &[0x90, 0x00]]);
    let out = sample_scenario().run(&mut transport).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].status_word().unwrap().to_u16(), 0x6a82);
    // the READ BINARY command was never sent
    assert_eq!(transport.commands.len(), 1);
}

#[test]
fn replay_after_tlv_round_trip_behaves_identically() {
    let scenario = sample_scenario();
    let der = scenario.to_tlv().unwrap();
    let decoded = Scenario::from_tlv(&der).unwrap();
    assert_eq!(decoded, scenario);

    let mut transport = CannedTransport::new(&[&[0x90, 0x00], &[0x01, 0x02, 0x03, 0x90, 0x00]]);
    let out = decoded.run(&mut transport).unwrap();
    assert_eq!(out.len(), 2);
}
