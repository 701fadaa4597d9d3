//! Record a small scenario, serialize it to DER and replay it against a
//! loopback transport that answers every command with 90 00.

use cardware_apdu_core::transport::TransportError;
use cardware_apdu_core::{ApduTransport, Bytes, CommandApdu};
use cardware_apdu_scenario::{LogLevel, Scenario, ScenarioItem};

#[derive(Debug)]
struct Loopback;

impl ApduTransport for Loopback {
    type Error = TransportError;

    fn do_transmit_raw(&mut self, _command: &[u8]) -> Result<Bytes, Self::Error> {
        Ok(Bytes::from_static(&[0x90, 0x00]))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let scenario = Scenario::new(vec![
        ScenarioItem::log(LogLevel::Info, "selecting the master file"),
        ScenarioItem::expect([0x9000]),
        ScenarioItem::Command(CommandApdu::new(0x00, 0xA4, 0x04, 0x0C)?),
        ScenarioItem::Command(CommandApdu::new_with_ne(0x00, 0xB0, 0x81, 0x02, 3)?),
    ]);

    let der = scenario.to_tlv()?;
    println!("scenario DER: {}", hex::encode(&der));

    let mut transport = Loopback;
    let responses = Scenario::from_tlv(&der)?.run(&mut transport)?;
    for (i, response) in responses.iter().enumerate() {
        println!("response {i}: {response}");
    }
    Ok(())
}
