#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_mib_agent::message::Message;
use snmp_mib_agent::pdu::{Pdu, TrapV1Pdu};

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    // Fuzz the v1/v2c message decoder; anything it accepts must re-encode
    if let Ok(message) = Message::decode(bytes.clone()) {
        let _ = message.encode();
    }

    // Fuzz PDU decoders directly
    let mut decoder = snmp_mib_agent::ber::Decoder::new(bytes.clone());
    let _ = Pdu::decode(&mut decoder);

    let mut decoder = snmp_mib_agent::ber::Decoder::new(bytes);
    let _ = TrapV1Pdu::decode(&mut decoder);
});
