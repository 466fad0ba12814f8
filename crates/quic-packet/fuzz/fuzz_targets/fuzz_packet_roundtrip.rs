#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use quic_packet::{ConnectionId, Packet, PacketType};

/// Build an unprotected long-header packet from fuzz input, encode it, and
/// check the decoded fields and checksum.
///
/// Layout: [type:1][cid:8][pn:4][version:4][payload...]
fuzz_target!(|data: &[u8]| {
    if data.len() < 17 {
        return;
    }
    let packet_type = match PacketType::from_wire(data[0] % 10) {
        PacketType::Uninitialized => return,
        t if t.is_protected() || !t.has_long_header() => return,
        t => t,
    };
    let cid = ConnectionId::new(u64::from_be_bytes(data[1..9].try_into().unwrap()));
    let pn = u32::from_be_bytes(data[9..13].try_into().unwrap()) as u64;
    let version = u32::from_be_bytes(data[13..17].try_into().unwrap());
    let payload = Bytes::copy_from_slice(&data[17..]);

    let packet = Packet::build_long(packet_type, cid, pn, version, payload.clone(), true);
    let wire = packet.encode().unwrap();
    assert_eq!(wire.len(), packet.size());

    let parsed = Packet::load(&wire).unwrap();
    assert!(parsed.has_valid_checksum());
    assert_eq!(parsed.packet_type(), packet_type);
    assert_eq!(parsed.connection_id(), Some(cid));
    assert_eq!(parsed.packet_number(), pn);
    assert_eq!(parsed.version(), version);
    assert_eq!(parsed.payload(), &payload[..]);
});
