#![no_main]

use libfuzzer_sys::fuzz_target;
use quic_packet::Packet;

/// Arbitrary datagrams must either be rejected or yield a packet whose
/// accessors stay in bounds.
fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = Packet::load(data) {
        assert!(packet.header_size() <= data.len());
        let _ = packet.packet_type();
        let _ = packet.connection_id();
        let _ = packet.packet_number();
        let _ = packet.version();
        let _ = packet.key_phase();
        let _ = packet.payload();
        let _ = packet.payload_size();
        let _ = packet.has_valid_checksum();
    }
});
