//! # Integration tests: PacketFactory → wire → Packet::load
//!
//! Packets are built by the factory, serialized, and read back from the raw
//! bytes the way a receiving endpoint would see them.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use quic_packet::codec::FNV1A_HASH_LEN;
use quic_packet::header::LONG_HEADER_LEN;
use quic_packet::*;

// ─── Helpers ────────────────────────────────────────────────────────────────

const CID: ConnectionId = ConnectionId::new(0x0102_0304_0506_0708);
const DRAFT_VERSION: Version = 0xff00_0005;

/// Tag ciphertext: a fixed 16-byte tag prepended to the plaintext. Records
/// every call so tests can check what the factory handed over.
#[derive(Default)]
struct TagCipher {
    calls: Mutex<Vec<(PacketNumber, Vec<u8>, KeyPhase)>>,
}

const TAG: [u8; 16] = [0xA5; 16];

impl PacketCipher for TagCipher {
    fn encrypt(
        &self,
        out: &mut [u8],
        plaintext: &[u8],
        packet_number: PacketNumber,
        associated_data: &[u8],
        key_phase: KeyPhase,
    ) -> std::result::Result<usize, CipherError> {
        let len = TAG.len() + plaintext.len();
        if out.len() < len {
            return Err(CipherError);
        }
        out[..TAG.len()].copy_from_slice(&TAG);
        out[TAG.len()..len].copy_from_slice(plaintext);
        self.calls
            .lock()
            .unwrap()
            .push((packet_number, associated_data.to_vec(), key_phase));
        Ok(len)
    }
}

struct FailingCipher;

impl PacketCipher for FailingCipher {
    fn encrypt(
        &self,
        _out: &mut [u8],
        _plaintext: &[u8],
        _packet_number: PacketNumber,
        _associated_data: &[u8],
        _key_phase: KeyPhase,
    ) -> std::result::Result<usize, CipherError> {
        Err(CipherError)
    }
}

fn server_factory() -> PacketFactory {
    let mut factory = PacketFactory::default();
    factory.set_version(DRAFT_VERSION).unwrap();
    factory
}

// ─── Unprotected Packets ────────────────────────────────────────────────────

#[test]
fn client_initial_roundtrip() {
    let mut factory = PacketFactory::default();
    let packet = factory.create_client_initial(CID, DRAFT_VERSION, Bytes::from_static(b"CHLO"));
    assert!(packet.is_retransmittable());

    let wire = packet.encode().unwrap();
    assert_eq!(wire.len(), LONG_HEADER_LEN + 4 + FNV1A_HASH_LEN);
    assert_eq!(wire[0], 0x80 | PacketType::ClientInitial as u8);

    let received = factory.create_from_buffer(&wire).unwrap();
    assert!(received.has_valid_checksum());
    assert_eq!(received.packet_type(), PacketType::ClientInitial);
    assert_eq!(received.connection_id(), Some(CID));
    assert_eq!(received.packet_number(), 0);
    assert_eq!(received.version(), DRAFT_VERSION);
    assert_eq!(received.payload(), b"CHLO");
    assert_eq!(received.size(), wire.len());
}

#[test]
fn server_cleartext_carries_negotiated_version() {
    let mut factory = server_factory();
    let packet = factory.create_server_cleartext(CID, Bytes::from_static(b"SHLO"), false);
    assert!(!packet.is_retransmittable());

    let wire = packet.encode().unwrap();
    let received = Packet::load(&wire).unwrap();
    assert!(received.has_valid_checksum());
    assert_eq!(received.packet_type(), PacketType::ServerCleartext);
    assert_eq!(received.version(), DRAFT_VERSION);
    assert_eq!(received.payload(), b"SHLO");
}

#[test]
fn server_cleartext_before_negotiation_has_unset_version() {
    let mut factory = PacketFactory::default();
    let wire = factory
        .create_server_cleartext(CID, Bytes::from_static(b"x"), true)
        .encode()
        .unwrap();
    assert_eq!(Packet::load(&wire).unwrap().version(), VERSION_UNSET);
}

#[test]
fn corrupted_datagram_fails_checksum() {
    let mut factory = server_factory();
    let wire = factory
        .create_server_cleartext(CID, Bytes::from_static(b"handshake data"), true)
        .encode()
        .unwrap();

    let mut corrupted = wire.to_vec();
    corrupted[LONG_HEADER_LEN + 3] ^= 0x80;
    assert!(!Packet::load(&corrupted).unwrap().has_valid_checksum());

    let mut bad_trailer = wire.to_vec();
    let last = bad_trailer.len() - 1;
    bad_trailer[last] ^= 0x01;
    assert!(!Packet::load(&bad_trailer).unwrap().has_valid_checksum());
}

// ─── Version Negotiation ────────────────────────────────────────────────────

#[test]
fn version_negotiation_echoes_client_fields() {
    let mut client = PacketFactory::new(FactoryConfig {
        initial_packet_number: 0x1234,
        ..FactoryConfig::default()
    });
    let initial = client
        .create_client_initial(CID, 0x0bad_0bad, Bytes::from_static(b"hello"))
        .encode()
        .unwrap();

    let mut server = server_factory();
    let request = server.create_from_buffer(&initial).unwrap();
    let reply = server.create_version_negotiation(&request).unwrap();
    assert!(!reply.is_retransmittable());
    assert_eq!(server.next_packet_number(), 0);

    let wire = reply.encode().unwrap();
    let received = Packet::load(&wire).unwrap();
    assert!(received.has_valid_checksum());
    assert_eq!(received.packet_type(), PacketType::VersionNegotiation);
    assert_eq!(received.connection_id(), Some(CID));
    assert_eq!(received.packet_number(), 0x1234);
    assert_eq!(received.version(), 0x0bad_0bad);

    let versions = received.payload();
    assert_eq!(versions.len(), 4 * SUPPORTED_VERSIONS.len());
    let advertised: Vec<Version> = versions
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(advertised, SUPPORTED_VERSIONS);
    assert_eq!(server.stats().version_negotiations, 1);
}

// ─── Protected Packets ──────────────────────────────────────────────────────

#[test]
fn server_protected_is_header_then_ciphertext() {
    let cipher = Arc::new(TagCipher::default());
    let mut factory = server_factory();
    factory.set_crypto_module(cipher.clone());

    let packet = factory
        .create_server_protected(CID, Bytes::from_static(b"stream frame"), true)
        .unwrap();
    assert_eq!(packet.packet_type(), PacketType::OneRttProtectedPhase0);
    assert_eq!(packet.key_phase(), KeyPhase::Phase0);
    assert!(packet.is_retransmittable());

    let mut header = [0u8; LONG_HEADER_LEN];
    let header_len = packet.store_header(&mut header).unwrap();
    // flags + connection id + 1-byte packet number
    assert_eq!(header_len, 1 + ConnectionId::LEN + 1);

    let wire = packet.encode().unwrap();
    let mut expected = header[..header_len].to_vec();
    expected.extend_from_slice(&TAG);
    expected.extend_from_slice(b"stream frame");
    assert_eq!(&wire[..], &expected[..]);
    assert_eq!(packet.size(), wire.len());
    assert_eq!(packet.payload_size(), TAG.len() + 12);

    let calls = cipher.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, 0);
    assert_eq!(calls[0].1, &header[..header_len]);
    assert_eq!(calls[0].2, KeyPhase::Phase0);
}

#[test]
fn server_protected_parses_as_short_header() {
    let mut factory = server_factory();
    factory.set_crypto_module(Arc::new(TagCipher::default()));
    let wire = factory
        .create_server_protected(CID, Bytes::from_static(b"ack"), false)
        .unwrap()
        .encode()
        .unwrap();

    let received = Packet::load(&wire).unwrap();
    assert!(!received.header().has_version());
    assert!(received.header().has_key_phase());
    assert_eq!(received.packet_type(), PacketType::OneRttProtectedPhase0);
    assert_eq!(received.connection_id(), Some(CID));
    assert_eq!(received.packet_number(), 0);
    assert_eq!(received.payload_size(), TAG.len() + 3);
    assert_eq!(&received.payload()[TAG.len()..], b"ack");
}

#[test]
fn failed_encryption_yields_no_packet() {
    let mut factory = server_factory();
    factory.set_crypto_module(Arc::new(FailingCipher));

    let err = factory
        .create_server_protected(CID, Bytes::from_static(b"secret"), true)
        .unwrap_err();
    assert_eq!(err, PacketError::Encryption(CipherError));
    assert_eq!(factory.stats().encryption_failures, 1);
    assert_eq!(factory.stats().packets_created, 0);
    // The drawn number is not reused.
    assert_eq!(factory.next_packet_number(), 1);
}

#[test]
fn small_cipher_capacity_is_reported_as_failure() {
    let mut factory = PacketFactory::new(FactoryConfig {
        max_cipher_text_len: 8,
        ..FactoryConfig::default()
    });
    factory.set_crypto_module(Arc::new(TagCipher::default()));
    assert!(factory
        .create_server_protected(CID, Bytes::from_static(b"x"), true)
        .is_err());
}

// ─── Packet Numbers ─────────────────────────────────────────────────────────

#[test]
fn packet_numbers_strictly_increase_across_kinds() {
    let mut factory = server_factory();
    factory.set_crypto_module(Arc::new(TagCipher::default()));

    let mut numbers = Vec::new();
    for i in 0..300u32 {
        let payload = Bytes::from(i.to_be_bytes().to_vec());
        let packet = match i % 3 {
            0 => factory.create_client_initial(CID, DRAFT_VERSION, payload),
            1 => factory.create_server_cleartext(CID, payload, true),
            _ => factory.create_server_protected(CID, payload, true).unwrap(),
        };
        let wire = packet.encode().unwrap();
        numbers.push(Packet::load(&wire).unwrap().packet_number());
    }
    let expected: Vec<PacketNumber> = (0..300).collect();
    assert_eq!(numbers, expected);

    let stats = factory.stats();
    assert_eq!(stats.packets_created, 300);
    assert_eq!(stats.protected_packets, 100);
}

#[test]
fn short_header_width_grows_with_packet_number() {
    let mut factory = PacketFactory::new(FactoryConfig {
        initial_packet_number: 0xFF,
        ..FactoryConfig::default()
    });
    factory.set_crypto_module(Arc::new(TagCipher::default()));

    let one = factory
        .create_server_protected(CID, Bytes::new(), true)
        .unwrap();
    let two = factory
        .create_server_protected(CID, Bytes::new(), true)
        .unwrap();
    assert_eq!(one.header_size(), 1 + ConnectionId::LEN + 1);
    assert_eq!(two.header_size(), 1 + ConnectionId::LEN + 2);
    assert_eq!(
        Packet::load(&two.encode().unwrap()).unwrap().packet_number(),
        0x100
    );
}

// ─── Stats ──────────────────────────────────────────────────────────────────

#[test]
fn stats_export_as_json() {
    let mut factory = server_factory();
    factory.set_crypto_module(Arc::new(TagCipher::default()));
    factory
        .create_server_protected(CID, Bytes::from_static(b"abcd"), true)
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(factory.stats()).unwrap();
    assert_eq!(json["packets_created"], 1);
    assert_eq!(json["protected_packets"], 1);
    assert_eq!(json["bytes_protected"], (TAG.len() + 4) as u64);
}

// ─── Malformed Input ────────────────────────────────────────────────────────

#[test]
fn truncated_datagrams_are_rejected() {
    let factory = PacketFactory::default();
    assert!(matches!(
        factory.create_from_buffer(&[]),
        Err(PacketError::Truncated { .. })
    ));
    assert!(matches!(
        factory.create_from_buffer(&[0x82; LONG_HEADER_LEN - 1]),
        Err(PacketError::Truncated { .. })
    ));
    // Short header claiming a connection id and a 4-byte packet number.
    assert!(matches!(
        factory.create_from_buffer(&[0x43, 0, 0, 0]),
        Err(PacketError::Truncated { .. })
    ));
    assert_eq!(
        factory.create_from_buffer(&[0x00, 0x01]).unwrap_err(),
        PacketError::InvalidPacketNumberLen(0)
    );
}

#[test]
fn random_connection_ids_roundtrip() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let mut factory = server_factory();
    for _ in 0..16 {
        let cid = ConnectionId::random();
        let wire = factory
            .create_server_cleartext(cid, Bytes::from_static(b"p"), true)
            .encode()
            .unwrap();
        assert_eq!(Packet::load(&wire).unwrap().connection_id(), Some(cid));
    }
}
