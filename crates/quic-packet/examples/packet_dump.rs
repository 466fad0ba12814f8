//! Build one packet of each outbound kind, serialize it, read it back and
//! log what a receiver sees. Hex datagrams given on the command line are
//! decoded instead.
//!
//! ```text
//! cargo run --example packet_dump
//! RUST_LOG=trace cargo run --example packet_dump -- 8201020304050607080000000aff000005
//! ```

use std::sync::Arc;

use bytes::Bytes;
use quic_packet::{
    CipherError, ConnectionId, KeyPhase, Packet, PacketCipher, PacketFactory, PacketNumber,
    SUPPORTED_VERSIONS,
};
use tracing_subscriber::EnvFilter;

/// Stand-in cipher: XOR with the low byte of the packet number.
struct XorCipher;

impl PacketCipher for XorCipher {
    fn encrypt(
        &self,
        out: &mut [u8],
        plaintext: &[u8],
        packet_number: PacketNumber,
        _associated_data: &[u8],
        _key_phase: KeyPhase,
    ) -> Result<usize, CipherError> {
        let dst = out.get_mut(..plaintext.len()).ok_or(CipherError)?;
        for (d, p) in dst.iter_mut().zip(plaintext) {
            *d = p ^ packet_number as u8;
        }
        Ok(plaintext.len())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn unhex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

fn dump(label: &str, wire: &[u8]) {
    let packet = match Packet::load(wire) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!(label, error = %e, wire = %hex(wire), "undecodable datagram");
            return;
        }
    };
    let checksum = if packet.packet_type().is_protected() {
        "n/a (protected)".to_string()
    } else {
        packet.has_valid_checksum().to_string()
    };
    tracing::info!(
        label,
        packet_type = ?packet.packet_type(),
        connection_id = ?packet.connection_id(),
        packet_number = packet.packet_number(),
        version = format_args!("{:#010x}", packet.version()),
        key_phase = ?packet.key_phase(),
        header_size = packet.header_size(),
        payload_size = packet.payload_size(),
        checksum = %checksum,
        "decoded"
    );
    tracing::debug!(label, wire = %hex(wire), "raw");
}

fn main() -> quic_packet::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        for arg in &args {
            match unhex(arg) {
                Some(wire) => dump("argument", &wire),
                None => tracing::warn!(input = %arg, "not a hex string"),
            }
        }
        return Ok(());
    }

    let cid = ConnectionId::random();
    let mut client = PacketFactory::default();
    let mut server = PacketFactory::default();
    server.set_version(SUPPORTED_VERSIONS[0])?;
    server.set_crypto_module(Arc::new(XorCipher));

    let initial = client
        .create_client_initial(cid, 0x0000_0001, Bytes::from_static(b"client hello"))
        .encode()?;
    dump("client_initial", &initial);

    let request = server.create_from_buffer(&initial)?;
    let negotiation = server.create_version_negotiation(&request)?.encode()?;
    dump("version_negotiation", &negotiation);

    let cleartext = server
        .create_server_cleartext(cid, Bytes::from_static(b"server hello"), true)
        .encode()?;
    dump("server_cleartext", &cleartext);

    let protected = server
        .create_server_protected(cid, Bytes::from_static(b"application data"), true)?
        .encode()?;
    dump("server_protected", &protected);

    let stats = serde_json::to_string(server.stats()).unwrap_or_default();
    tracing::info!(stats = %stats, "server factory");
    Ok(())
}
