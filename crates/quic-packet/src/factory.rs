//! # Packet Factory
//!
//! Builds the outbound packet kinds of one connection direction:
//!
//! | Kind | Header | Type | Packet number |
//! |---|---|---|---|
//! | version negotiation | long | `VersionNegotiation` | echoed |
//! | server cleartext | long | `ServerCleartext` | generator |
//! | client initial | long | `ClientInitial` | generator |
//! | server protected | short | `OneRttProtectedPhase0` | generator |
//!
//! Packet numbers are drawn one per call, in call order, from a single
//! generator. The factory is not synchronized; keep one per connection and
//! drive it from the connection's owning task.

use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::codec::write_version;
use crate::crypto::{CipherError, PacketCipher};
use crate::error::{PacketError, Result};
use crate::header::LONG_HEADER_LEN;
use crate::number::PacketNumberGenerator;
use crate::packet::Packet;
use crate::stats::FactoryStats;
use crate::types::{
    ConnectionId, PacketNumber, PacketType, Version, SUPPORTED_VERSIONS, VERSION_UNSET,
};

// ─── Configuration ──────────────────────────────────────────────────────────

/// Factory configuration parameters.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// First packet number handed out.
    pub initial_packet_number: PacketNumber,
    /// Output capacity offered to the cipher per protected packet (bytes).
    pub max_cipher_text_len: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        FactoryConfig {
            initial_packet_number: 0,
            max_cipher_text_len: 2048,
        }
    }
}

// ─── Factory ────────────────────────────────────────────────────────────────

pub struct PacketFactory {
    config: FactoryConfig,
    version: Version,
    cipher: Option<Arc<dyn PacketCipher>>,
    packet_number_generator: PacketNumberGenerator,
    stats: FactoryStats,
}

impl PacketFactory {
    pub fn new(config: FactoryConfig) -> Self {
        let packet_number_generator = PacketNumberGenerator::new(config.initial_packet_number);
        PacketFactory {
            config,
            version: VERSION_UNSET,
            cipher: None,
            packet_number_generator,
            stats: FactoryStats::default(),
        }
    }

    /// Wrap a received datagram. See [`Packet::load`].
    pub fn create_from_buffer<'a>(&self, buf: &'a [u8]) -> Result<Packet<'a>> {
        Packet::load(buf)
    }

    /// Answer a client packet with the list of supported versions.
    ///
    /// Echoes the client's connection id, packet number and version. Does not
    /// consume a packet number and is never retransmittable.
    pub fn create_version_negotiation(&mut self, in_reply_to: &Packet<'_>) -> Result<Packet<'static>> {
        let connection_id = in_reply_to
            .connection_id()
            .ok_or(PacketError::MissingConnectionId)?;

        let mut versions = BytesMut::with_capacity(SUPPORTED_VERSIONS.len() * 4);
        for version in SUPPORTED_VERSIONS {
            write_version(version, &mut versions);
        }

        let packet = Packet::build_long(
            PacketType::VersionNegotiation,
            connection_id,
            in_reply_to.packet_number(),
            in_reply_to.version(),
            versions.freeze(),
            false,
        );
        self.stats.version_negotiations += 1;
        self.record(&packet);
        Ok(packet)
    }

    /// Handshake packet from the server, sealed with a checksum, carrying the
    /// negotiated version.
    pub fn create_server_cleartext(
        &mut self,
        connection_id: ConnectionId,
        payload: Bytes,
        retransmittable: bool,
    ) -> Packet<'static> {
        let packet = Packet::build_long(
            PacketType::ServerCleartext,
            connection_id,
            self.packet_number_generator.next(),
            self.version,
            payload,
            retransmittable,
        );
        self.record(&packet);
        packet
    }

    /// First client packet. Nothing is negotiated yet, so the version is
    /// explicit. Always retransmittable.
    pub fn create_client_initial(
        &mut self,
        connection_id: ConnectionId,
        version: Version,
        payload: Bytes,
    ) -> Packet<'static> {
        let packet = Packet::build_long(
            PacketType::ClientInitial,
            connection_id,
            self.packet_number_generator.next(),
            version,
            payload,
            true,
        );
        self.record(&packet);
        packet
    }

    /// 1-RTT packet sealed by the bound cipher.
    ///
    /// The serialized header is the associated data. On cipher failure no
    /// packet is produced; the packet number drawn for it stays consumed.
    pub fn create_server_protected(
        &mut self,
        connection_id: ConnectionId,
        payload: Bytes,
        retransmittable: bool,
    ) -> Result<Packet<'static>> {
        let cipher = Arc::clone(self.cipher.as_ref().ok_or(PacketError::CipherUnset)?);

        // TODO: take the key phase from the handshake's current 1-RTT key
        // once key updates are wired through the cipher.
        let packet_number = self.packet_number_generator.next();
        let mut packet = Packet::build_short(
            PacketType::OneRttProtectedPhase0,
            Some(connection_id),
            packet_number,
            payload,
            retransmittable,
        )?;

        let mut associated_data = [0u8; LONG_HEADER_LEN];
        let ad_len = packet.store_header(&mut associated_data)?;

        let capacity = self.config.max_cipher_text_len;
        let mut cipher_text = BytesMut::zeroed(capacity);
        let sealed = cipher
            .encrypt(
                &mut cipher_text,
                packet.payload(),
                packet_number,
                &associated_data[..ad_len],
                packet.key_phase(),
            )
            .and_then(|len| if len <= capacity { Ok(len) } else { Err(CipherError) });

        let len = match sealed {
            Ok(len) => len,
            Err(e) => {
                self.stats.encryption_failures += 1;
                tracing::warn!(packet_number, "packet encryption failed");
                return Err(e.into());
            }
        };
        cipher_text.truncate(len);
        packet.set_protected_payload(cipher_text.freeze())?;

        tracing::debug!(
            packet_number,
            header_len = ad_len,
            payload_len = len,
            "encrypted packet"
        );
        self.stats.protected_packets += 1;
        self.stats.bytes_protected += len as u64;
        self.record(&packet);
        Ok(packet)
    }

    /// Record the negotiated version. Negotiation completes once per
    /// connection, so a second call is rejected.
    pub fn set_version(&mut self, version: Version) -> Result<()> {
        if version == VERSION_UNSET {
            return Err(PacketError::UnsetVersion);
        }
        if self.version != VERSION_UNSET {
            return Err(PacketError::VersionAlreadySet(self.version));
        }
        self.version = version;
        Ok(())
    }

    /// Bind the cipher used by [`create_server_protected`](Self::create_server_protected).
    pub fn set_crypto_module(&mut self, cipher: Arc<dyn PacketCipher>) {
        self.cipher = Some(cipher);
    }

    /// Negotiated version, `VERSION_UNSET` until [`set_version`](Self::set_version).
    pub fn version(&self) -> Version {
        self.version
    }

    /// Packet number the next generator-backed packet will carry.
    pub fn next_packet_number(&self) -> PacketNumber {
        self.packet_number_generator.current()
    }

    pub fn stats(&self) -> &FactoryStats {
        &self.stats
    }

    fn record(&mut self, packet: &Packet<'_>) {
        self.stats.packets_created += 1;
        tracing::trace!(
            packet_type = ?packet.packet_type(),
            packet_number = packet.packet_number(),
            size = packet.size(),
            "created packet"
        );
    }
}

impl Default for PacketFactory {
    fn default() -> Self {
        Self::new(FactoryConfig::default())
    }
}

impl fmt::Debug for PacketFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketFactory")
            .field("config", &self.config)
            .field("version", &self.version)
            .field("has_cipher", &self.cipher.is_some())
            .field("next_packet_number", &self.packet_number_generator.current())
            .field("stats", &self.stats)
            .finish()
    }
}
