//! # Packets
//!
//! A [`Packet`] couples a header with its payload and owns the integrity
//! step at serialization time:
//!
//! ```text
//! unprotected:  [ header ][ payload ][ FNV-1a-64 over header+payload (8) ]
//! protected:    [ header ][ AEAD ciphertext                              ]
//! ```
//!
//! Parsed packets borrow the received buffer and cannot outlive it. Built
//! packets own their bytes (`Packet<'static>`).

use bytes::{Bytes, BytesMut};

use crate::codec::{fnv1a, FNV1A_HASH_LEN};
use crate::error::{PacketError, Result};
use crate::header::{LongHeader, PacketHeader, ShortHeader};
use crate::types::{ConnectionId, KeyPhase, PacketNumber, PacketType, Version};

#[derive(Debug, Clone)]
pub struct Packet<'a> {
    header: PacketHeader<'a>,
    /// Exact number of bytes `store` writes (or the received length).
    size: usize,
    protected_payload: Option<Bytes>,
    is_retransmittable: bool,
}

impl<'a> Packet<'a> {
    /// Wrap a received datagram. The checksum is not verified here; call
    /// [`has_valid_checksum`](Self::has_valid_checksum) before trusting an
    /// unprotected payload.
    pub fn load(buf: &'a [u8]) -> Result<Self> {
        let header = PacketHeader::load(buf)?;
        Ok(Packet {
            header,
            size: buf.len(),
            protected_payload: None,
            is_retransmittable: false,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn header(&self) -> &PacketHeader<'a> {
        &self.header
    }

    /// Short-header packets report `OneRttProtectedPhase0` or
    /// `OneRttProtectedPhase1` according to their key phase bit.
    pub fn packet_type(&self) -> PacketType {
        self.header.packet_type()
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.header.connection_id()
    }

    pub fn packet_number(&self) -> PacketNumber {
        self.header.packet_number()
    }

    pub fn version(&self) -> Version {
        self.header.version()
    }

    pub fn key_phase(&self) -> KeyPhase {
        self.header.key_phase()
    }

    pub fn is_retransmittable(&self) -> bool {
        self.is_retransmittable
    }

    /// Total on-wire size.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn header_size(&self) -> usize {
        self.header.length()
    }

    /// Payload length on the wire: everything after the header, less the
    /// checksum trailer for unprotected types. For protected packets this is
    /// the ciphertext length once it has been set.
    pub fn payload_size(&self) -> usize {
        let header_len = self.header.length();
        if self.packet_type().is_protected() {
            self.size.saturating_sub(header_len)
        } else {
            self.size.saturating_sub(header_len + FNV1A_HASH_LEN)
        }
    }

    /// Unprotected payload bytes: the plaintext of a built packet, or the
    /// bytes between header and trailer of a parsed one.
    pub fn payload(&self) -> &[u8] {
        let payload = self.header.payload();
        if self.packet_type().is_protected() {
            payload
        } else {
            &payload[..self.payload_size().min(payload.len())]
        }
    }

    pub fn protected_payload(&self) -> Option<&[u8]> {
        self.protected_payload.as_deref()
    }

    // ─── Protection ──────────────────────────────────────────────────────

    /// Record the cipher output. Allowed once, only on built packets of a
    /// protected type.
    pub fn set_protected_payload(&mut self, cipher_text: Bytes) -> Result<()> {
        if self.header.is_parsed() {
            return Err(PacketError::NotBuilt);
        }
        let packet_type = self.packet_type();
        if !packet_type.is_protected() {
            return Err(PacketError::NotProtected(packet_type));
        }
        if self.protected_payload.is_some() {
            return Err(PacketError::ProtectedPayloadAlreadySet);
        }
        self.size = self.header.length() + cipher_text.len();
        self.protected_payload = Some(cipher_text);
        Ok(())
    }

    /// Verify the FNV-1a trailer of a received unprotected packet.
    ///
    /// Returns `false` for built packets and for buffers too short to hold a
    /// trailer.
    pub fn has_valid_checksum(&self) -> bool {
        let Some(wire) = self.header.wire_bytes() else {
            return false;
        };
        if wire.len() < self.header.length() + FNV1A_HASH_LEN {
            return false;
        }
        let (body, trailer) = wire.split_at(wire.len() - FNV1A_HASH_LEN);
        fnv1a(body).as_slice() == trailer
    }

    // ─── Serialization ───────────────────────────────────────────────────

    /// Serialize header and payload into `buf`, returning the bytes written
    /// (always [`size`](Self::size)).
    ///
    /// Unprotected packets get an FNV-1a trailer over everything written
    /// before it. Protected packets write the ciphertext instead and require
    /// [`set_protected_payload`](Self::set_protected_payload) first.
    pub fn store(&self, buf: &mut [u8]) -> Result<usize> {
        if self.header.is_parsed() {
            return Err(PacketError::NotBuilt);
        }
        let cipher_text = if self.packet_type().is_protected() {
            Some(
                self.protected_payload
                    .as_ref()
                    .ok_or(PacketError::ProtectedPayloadMissing)?,
            )
        } else {
            None
        };
        if buf.len() < self.size {
            return Err(PacketError::BufferTooSmall {
                needed: self.size,
                available: buf.len(),
            });
        }

        let mut n = self.header.store(buf)?;
        match cipher_text {
            Some(cipher_text) => {
                buf[n..n + cipher_text.len()].copy_from_slice(cipher_text);
                n += cipher_text.len();
            }
            None => {
                let payload = self.payload();
                buf[n..n + payload.len()].copy_from_slice(payload);
                n += payload.len();

                let hash = fnv1a(&buf[..n]);
                buf[n..n + FNV1A_HASH_LEN].copy_from_slice(&hash);
                n += FNV1A_HASH_LEN;
            }
        }
        debug_assert_eq!(n, self.size);
        Ok(n)
    }

    /// Serialize only the header. This is the associated data handed to the
    /// cipher.
    pub fn store_header(&self, buf: &mut [u8]) -> Result<usize> {
        self.header.store(buf)
    }

    /// Serialize into a freshly allocated buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.size);
        let n = self.store(&mut buf)?;
        buf.truncate(n);
        Ok(buf.freeze())
    }
}

impl Packet<'static> {
    /// Build a long-header packet.
    pub fn build_long(
        packet_type: PacketType,
        connection_id: ConnectionId,
        packet_number: PacketNumber,
        version: Version,
        payload: Bytes,
        retransmittable: bool,
    ) -> Self {
        let header = LongHeader::build(packet_type, connection_id, packet_number, version, payload);
        Self::built(header.into(), retransmittable)
    }

    /// Build a short-header (1-RTT) packet, with or without a connection id.
    pub fn build_short(
        packet_type: PacketType,
        connection_id: Option<ConnectionId>,
        packet_number: PacketNumber,
        payload: Bytes,
        retransmittable: bool,
    ) -> Result<Self> {
        let header = ShortHeader::build(packet_type, connection_id, packet_number, payload)?;
        Ok(Self::built(header.into(), retransmittable))
    }

    fn built(header: PacketHeader<'static>, retransmittable: bool) -> Self {
        let mut size = header.length() + header.payload().len();
        if !header.packet_type().is_protected() {
            size += FNV1A_HASH_LEN;
        }
        Packet {
            header,
            size,
            protected_payload: None,
            is_retransmittable: retransmittable,
        }
    }
}
