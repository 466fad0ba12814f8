//! # Packet Headers
//!
//! Two header formats share one capability set:
//!
//! ## Long Header (fixed 17 bytes)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |1|   Type (7)  |                                               |
//! +-+-+-+-+-+-+-+-+                                               +
//! |                       Connection ID (64)                      |
//! +               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |               |          Packet Number (32)                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |               |             Version (32)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! ## Short Header (2-13 bytes)
//!
//! ```text
//! +-+-+-+-+-+-+-+-+
//! |0|C|K| 0 0 |W W|
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                  [Connection ID (64)]                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |               Packet Number (8/16/32)                       ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! `C` = connection id present, `K` = key phase, `WW` = packet number width.
//!
//! Each format is either a *parsed* view over received bytes (fields are
//! read on demand at fixed offsets, nothing is copied) or a *built* value
//! holding explicit fields for sending. Only built headers serialize.

use bytes::{BufMut, Bytes};

use crate::codec::{
    read_connection_id, read_packet_number, read_version, write_connection_id,
    write_packet_number, write_version,
};
use crate::error::{PacketError, Result};
use crate::types::{
    ConnectionId, KeyPhase, PacketNumber, PacketNumberLen, PacketType, Version, VERSION_UNSET,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Header form bit: set for long headers.
pub const HEADER_FORM_BIT: u8 = 0x80;

/// Long header type field mask.
pub const LONG_TYPE_MASK: u8 = 0x7F;

/// Short header: connection id present.
pub const CONNECTION_ID_BIT: u8 = 0x40;

/// Short header: key phase 1.
pub const KEY_PHASE_BIT: u8 = 0x20;

/// Short header: packet number width selector.
pub const PACKET_NUMBER_LEN_MASK: u8 = 0x03;

/// Total long header size.
pub const LONG_HEADER_LEN: usize = 17;

const LONG_PACKET_NUMBER_LEN: usize = 4;

const OFFSET_CONNECTION_ID: usize = 1;
const OFFSET_PACKET_NUMBER: usize = OFFSET_CONNECTION_ID + ConnectionId::LEN;
const OFFSET_VERSION: usize = OFFSET_PACKET_NUMBER + LONG_PACKET_NUMBER_LEN;

// ─── PacketHeader ────────────────────────────────────────────────────────────

/// A long or short packet header.
#[derive(Debug, Clone)]
pub enum PacketHeader<'a> {
    Long(LongHeader<'a>),
    Short(ShortHeader<'a>),
}

impl<'a> PacketHeader<'a> {
    /// Parse a header view over `buf`, choosing the format from the first
    /// byte's high bit.
    ///
    /// Lengths are validated here so every accessor on the result is
    /// in-bounds. An unknown long-header type is not an error; it reads back
    /// as [`PacketType::Uninitialized`].
    pub fn load(buf: &'a [u8]) -> Result<Self> {
        let first = *buf
            .first()
            .ok_or(PacketError::Truncated { needed: 1, actual: 0 })?;
        if first & HEADER_FORM_BIT != 0 {
            LongHeader::load(buf).map(PacketHeader::Long)
        } else {
            ShortHeader::load(buf).map(PacketHeader::Short)
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            PacketHeader::Long(h) => h.packet_type(),
            PacketHeader::Short(h) => h.packet_type(),
        }
    }

    pub fn has_connection_id(&self) -> bool {
        match self {
            PacketHeader::Long(_) => true,
            PacketHeader::Short(h) => h.has_connection_id(),
        }
    }

    /// Connection id, or `None` for a short header that omits it.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self {
            PacketHeader::Long(h) => Some(h.connection_id()),
            PacketHeader::Short(h) => h.connection_id(),
        }
    }

    pub fn packet_number(&self) -> PacketNumber {
        match self {
            PacketHeader::Long(h) => h.packet_number(),
            PacketHeader::Short(h) => h.packet_number(),
        }
    }

    pub fn has_version(&self) -> bool {
        matches!(self, PacketHeader::Long(_))
    }

    /// Version field. Short headers carry none and report `VERSION_UNSET`.
    pub fn version(&self) -> Version {
        match self {
            PacketHeader::Long(h) => h.version(),
            PacketHeader::Short(_) => VERSION_UNSET,
        }
    }

    pub fn has_key_phase(&self) -> bool {
        matches!(self, PacketHeader::Short(_))
    }

    /// Key phase. Long headers always report `Phase0`.
    pub fn key_phase(&self) -> KeyPhase {
        match self {
            PacketHeader::Long(_) => KeyPhase::Phase0,
            PacketHeader::Short(h) => h.key_phase(),
        }
    }

    /// Bytes following the header: the rest of the received buffer when
    /// parsed, the plaintext payload when built.
    pub fn payload(&self) -> &[u8] {
        match self {
            PacketHeader::Long(h) => h.payload(),
            PacketHeader::Short(h) => h.payload(),
        }
    }

    /// On-wire header length in bytes.
    pub fn length(&self) -> usize {
        match self {
            PacketHeader::Long(h) => h.length(),
            PacketHeader::Short(h) => h.length(),
        }
    }

    /// Serialize a built header into `buf`, returning the bytes written.
    pub fn store(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            PacketHeader::Long(h) => h.store(buf),
            PacketHeader::Short(h) => h.store(buf),
        }
    }

    /// The buffer a parsed header was loaded from.
    pub fn wire_bytes(&self) -> Option<&'a [u8]> {
        match self {
            PacketHeader::Long(h) => h.wire_bytes(),
            PacketHeader::Short(h) => h.wire_bytes(),
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.wire_bytes().is_some()
    }
}

impl<'a> From<LongHeader<'a>> for PacketHeader<'a> {
    fn from(h: LongHeader<'a>) -> Self {
        PacketHeader::Long(h)
    }
}

impl<'a> From<ShortHeader<'a>> for PacketHeader<'a> {
    fn from(h: ShortHeader<'a>) -> Self {
        PacketHeader::Short(h)
    }
}

fn ensure_capacity(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(PacketError::BufferTooSmall {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

// ─── Long Header ─────────────────────────────────────────────────────────────

/// Long header: handshake and other unprotected packet types.
#[derive(Debug, Clone)]
pub struct LongHeader<'a> {
    repr: LongRepr<'a>,
}

#[derive(Debug, Clone)]
enum LongRepr<'a> {
    Parsed(&'a [u8]),
    Built {
        packet_type: PacketType,
        connection_id: ConnectionId,
        packet_number: PacketNumber,
        version: Version,
        payload: Bytes,
    },
}

impl<'a> LongHeader<'a> {
    /// Parse a view over `buf`. The first byte must have the form bit set.
    pub fn load(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < LONG_HEADER_LEN {
            return Err(PacketError::Truncated {
                needed: LONG_HEADER_LEN,
                actual: buf.len(),
            });
        }
        debug_assert!(buf[0] & HEADER_FORM_BIT != 0);
        if PacketType::from_wire(buf[0] & LONG_TYPE_MASK) == PacketType::Uninitialized {
            tracing::trace!(first_byte = buf[0], "unrecognized long header type");
        }
        Ok(LongHeader {
            repr: LongRepr::Parsed(buf),
        })
    }

    pub fn build(
        packet_type: PacketType,
        connection_id: ConnectionId,
        packet_number: PacketNumber,
        version: Version,
        payload: Bytes,
    ) -> LongHeader<'static> {
        debug_assert!(packet_type != PacketType::Uninitialized);
        LongHeader {
            repr: LongRepr::Built {
                packet_type,
                connection_id,
                packet_number,
                version,
                payload,
            },
        }
    }

    pub fn packet_type(&self) -> PacketType {
        match &self.repr {
            LongRepr::Parsed(buf) => PacketType::from_wire(buf[0] & LONG_TYPE_MASK),
            LongRepr::Built { packet_type, .. } => *packet_type,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        match &self.repr {
            LongRepr::Parsed(buf) => read_connection_id(&buf[OFFSET_CONNECTION_ID..]),
            LongRepr::Built { connection_id, .. } => *connection_id,
        }
    }

    pub fn packet_number(&self) -> PacketNumber {
        match &self.repr {
            LongRepr::Parsed(buf) => {
                read_packet_number(&buf[OFFSET_PACKET_NUMBER..], LONG_PACKET_NUMBER_LEN)
            }
            LongRepr::Built { packet_number, .. } => *packet_number,
        }
    }

    pub fn version(&self) -> Version {
        match &self.repr {
            LongRepr::Parsed(buf) => read_version(&buf[OFFSET_VERSION..]),
            LongRepr::Built { version, .. } => *version,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match &self.repr {
            LongRepr::Parsed(buf) => &buf[LONG_HEADER_LEN..],
            LongRepr::Built { payload, .. } => payload,
        }
    }

    #[inline]
    pub fn length(&self) -> usize {
        LONG_HEADER_LEN
    }

    /// Flag byte, connection id, 4-byte packet number, version.
    pub fn store(&self, buf: &mut [u8]) -> Result<usize> {
        let LongRepr::Built {
            packet_type,
            connection_id,
            packet_number,
            version,
            ..
        } = &self.repr
        else {
            return Err(PacketError::NotBuilt);
        };
        ensure_capacity(buf, LONG_HEADER_LEN)?;

        let mut out = &mut buf[..LONG_HEADER_LEN];
        out.put_u8(HEADER_FORM_BIT | (*packet_type as u8 & LONG_TYPE_MASK));
        write_connection_id(*connection_id, &mut out);
        write_packet_number(*packet_number, LONG_PACKET_NUMBER_LEN, &mut out);
        write_version(*version, &mut out);
        Ok(LONG_HEADER_LEN)
    }

    pub fn wire_bytes(&self) -> Option<&'a [u8]> {
        match self.repr {
            LongRepr::Parsed(buf) => Some(buf),
            LongRepr::Built { .. } => None,
        }
    }
}

// ─── Short Header ────────────────────────────────────────────────────────────

/// Short header: 1-RTT protected packets.
///
/// The packet type is never stored. It is derived from the key phase, which
/// is the only type information the format encodes.
#[derive(Debug, Clone)]
pub struct ShortHeader<'a> {
    repr: ShortRepr<'a>,
}

#[derive(Debug, Clone)]
enum ShortRepr<'a> {
    /// Width selector is validated and decoded once at load.
    Parsed {
        buf: &'a [u8],
        packet_number_len: PacketNumberLen,
    },
    Built {
        key_phase: KeyPhase,
        connection_id: Option<ConnectionId>,
        packet_number: PacketNumber,
        packet_number_len: PacketNumberLen,
        payload: Bytes,
    },
}

impl<'a> ShortHeader<'a> {
    /// Parse a view over `buf`. The first byte must have the form bit clear.
    pub fn load(buf: &'a [u8]) -> Result<Self> {
        let flags = *buf
            .first()
            .ok_or(PacketError::Truncated { needed: 1, actual: 0 })?;
        debug_assert!(flags & HEADER_FORM_BIT == 0);

        let packet_number_len = PacketNumberLen::from_bits(flags)
            .ok_or(PacketError::InvalidPacketNumberLen(flags & PACKET_NUMBER_LEN_MASK))?;
        let needed = short_header_len(flags & CONNECTION_ID_BIT != 0, packet_number_len);
        if buf.len() < needed {
            return Err(PacketError::Truncated {
                needed,
                actual: buf.len(),
            });
        }
        Ok(ShortHeader {
            repr: ShortRepr::Parsed {
                buf,
                packet_number_len,
            },
        })
    }

    /// Build a 1-RTT header. `packet_type` must be one of the two
    /// `OneRttProtected*` types; the packet number width follows from its
    /// magnitude.
    pub fn build(
        packet_type: PacketType,
        connection_id: Option<ConnectionId>,
        packet_number: PacketNumber,
        payload: Bytes,
    ) -> Result<ShortHeader<'static>> {
        let key_phase = KeyPhase::for_packet_type(packet_type);
        if key_phase == KeyPhase::Uninitialized {
            return Err(PacketError::NotShortHeaderType(packet_type));
        }
        Ok(ShortHeader {
            repr: ShortRepr::Built {
                key_phase,
                connection_id,
                packet_number,
                packet_number_len: PacketNumberLen::for_value(packet_number),
                payload,
            },
        })
    }

    pub fn packet_type(&self) -> PacketType {
        match self.key_phase() {
            KeyPhase::Phase0 => PacketType::OneRttProtectedPhase0,
            KeyPhase::Phase1 => PacketType::OneRttProtectedPhase1,
            KeyPhase::Uninitialized => {
                debug_assert!(false, "short header without a key phase");
                PacketType::Uninitialized
            }
        }
    }

    pub fn key_phase(&self) -> KeyPhase {
        match &self.repr {
            ShortRepr::Parsed { buf, .. } => {
                if buf[0] & KEY_PHASE_BIT != 0 {
                    KeyPhase::Phase1
                } else {
                    KeyPhase::Phase0
                }
            }
            ShortRepr::Built { key_phase, .. } => *key_phase,
        }
    }

    pub fn has_connection_id(&self) -> bool {
        match &self.repr {
            ShortRepr::Parsed { buf, .. } => buf[0] & CONNECTION_ID_BIT != 0,
            ShortRepr::Built { connection_id, .. } => connection_id.is_some(),
        }
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        match &self.repr {
            ShortRepr::Parsed { buf, .. } => self
                .has_connection_id()
                .then(|| read_connection_id(&buf[OFFSET_CONNECTION_ID..])),
            ShortRepr::Built { connection_id, .. } => *connection_id,
        }
    }

    pub fn packet_number_len(&self) -> PacketNumberLen {
        match &self.repr {
            ShortRepr::Parsed {
                packet_number_len, ..
            }
            | ShortRepr::Built {
                packet_number_len, ..
            } => *packet_number_len,
        }
    }

    pub fn packet_number(&self) -> PacketNumber {
        match &self.repr {
            ShortRepr::Parsed {
                buf,
                packet_number_len,
            } => {
                let offset = if self.has_connection_id() {
                    OFFSET_PACKET_NUMBER
                } else {
                    OFFSET_CONNECTION_ID
                };
                read_packet_number(&buf[offset..], packet_number_len.bytes())
            }
            ShortRepr::Built { packet_number, .. } => *packet_number,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match &self.repr {
            ShortRepr::Parsed { buf, .. } => &buf[self.length()..],
            ShortRepr::Built { payload, .. } => payload,
        }
    }

    pub fn length(&self) -> usize {
        short_header_len(self.has_connection_id(), self.packet_number_len())
    }

    /// Flag byte, optional connection id, packet number truncated to the
    /// selected width.
    pub fn store(&self, buf: &mut [u8]) -> Result<usize> {
        let ShortRepr::Built {
            key_phase,
            connection_id,
            packet_number,
            packet_number_len,
            ..
        } = &self.repr
        else {
            return Err(PacketError::NotBuilt);
        };
        let len = self.length();
        ensure_capacity(buf, len)?;

        let mut flags = *packet_number_len as u8;
        if connection_id.is_some() {
            flags |= CONNECTION_ID_BIT;
        }
        if *key_phase == KeyPhase::Phase1 {
            flags |= KEY_PHASE_BIT;
        }

        let mut out = &mut buf[..len];
        out.put_u8(flags);
        if let Some(cid) = connection_id {
            write_connection_id(*cid, &mut out);
        }
        write_packet_number(*packet_number, packet_number_len.bytes(), &mut out);
        Ok(len)
    }

    pub fn wire_bytes(&self) -> Option<&'a [u8]> {
        match self.repr {
            ShortRepr::Parsed { buf, .. } => Some(buf),
            ShortRepr::Built { .. } => None,
        }
    }
}

fn short_header_len(has_connection_id: bool, packet_number_len: PacketNumberLen) -> usize {
    let cid_len = if has_connection_id {
        ConnectionId::LEN
    } else {
        0
    };
    1 + cid_len + packet_number_len.bytes()
}
