//! # Packet Field Types
//!
//! Logical values carried in QUIC packet headers, independent of how they
//! are laid out on the wire.

use std::fmt;

// ─── Scalars ─────────────────────────────────────────────────────────────────

/// Logical 64-bit packet number. Truncated to 1, 2 or 4 bytes on the wire.
pub type PacketNumber = u64;

/// 32-bit protocol version.
pub type Version = u32;

/// Sentinel for "no version negotiated yet".
pub const VERSION_UNSET: Version = 0;

/// Versions this implementation speaks, in the order advertised by
/// version negotiation packets.
pub const SUPPORTED_VERSIONS: [Version; 1] = [0xff00_0005];

// ─── Connection ID ───────────────────────────────────────────────────────────

/// Fixed-width 8-byte opaque connection identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Encoded length in bytes.
    pub const LEN: usize = 8;

    #[inline]
    pub const fn new(value: u64) -> Self {
        ConnectionId(value)
    }

    /// Pick a fresh identifier, as a client does for its first flight.
    pub fn random() -> Self {
        ConnectionId(rand::random())
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self {
        ConnectionId(value)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({:016x})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ─── Packet Type ─────────────────────────────────────────────────────────────

/// Every packet kind the wire format can express.
///
/// Long headers carry the discriminant in the low 7 bits of the first byte.
/// Short headers never carry it; their type is a view over the key phase bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    VersionNegotiation = 0x01,
    ClientInitial = 0x02,
    ServerStatelessRetry = 0x03,
    ServerCleartext = 0x04,
    ClientCleartext = 0x05,
    ZeroRttProtected = 0x06,
    OneRttProtectedPhase0 = 0x07,
    OneRttProtectedPhase1 = 0x08,
    StatelessReset = 0x09,
    /// Unknown or unparseable type. Receivers drop these packets.
    Uninitialized = 0x0a,
}

impl PacketType {
    /// Map the 7-bit long-header type field. Out-of-range values map to
    /// `Uninitialized`.
    pub fn from_wire(b: u8) -> Self {
        match b {
            0x01 => PacketType::VersionNegotiation,
            0x02 => PacketType::ClientInitial,
            0x03 => PacketType::ServerStatelessRetry,
            0x04 => PacketType::ServerCleartext,
            0x05 => PacketType::ClientCleartext,
            0x06 => PacketType::ZeroRttProtected,
            0x07 => PacketType::OneRttProtectedPhase0,
            0x08 => PacketType::OneRttProtectedPhase1,
            0x09 => PacketType::StatelessReset,
            _ => PacketType::Uninitialized,
        }
    }

    /// Protected packets are sealed by the AEAD cipher instead of carrying
    /// an FNV-1a trailer.
    #[inline]
    pub fn is_protected(self) -> bool {
        matches!(
            self,
            PacketType::ZeroRttProtected
                | PacketType::OneRttProtectedPhase0
                | PacketType::OneRttProtectedPhase1
        )
    }

    /// Whether packets of this type are sent with a long header.
    #[inline]
    pub fn has_long_header(self) -> bool {
        !matches!(
            self,
            PacketType::OneRttProtectedPhase0 | PacketType::OneRttProtectedPhase1
        )
    }
}

// ─── Key Phase ───────────────────────────────────────────────────────────────

/// Selects which of the two rotating 1-RTT keys protects a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    Phase0,
    Phase1,
    Uninitialized,
}

impl KeyPhase {
    /// Key phase implied by a 1-RTT packet type.
    pub fn for_packet_type(packet_type: PacketType) -> Self {
        match packet_type {
            PacketType::OneRttProtectedPhase0 => KeyPhase::Phase0,
            PacketType::OneRttProtectedPhase1 => KeyPhase::Phase1,
            _ => KeyPhase::Uninitialized,
        }
    }
}

// ─── Packet Number Length ────────────────────────────────────────────────────

/// Short-header packet number width, encoded in the low two bits of the
/// flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketNumberLen {
    One = 0b01,
    Two = 0b10,
    Four = 0b11,
}

impl PacketNumberLen {
    /// Smallest width that holds `pn` without truncation, capped at 4 bytes.
    ///
    /// Only the magnitude of `pn` is considered, not the peer's
    /// acknowledgement state.
    pub fn for_value(pn: PacketNumber) -> Self {
        if pn <= 0xFF {
            PacketNumberLen::One
        } else if pn <= 0xFFFF {
            PacketNumberLen::Two
        } else {
            PacketNumberLen::Four
        }
    }

    /// Decode the two selector bits. `0b00` is not a valid width.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x03 {
            0b01 => Some(PacketNumberLen::One),
            0b10 => Some(PacketNumberLen::Two),
            0b11 => Some(PacketNumberLen::Four),
            _ => None,
        }
    }

    #[inline]
    pub fn bytes(self) -> usize {
        match self {
            PacketNumberLen::One => 1,
            PacketNumberLen::Two => 2,
            PacketNumberLen::Four => 4,
        }
    }
}
