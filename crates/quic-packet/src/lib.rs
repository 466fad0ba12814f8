//! # quic-packet
//!
//! Wire encoding and decoding of QUIC transport packets.
//!
//! Inbound datagrams are wrapped zero-copy by [`Packet::load`]; header
//! fields are read on demand from the received bytes. Outbound packets are
//! built by [`PacketFactory`] and serialized with [`Packet::store`], which
//! appends an FNV-1a checksum to unprotected packets or writes the AEAD
//! ciphertext produced by the bound [`PacketCipher`] for protected ones.
//!
//! ## Crate structure
//!
//! - [`types`] — Packet types, key phase, connection id, packet number width
//! - [`codec`] — Field readers/writers and the FNV-1a checksum
//! - [`header`] — Long and short headers, parsed or built
//! - [`packet`] — Header + payload, size accounting, integrity, serialization
//! - [`number`] — Packet number generator
//! - [`crypto`] — Cipher interface consumed for protected packets
//! - [`factory`] — Outbound packet construction
//! - [`stats`] — Factory counters
//! - [`error`] — Error type

pub mod codec;
pub mod crypto;
pub mod error;
pub mod factory;
pub mod header;
pub mod number;
pub mod packet;
pub mod stats;
pub mod types;

pub use crypto::{CipherError, PacketCipher};
pub use error::{PacketError, Result};
pub use factory::{FactoryConfig, PacketFactory};
pub use header::{LongHeader, PacketHeader, ShortHeader};
pub use number::PacketNumberGenerator;
pub use packet::Packet;
pub use types::{
    ConnectionId, KeyPhase, PacketNumber, PacketNumberLen, PacketType, Version,
    SUPPORTED_VERSIONS, VERSION_UNSET,
};
