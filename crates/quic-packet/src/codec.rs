//! # Field Codec Primitives
//!
//! Readers and writers for the fixed-purpose integers in a packet header,
//! plus the FNV-1a checksum used to seal unprotected packets.
//!
//! All multi-byte fields are big-endian. Readers expect the caller to have
//! checked the slice length; header parsing validates lengths once at load
//! time so accessors stay branch-free.

use bytes::{Buf, BufMut};

use crate::types::{ConnectionId, PacketNumber, Version};

/// Length of the FNV-1a trailer on unprotected packets.
pub const FNV1A_HASH_LEN: usize = 8;

const FNV1A_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A_PRIME: u64 = 0x0000_0100_0000_01b3;

// ─── Readers ─────────────────────────────────────────────────────────────────

/// Read an 8-byte connection id. Panics if `buf` is shorter than 8 bytes.
#[inline]
pub fn read_connection_id(mut buf: &[u8]) -> ConnectionId {
    ConnectionId::new(buf.get_u64())
}

/// Read a `len`-byte packet number (1..=8). Panics if `buf` is too short.
#[inline]
pub fn read_packet_number(mut buf: &[u8], len: usize) -> PacketNumber {
    buf.get_uint(len)
}

/// Read a 4-byte version. Panics if `buf` is shorter than 4 bytes.
#[inline]
pub fn read_version(mut buf: &[u8]) -> Version {
    buf.get_u32()
}

// ─── Writers ─────────────────────────────────────────────────────────────────

#[inline]
pub fn write_connection_id(cid: ConnectionId, buf: &mut impl BufMut) {
    buf.put_u64(cid.value());
}

/// Write the low `len` bytes of `pn`. Higher bytes are dropped.
#[inline]
pub fn write_packet_number(pn: PacketNumber, len: usize, buf: &mut impl BufMut) {
    buf.put_uint(pn, len);
}

#[inline]
pub fn write_version(version: Version, buf: &mut impl BufMut) {
    buf.put_u32(version);
}

// ─── Checksum ────────────────────────────────────────────────────────────────

/// 64-bit FNV-1a over `data`, returned in network byte order.
pub fn fnv1a(data: &[u8]) -> [u8; FNV1A_HASH_LEN] {
    let hash = data.iter().fold(FNV1A_OFFSET_BASIS, |h, &b| {
        (h ^ b as u64).wrapping_mul(FNV1A_PRIME)
    });
    hash.to_be_bytes()
}
