//! # Packet Protection Interface
//!
//! The AEAD cipher lives outside this crate. The factory only needs a
//! narrow `encrypt` call, expressed as the [`PacketCipher`] trait so the
//! handshake layer can plug in whatever key schedule it negotiated, and
//! tests can plug in stubs.

use thiserror::Error;

use crate::types::{KeyPhase, PacketNumber};

/// Opaque cipher failure. No subtypes are distinguished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("packet encryption failed")]
pub struct CipherError;

/// Authenticated encryption for protected packets.
pub trait PacketCipher: Send + Sync {
    /// Seal `plaintext` into `out`, returning the ciphertext length.
    ///
    /// `out.len()` is the capacity available to the cipher.
    /// `associated_data` is the exact serialized packet header, and
    /// `key_phase` selects which 1-RTT key to use. Encryption must be
    /// deterministic for a given key state, so a failure is not retried.
    fn encrypt(
        &self,
        out: &mut [u8],
        plaintext: &[u8],
        packet_number: PacketNumber,
        associated_data: &[u8],
        key_phase: KeyPhase,
    ) -> Result<usize, CipherError>;
}
