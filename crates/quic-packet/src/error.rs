//! Packet codec error types.

use thiserror::Error;

use crate::crypto::CipherError;
use crate::types::{PacketType, Version};

pub type Result<T> = std::result::Result<T, PacketError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet truncated: header needs {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("invalid packet number length selector: {0:#04b}")]
    InvalidPacketNumberLen(u8),

    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("parsed headers cannot be serialized; reuse the received bytes")]
    NotBuilt,

    #[error("{0:?} cannot be carried by a short header")]
    NotShortHeaderType(PacketType),

    #[error("{0:?} packets do not carry a protected payload")]
    NotProtected(PacketType),

    #[error("protected payload already set")]
    ProtectedPayloadAlreadySet,

    #[error("protected payload must be set before storing a protected packet")]
    ProtectedPayloadMissing,

    #[error("version already negotiated: {0:#010x}")]
    VersionAlreadySet(Version),

    #[error("cannot negotiate the unset version")]
    UnsetVersion,

    #[error("packet has no connection id")]
    MissingConnectionId,

    #[error("no cipher bound to the packet factory")]
    CipherUnset,

    #[error(transparent)]
    Encryption(#[from] CipherError),
}
