//! # Factory Statistics
//!
//! Counters kept by [`PacketFactory`](crate::factory::PacketFactory) for
//! JSON export by the connection layer.

use serde::Serialize;

/// Outbound packet counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactoryStats {
    /// Packets successfully created, all kinds.
    pub packets_created: u64,
    /// Of those, packets sealed by the cipher.
    pub protected_packets: u64,
    /// Version negotiation replies created.
    pub version_negotiations: u64,
    /// Protected packets that failed to encrypt.
    pub encryption_failures: u64,
    /// Ciphertext bytes produced.
    pub bytes_protected: u64,
}

impl FactoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of protected packet attempts that failed.
    pub fn encryption_failure_rate(&self) -> f64 {
        let attempts = self.protected_packets + self.encryption_failures;
        if attempts == 0 {
            0.0
        } else {
            self.encryption_failures as f64 / attempts as f64
        }
    }
}
