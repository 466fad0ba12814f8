//! # Packet Number Generation
//!
//! One strictly increasing sequence per connection direction. The generator
//! is plain owned state; whoever owns the connection owns its generator.

use crate::types::PacketNumber;

/// Monotonic packet number source.
///
/// Starts at an externally agreed value and advances by exactly one per
/// call. It is never reset; past `u64::MAX` it wraps to zero rather than
/// panicking. The wire encoding already truncates numbers above `u32::MAX`.
#[derive(Debug, Clone, Default)]
pub struct PacketNumberGenerator {
    current: PacketNumber,
}

impl PacketNumberGenerator {
    pub fn new(initial: PacketNumber) -> Self {
        PacketNumberGenerator { current: initial }
    }

    /// Return the current number, then advance. Wraps at `u64::MAX`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> PacketNumber {
        let pn = self.current;
        self.current = self.current.wrapping_add(1);
        pn
    }

    /// The number the next call to [`next`](Self::next) will return.
    pub fn current(&self) -> PacketNumber {
        self.current
    }
}
