//! Timing constants shared by generator and verifier.

/// Lifetime and relay budget applied to new transactions, and the clock
/// tolerance applied when checking peers' timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPolicy {
    /// `expire_time = creation_time + expiry_grace_secs`.
    pub expiry_grace_secs: u64,
    /// TTL stamped on new transactions.
    pub initial_ttl: u32,
    /// How far in the future a peer's `creation_time` may be.
    pub clock_skew_secs: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            expiry_grace_secs: 60,
            initial_ttl: 10,
            clock_skew_secs: 10,
        }
    }
}
