//! Protocol constants
//!
//! Defaults for the tunable protocol parameters plus the fixed constants
//! every component has to agree on.

/// Fee denominator: fees are expressed in basis points
pub const FEE_DENOMINATOR: u32 = 10_000;

/// Default swap fee (30 bps = 0.3%)
pub const DEFAULT_FEE_BPS: u32 = 30;

/// Shares locked to the zero address on a pool's first mint
pub const DEFAULT_MINIMUM_LIQUIDITY: u64 = 1_000;

/// Reserves must fit in 112 bits
pub const RESERVE_BITS: usize = 112;

/// Pool identity derivation
pub mod addressing {
    /// CREATE2 domain prefix byte
    pub const CREATE2_PREFIX: u8 = 0xff;

    /// Hashed to produce the default pool code fingerprint
    pub const DEFAULT_POOL_CODE_LABEL: &str = "hashswap/reserve-pool/v1";
}

/// Hash-rate mining defaults
pub mod mining {
    /// Fixed-point scale of the reward-per-hash-rate accumulator
    pub const DEFAULT_REWARD_PRECISION: u64 = 1_000_000_000_000;

    /// 25 reward tokens (18 decimals) per block
    pub const DEFAULT_REWARD_PER_BLOCK: &str = "25000000000000000000";
}

/// Simulated chain defaults
pub mod chain {
    pub const DEFAULT_BLOCK_TIME_SECS: u64 = 3;
    pub const DEFAULT_GENESIS_TIMESTAMP: u64 = 1_700_000_000;
}
