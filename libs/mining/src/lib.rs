//! # HashSwap Mining
//!
//! Liquidity-mining rewards keyed on trading activity rather than deposits.
//! The router reports each swap's output volume on mining-registered pools
//! as "hash rate"; the [`HashRateLedger`] splits a per-block reward emission
//! across pools by alloc weight and within a pool by hash rate, using the
//! reward-per-share accumulator with lazy, touch-driven settlement.
//!
//! Rewards are never held by the ledger. [`HashRateLedger::harvest`] asks an
//! [`types::EmissionSource`] to deliver them and commits nothing if it refuses.

pub mod ledger;

pub use ledger::{HashRateLedger, MinerInfo, MiningPool};
