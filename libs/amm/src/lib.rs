//! # HashSwap AMM - Constant-Product Pools and Registry
//!
//! ## Purpose
//!
//! Exact integer implementation of the constant-product market maker: the
//! swap and liquidity formulas ([`V2Math`]), the [`ReservePool`] that holds a
//! pair's reserves and LP shares, and the [`PoolRegistry`] that creates one
//! pool per unordered pair at a deterministic address.
//!
//! ## Integration Points
//!
//! - **Token movements**: every pool settles through a [`types::TokenBank`]
//!   and reads balance deltas, never declared amounts
//! - **Router**: resolves pools through the registry and quotes paths via
//!   [`AmmPool`]
//! - **Mining**: pool addresses are the keys the hash-rate ledger registers
//!
//! ## Precision
//!
//! State-changing math is checked `U256` arithmetic with on-chain rounding.
//! `Decimal` appears only in read-only analytics (spot price, price impact).
//!
//! ## Example
//!
//! ```rust
//! use amm::{pool_address, pool_code_hash, PoolParams, PoolRegistry};
//! use types::Address;
//!
//! let registry_address = Address::from_low_u64_be(0xfac);
//! let code_hash = pool_code_hash("hashswap/reserve-pool/v1");
//! let mut registry = PoolRegistry::new(
//!     registry_address,
//!     Address::from_low_u64_be(0xad),
//!     PoolParams::default(),
//!     code_hash,
//! );
//!
//! let (a, b) = (Address::from_low_u64_be(1), Address::from_low_u64_be(2));
//! let predicted = pool_address(registry_address, b, a, code_hash).unwrap();
//! assert_eq!(registry.get_or_create_pool(a, b).unwrap(), predicted);
//! ```

pub mod pool_traits;
pub mod registry;
pub mod reserve_pool;
pub mod v2_math;

pub use pool_traits::{AmmPool, PoolSnapshot};
pub use registry::{create2_address, keccak256, pool_address, pool_code_hash, sort_tokens, PoolRegistry};
pub use reserve_pool::{DepositRequest, LiquidityReceipt, PoolParams, ReservePool, SwapCallee};
pub use v2_math::V2Math;

/// Common types for AMM analytics
pub use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;
