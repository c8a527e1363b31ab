//! # HashSwap Shared Types
//!
//! Primitives shared by every exchange crate.
//!
//! ## Contents
//!
//! - **Identities and amounts**: `Address` (20 bytes) and `U256` from `ethereum-types`
//! - **Call context**: caller, attached native value and block header for one call
//! - **Error taxonomy**: [`DexError`] with a variant per failure and [`ErrorKind`] categories
//! - **Checked math**: overflow-as-error helpers over `U256`
//! - **Collaborators**: [`TokenBank`] and [`EmissionSource`] interfaces with in-memory stand-ins
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Address, InMemoryTokenBank, TokenBank, TokenMetadata, U256};
//!
//! let token = Address::from_low_u64_be(0x10);
//! let alice = Address::from_low_u64_be(1);
//!
//! let mut bank = InMemoryTokenBank::new();
//! bank.create_token(token, TokenMetadata::new("TK0", 18));
//! bank.mint(token, alice, U256::from(1_000u64)).unwrap();
//! assert_eq!(bank.balance_of(token, alice), U256::from(1_000u64));
//! ```

pub mod common;
pub mod emission;
pub mod tokens;

pub use common::math;
pub use common::{CallContext, DexError, ErrorKind, Side};
pub use emission::{EmissionSource, RewardMinter};
pub use tokens::{pull, InMemoryTokenBank, TokenBank, TokenMetadata};

pub use ethereum_types::{Address, H256, U256};
