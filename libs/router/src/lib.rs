//! # HashSwap Router
//!
//! ## Purpose
//!
//! Caller-facing surface of the exchange. The [`Router`] chains swaps across
//! registry pools, sizes liquidity deposits, wraps the native coin at the
//! boundary and reports swap volume to the hash-rate ledger. [`Exchange`]
//! hosts all components with a block clock and transactional rollback;
//! [`SharedExchange`] serialises it for multi-threaded use.
//!
//! ## Example
//!
//! ```rust
//! use dex_config::ExchangeConfig;
//! use router::{AddLiquidity, Exchange};
//! use types::{math::units, Address, TokenBank, TokenMetadata};
//!
//! let mut exchange = Exchange::new(&ExchangeConfig::default()).unwrap();
//! let (a, b) = (Address::from_low_u64_be(0xa), Address::from_low_u64_be(0xb));
//! let alice = Address::from_low_u64_be(0xa11ce);
//! let router = exchange.router().address();
//! {
//!     let tokens = &mut exchange.state_mut().tokens;
//!     for token in [a, b] {
//!         tokens.create_token(token, TokenMetadata::new("TK", 18));
//!         tokens.mint(token, alice, units(100, 18)).unwrap();
//!         tokens.approve(token, alice, router, units(100, 18)).unwrap();
//!     }
//! }
//!
//! let request = AddLiquidity {
//!     token_a: a,
//!     token_b: b,
//!     amount_a_desired: units(10, 18),
//!     amount_b_desired: units(40, 18),
//!     amount_a_min: units(10, 18),
//!     amount_b_min: units(40, 18),
//!     to: alice,
//!     deadline: u64::MAX,
//! };
//! let (_, _, shares) = exchange
//!     .transact(alice, |state, router, ctx| {
//!         router.add_liquidity(&mut state.venue(), ctx, &request)
//!     })
//!     .unwrap();
//! assert_eq!(shares, units(20, 18) - types::U256::from(1_000u64));
//! ```

pub mod exchange;
pub mod liquidity;
pub mod native;
pub mod router;
pub mod shared;

pub use exchange::{DexState, Exchange};
pub use liquidity::{AddLiquidity, AddLiquidityNative, Deposit, RemoveLiquidity, RemoveLiquidityNative};
pub use native::WrappedNative;
pub use router::{Route, Router, RouterConfig, Venue};
pub use shared::SharedExchange;
