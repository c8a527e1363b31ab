//! Fungible token collaborators
//!
//! The exchange never owns token balances itself. Pools, the router and the
//! mining ledger only talk to tokens through [`TokenBank`], which bundles the
//! standard fungible-asset surface of every token plus the chain's native
//! coin. [`InMemoryTokenBank`] is the stand-in used by the host and the tests.

mod in_memory;

pub use in_memory::{InMemoryTokenBank, TokenMetadata};

use crate::common::errors::DexError;
use ethereum_types::{Address, U256};

/// Standard fungible-asset semantics for every token, keyed by token address
pub trait TokenBank {
    fn balance_of(&self, token: Address, owner: Address) -> U256;

    fn total_supply(&self, token: Address) -> U256;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;

    /// Move `amount` from `from` (the caller) to `to`
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance
    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError>;

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), DexError>;

    /// Privileged issuance, reserved for minters and wrappers
    fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), DexError>;

    fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), DexError>;

    fn native_balance(&self, owner: Address) -> U256;

    fn transfer_native(&mut self, from: Address, to: Address, amount: U256)
        -> Result<(), DexError>;
}

/// Pull `amount` of `token` from `payer` into `to`.
///
/// A component paying out of its own balance transfers directly; anyone
/// else needs the payer's allowance.
pub fn pull(
    tokens: &mut dyn TokenBank,
    token: Address,
    spender: Address,
    payer: Address,
    to: Address,
    amount: U256,
) -> Result<(), DexError> {
    if spender == payer {
        tokens.transfer(token, payer, to, amount)
    } else {
        tokens.transfer_from(token, spender, payer, to, amount)
    }
}
