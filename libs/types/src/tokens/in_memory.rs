//! In-memory token ledger
//!
//! Holds every token's balances and allowances plus the native coin. Tokens
//! can be configured with a transfer fee (burned on every transfer) to model
//! fee-on-transfer assets; mint and burn are never taxed.

use super::TokenBank;
use crate::common::errors::DexError;
use crate::common::math;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Static description of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
    /// Burned on transfer, in basis points
    pub transfer_fee_bps: u32,
}

impl TokenMetadata {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            transfer_fee_bps: 0,
        }
    }

    pub fn with_transfer_fee(mut self, fee_bps: u32) -> Self {
        self.transfer_fee_bps = fee_bps;
        self
    }
}

#[derive(Debug, Clone)]
struct TokenAccount {
    metadata: TokenMetadata,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl TokenAccount {
    fn balance(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn debit(&mut self, token: Address, owner: Address, amount: U256) -> Result<(), DexError> {
        let available = self.balance(owner);
        if available < amount {
            return Err(DexError::InsufficientBalance {
                token,
                owner,
                needed: amount,
                available,
            });
        }
        self.balances.insert(owner, available - amount);
        Ok(())
    }

    fn credit(&mut self, owner: Address, amount: U256) -> Result<(), DexError> {
        let balance = math::add(self.balance(owner), amount)?;
        self.balances.insert(owner, balance);
        Ok(())
    }
}

/// Token ledger for every token known to the exchange
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenBank {
    tokens: HashMap<Address, TokenAccount>,
    native: HashMap<Address, U256>,
}

impl InMemoryTokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a token at `address`; redeploying an existing address is a no-op
    pub fn create_token(&mut self, address: Address, metadata: TokenMetadata) {
        self.tokens.entry(address).or_insert_with(|| {
            debug!("Token {} deployed at {:?}", metadata.symbol, address);
            TokenAccount {
                metadata,
                total_supply: U256::zero(),
                balances: HashMap::new(),
                allowances: HashMap::new(),
            }
        });
    }

    pub fn metadata(&self, token: Address) -> Option<&TokenMetadata> {
        self.tokens.get(&token).map(|t| &t.metadata)
    }

    pub fn contains(&self, token: Address) -> bool {
        self.tokens.contains_key(&token)
    }

    /// Credit native coin out of thin air (genesis allocation)
    pub fn fund_native(&mut self, owner: Address, amount: U256) -> Result<(), DexError> {
        let balance = math::add(self.native_balance(owner), amount)?;
        self.native.insert(owner, balance);
        Ok(())
    }

    fn account_mut(&mut self, token: Address) -> Result<&mut TokenAccount, DexError> {
        self.tokens
            .get_mut(&token)
            .ok_or(DexError::UnknownToken(token))
    }

    fn move_balance(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        let account = self.account_mut(token)?;
        let fee = math::mul_div(
            amount,
            U256::from(account.metadata.transfer_fee_bps),
            U256::from(10_000u64),
        )?;
        let received = math::sub(amount, fee)?;
        account.debit(token, from, amount)?;
        account.credit(to, received)?;
        account.total_supply = math::sub(account.total_supply, fee)?;
        Ok(())
    }
}

impl TokenBank for InMemoryTokenBank {
    fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(|t| t.balance(owner))
            .unwrap_or_default()
    }

    fn total_supply(&self, token: Address) -> U256 {
        self.tokens
            .get(&token)
            .map(|t| t.total_supply)
            .unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|t| t.allowances.get(&(owner, spender)).copied())
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        self.move_balance(token, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        let available = self.allowance(token, from, spender);
        if available < amount {
            return Err(DexError::InsufficientAllowance {
                token,
                owner: from,
                spender,
                needed: amount,
                available,
            });
        }
        self.move_balance(token, from, to, amount)?;
        // Unlimited approvals are never spent down
        if available != U256::MAX {
            self.account_mut(token)?
                .allowances
                .insert((from, spender), available - amount);
        }
        Ok(())
    }

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        self.account_mut(token)?
            .allowances
            .insert((owner, spender), amount);
        Ok(())
    }

    fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), DexError> {
        let account = self.account_mut(token)?;
        account.total_supply = math::add(account.total_supply, amount)?;
        account.credit(to, amount)
    }

    fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), DexError> {
        let account = self.account_mut(token)?;
        account.debit(token, from, amount)?;
        account.total_supply = math::sub(account.total_supply, amount)?;
        Ok(())
    }

    fn native_balance(&self, owner: Address) -> U256 {
        self.native.get(&owner).copied().unwrap_or_default()
    }

    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(DexError::InsufficientBalance {
                token: Address::zero(),
                owner: from,
                needed: amount,
                available,
            });
        }
        self.native.insert(from, available - amount);
        let balance = math::add(self.native_balance(to), amount)?;
        self.native.insert(to, balance);
        Ok(())
    }
}
