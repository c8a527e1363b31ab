//! Deployment fixture
//!
//! Wraps an [`Exchange`] with named tokens and wallets so scenarios read as
//! a sequence of transactions. Every helper is one transaction (one block).

use anyhow::{Context, Result};
use dex_config::ExchangeConfig;
use router::{AddLiquidity, Deposit, Exchange, RemoveLiquidity, Route};
use tracing::debug;
use types::math::units;
use types::{Address, DexError, TokenBank, TokenMetadata, U256};

/// Sorted token addresses: `token(0)` is token0 of every pool it joins
pub fn token(index: u64) -> Address {
    Address::from_low_u64_be(0x10 + index)
}

pub fn wallet(index: u64) -> Address {
    Address::from_low_u64_be(0x1000 + index)
}

/// Whole tokens at 18 decimals
pub fn wad(amount: u64) -> U256 {
    units(amount, 18)
}

pub struct Deployment {
    pub exchange: Exchange,
    pub tokens: Vec<Address>,
}

impl Deployment {
    /// Deploy with `token_count` plain 18-decimal tokens
    pub fn new(config: &ExchangeConfig, token_count: u64) -> Result<Self> {
        let mut exchange = Exchange::new(config).context("Failed to deploy exchange")?;
        let tokens: Vec<Address> = (0..token_count).map(token).collect();
        let bank = &mut exchange.state_mut().tokens;
        for (i, address) in tokens.iter().enumerate() {
            bank.create_token(*address, TokenMetadata::new(format!("TK{}", i), 18));
        }
        Ok(Self { exchange, tokens })
    }

    pub fn with_defaults(token_count: u64) -> Result<Self> {
        Self::new(&ExchangeConfig::default(), token_count)
    }

    /// Mint `amount` of every token to `owner` and approve the router for all of it
    pub fn fund(&mut self, owner: Address, amount: U256) -> Result<()> {
        let router = self.exchange.router().address();
        let bank = &mut self.exchange.state_mut().tokens;
        for token in &self.tokens {
            bank.mint(*token, owner, amount)?;
            bank.approve(*token, owner, router, U256::MAX)?;
        }
        Ok(())
    }

    pub fn add_liquidity(
        &mut self,
        from: Address,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
    ) -> Result<Deposit, DexError> {
        let request = AddLiquidity {
            token_a,
            token_b,
            amount_a_desired: amount_a,
            amount_b_desired: amount_b,
            amount_a_min: U256::zero(),
            amount_b_min: U256::zero(),
            to: from,
            deadline: u64::MAX,
        };
        self.exchange.transact(from, |state, router, ctx| {
            router.add_liquidity(&mut state.venue(), ctx, &request)
        })
    }

    /// Exact-input swap along `path` with no output floor
    pub fn swap(
        &mut self,
        from: Address,
        path: &[Address],
        amount_in: U256,
        to: Address,
    ) -> Result<Vec<U256>, DexError> {
        let route = Route::new(path.to_vec(), to, u64::MAX);
        let amounts = self.exchange.transact(from, |state, router, ctx| {
            router.swap_exact_tokens_for_tokens(&mut state.venue(), ctx, amount_in, U256::zero(), &route)
        })?;
        debug!("{:?} swapped {:?}", from, amounts);
        Ok(amounts)
    }

    /// Let the router spend `owner`'s LP shares
    pub fn approve_shares(&mut self, owner: Address, pool: Address, amount: U256) -> Result<(), DexError> {
        let router = self.exchange.router().address();
        self.exchange.transact(owner, |state, _, ctx| {
            state
                .registry
                .pool_mut(pool)
                .ok_or(DexError::UnknownPool(pool))?
                .approve_shares(ctx.caller, router, amount);
            Ok(())
        })
    }

    pub fn remove_liquidity(
        &mut self,
        owner: Address,
        token_a: Address,
        token_b: Address,
        shares: U256,
    ) -> Result<(U256, U256), DexError> {
        let request = RemoveLiquidity {
            token_a,
            token_b,
            liquidity: shares,
            amount_a_min: U256::zero(),
            amount_b_min: U256::zero(),
            to: owner,
            deadline: u64::MAX,
        };
        self.exchange.transact(owner, |state, router, ctx| {
            router.remove_liquidity(&mut state.venue(), ctx, &request)
        })
    }

    /// Register pools with their weights in one operator transaction
    pub fn register(&mut self, pools: &[(Address, u64)]) -> Result<(), DexError> {
        let operator = self.exchange.operator();
        self.exchange.transact(operator, |state, _, ctx| {
            for (pool, weight) in pools {
                state.mining.register_pool(ctx, *pool, *weight)?;
            }
            Ok(())
        })
    }

    pub fn harvest(&mut self, miner: Address, pool: Address) -> Result<U256, DexError> {
        self.exchange
            .transact(miner, |state, _, ctx| state.harvest(ctx, pool, ctx.caller))
    }

    pub fn pool(&self, token_a: Address, token_b: Address) -> Option<Address> {
        self.exchange.state().registry.get_pool(token_a, token_b)
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.exchange.balance_of(token, owner)
    }

    pub fn shares(&self, pool: Address, owner: Address) -> U256 {
        self.exchange
            .state()
            .registry
            .pool(pool)
            .map_or_else(U256::zero, |p| p.share_balance(owner))
    }

    pub fn hash_rate(&self, pool: Address, miner: Address) -> U256 {
        self.exchange.state().mining.user_info(pool, miner).hash_rate
    }

    /// Reward `miner` could harvest if the next block were mined now
    pub fn pending_next_block(&self, pool: Address, miner: Address) -> U256 {
        self.exchange
            .state()
            .mining
            .pending_reward(pool, miner, self.exchange.block_number() + 1)
    }
}
