//! Exchange host
//!
//! Owns every component plus a block clock and gives each call the
//! all-or-nothing semantics of a chain transaction: state is snapshotted
//! before the call and restored if it fails, so a multi-hop swap that fails
//! on its last hop leaves no trace of the earlier ones.

use crate::router::{Router, RouterConfig, Venue};
use amm::PoolRegistry;
use anyhow::{Context, Result};
use dex_config::ExchangeConfig;
use mining::HashRateLedger;
use tracing::{info, warn};
use types::{
    Address, CallContext, DexError, EmissionSource, InMemoryTokenBank, RewardMinter,
    TokenBank, TokenMetadata, U256,
};

/// Everything a transaction can mutate
#[derive(Debug, Clone)]
pub struct DexState {
    pub tokens: InMemoryTokenBank,
    pub registry: PoolRegistry,
    pub mining: HashRateLedger,
    pub minter: RewardMinter,
}

impl DexState {
    pub fn venue(&mut self) -> Venue<'_> {
        Venue {
            tokens: &mut self.tokens,
            registry: &mut self.registry,
            mining: Some(&mut self.mining),
        }
    }

    /// Harvest the caller's hash-rate reward in `pool`
    pub fn harvest(
        &mut self,
        ctx: &CallContext,
        pool: Address,
        recipient: Address,
    ) -> Result<U256, DexError> {
        self.mining
            .harvest(ctx, &mut self.tokens, &mut self.minter, pool, recipient)
    }
}

pub struct Exchange {
    state: DexState,
    router: Router,
    operator: Address,
    block_number: u64,
    timestamp: u64,
    block_time: u64,
    next_timestamp: Option<u64>,
}

impl Exchange {
    /// Deploy every component at its configured address
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        config.validate()?;
        let deployment = &config.deployment;

        let mut tokens = InMemoryTokenBank::new();
        tokens.create_token(deployment.wrapped_native, TokenMetadata::new("WNATIVE", 18));
        tokens.create_token(deployment.reward_token, TokenMetadata::new("HASH", 18));

        let registry = PoolRegistry::from_config(config).context("Failed to deploy registry")?;

        let genesis = CallContext::new(
            deployment.operator,
            config.chain.genesis_block,
            config.chain.genesis_timestamp,
        );
        let mut mining = HashRateLedger::new(
            deployment.mining_ledger,
            deployment.operator,
            config.mining.reward_per_block()?,
            config.mining.reward_precision()?,
        )
        .context("Failed to deploy mining ledger")?;
        mining
            .set_reporter(&genesis, deployment.router)
            .context("Failed to authorise router")?;

        let minter = match config.mining.emission_budget()? {
            Some(budget) => RewardMinter::with_budget(deployment.reward_token, budget),
            None => RewardMinter::new(deployment.reward_token),
        };

        let router = Router::new(RouterConfig {
            address: deployment.router,
            registry: deployment.registry,
            wrapped_native: deployment.wrapped_native,
            mining_ledger: Some(deployment.mining_ledger),
        });

        info!(
            "Exchange deployed: registry {:?}, router {:?}, ledger {:?} at block {}",
            deployment.registry, deployment.router, deployment.mining_ledger, genesis.block_number
        );

        Ok(Self {
            state: DexState {
                tokens,
                registry,
                mining,
                minter,
            },
            router,
            operator: deployment.operator,
            block_number: config.chain.genesis_block,
            timestamp: config.chain.genesis_timestamp,
            block_time: config.chain.block_time_secs,
            next_timestamp: None,
        })
    }

    pub fn state(&self) -> &DexState {
        &self.state
    }

    /// Direct access for genesis setup (token deployment, initial balances)
    pub fn state_mut(&mut self) -> &mut DexState {
        &mut self.state
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Context for reads at the current block
    pub fn view_context(&self, caller: Address) -> CallContext {
        CallContext::new(caller, self.block_number, self.timestamp)
    }

    fn mine_block(&mut self) {
        self.block_number += 1;
        self.timestamp = self
            .next_timestamp
            .take()
            .unwrap_or(self.timestamp + self.block_time);
    }

    /// Advance the clock by `blocks` empty blocks
    pub fn mine_blocks(&mut self, blocks: u64) {
        for _ in 0..blocks {
            self.mine_block();
        }
    }

    /// Pin the timestamp of the next mined block
    pub fn set_next_timestamp(&mut self, timestamp: u64) -> Result<(), DexError> {
        if timestamp < self.timestamp {
            return Err(DexError::invalid_input(format!(
                "timestamp {} is before the current block time {}",
                timestamp, self.timestamp
            )));
        }
        self.next_timestamp = Some(timestamp);
        Ok(())
    }

    /// Run `call` as one transaction from `caller` in a new block
    pub fn transact<T, F>(&mut self, caller: Address, call: F) -> Result<T, DexError>
    where
        F: FnOnce(&mut DexState, &Router, &CallContext) -> Result<T, DexError>,
    {
        self.transact_with_value(caller, U256::zero(), call)
    }

    /// Like [`Exchange::transact`], with `value` native coin moved from the
    /// caller to the router before `call` runs
    pub fn transact_with_value<T, F>(
        &mut self,
        caller: Address,
        value: U256,
        call: F,
    ) -> Result<T, DexError>
    where
        F: FnOnce(&mut DexState, &Router, &CallContext) -> Result<T, DexError>,
    {
        self.mine_block();
        let ctx = CallContext::new(caller, self.block_number, self.timestamp).with_value(value);
        let snapshot = self.state.clone();

        let result = self.attach_value(&ctx).and_then(|_| call(&mut self.state, &self.router, &ctx));
        if let Err(err) = &result {
            warn!(
                "Transaction from {:?} at block {} reverted: {}",
                caller, ctx.block_number, err
            );
            self.state = snapshot;
        }
        result
    }

    fn attach_value(&mut self, ctx: &CallContext) -> Result<(), DexError> {
        if ctx.value.is_zero() {
            return Ok(());
        }
        self.state
            .tokens
            .transfer_native(ctx.caller, self.router.address(), ctx.value)
    }

    /// Reward token minted so far
    pub fn total_rewards_minted(&self) -> U256 {
        self.state.minter.total_minted()
    }

    pub fn reward_token(&self) -> Address {
        self.state.minter.reward_token()
    }

    pub fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.state.tokens.balance_of(token, owner)
    }
}
