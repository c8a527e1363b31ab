//! Hash-Rate Ledger
//!
//! Pools registered here earn a share of a per-block reward emission in
//! proportion to their alloc weight. Inside a pool the emission is split by
//! hash rate: the accumulated swap output volume each trader routed through
//! it. Settlement is lazy; each pool's accumulator catches up to the current
//! block whenever the pool is touched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use types::{math, Address, CallContext, DexError, EmissionSource, TokenBank, U256};

/// Per-pool accrual state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningPool {
    pub pool: Address,
    pub alloc_weight: u64,
    pub last_reward_block: u64,
    /// Reward per unit of hash rate, scaled by the ledger precision
    pub acc_reward_per_share: U256,
    pub total_hash_rate: U256,
}

/// Per-trader state within one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinerInfo {
    pub hash_rate: U256,
    /// Accrual already accounted for: entry debt of each report, rounded
    /// up, plus everything harvested
    pub reward_debt: U256,
}

#[derive(Debug, Clone)]
pub struct HashRateLedger {
    address: Address,
    operator: Address,
    reporter: Option<Address>,
    reward_per_block: U256,
    precision: U256,
    total_alloc_weight: u64,
    pools: Vec<MiningPool>,
    index: HashMap<Address, usize>,
    miners: HashMap<(Address, Address), MinerInfo>,
}

impl HashRateLedger {
    pub fn new(
        address: Address,
        operator: Address,
        reward_per_block: U256,
        precision: U256,
    ) -> Result<Self, DexError> {
        if precision.is_zero() {
            return Err(DexError::invalid_input("reward precision must be positive"));
        }
        Ok(Self {
            address,
            operator,
            reporter: None,
            reward_per_block,
            precision,
            total_alloc_weight: 0,
            pools: Vec::new(),
            index: HashMap::new(),
            miners: HashMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn reporter(&self) -> Option<Address> {
        self.reporter
    }

    pub fn reward_per_block(&self) -> U256 {
        self.reward_per_block
    }

    pub fn precision(&self) -> U256 {
        self.precision
    }

    pub fn total_alloc_weight(&self) -> u64 {
        self.total_alloc_weight
    }

    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    pub fn registered_pools(&self) -> Vec<Address> {
        self.pools.iter().map(|p| p.pool).collect()
    }

    pub fn is_registered(&self, pool: Address) -> bool {
        self.index.contains_key(&pool)
    }

    pub fn pool_info(&self, pool: Address) -> Option<&MiningPool> {
        self.index.get(&pool).map(|&i| &self.pools[i])
    }

    /// Zeroed for traders that never routed volume through `pool`
    pub fn user_info(&self, pool: Address, user: Address) -> MinerInfo {
        self.miners.get(&(pool, user)).copied().unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    fn ensure_operator(&self, ctx: &CallContext) -> Result<(), DexError> {
        if ctx.caller != self.operator {
            return Err(DexError::Unauthorized { caller: ctx.caller });
        }
        Ok(())
    }

    pub fn transfer_operator(
        &mut self,
        ctx: &CallContext,
        operator: Address,
    ) -> Result<(), DexError> {
        self.ensure_operator(ctx)?;
        if operator.is_zero() {
            return Err(DexError::ZeroAddress);
        }
        info!("Mining operator transferred {:?} -> {:?}", self.operator, operator);
        self.operator = operator;
        Ok(())
    }

    /// Authorise the account allowed to report swap volume
    pub fn set_reporter(&mut self, ctx: &CallContext, reporter: Address) -> Result<(), DexError> {
        self.ensure_operator(ctx)?;
        info!("Mining reporter set to {:?}", reporter);
        self.reporter = Some(reporter);
        Ok(())
    }

    pub fn set_reward_per_block(
        &mut self,
        ctx: &CallContext,
        reward_per_block: U256,
    ) -> Result<(), DexError> {
        self.ensure_operator(ctx)?;
        self.mass_update_pools(ctx)?;
        info!(
            "Reward per block changed {} -> {}",
            self.reward_per_block, reward_per_block
        );
        self.reward_per_block = reward_per_block;
        Ok(())
    }

    pub fn register_pool(
        &mut self,
        ctx: &CallContext,
        pool: Address,
        alloc_weight: u64,
    ) -> Result<(), DexError> {
        self.ensure_operator(ctx)?;
        if self.is_registered(pool) {
            return Err(DexError::PoolAlreadyRegistered(pool));
        }
        // Every pool's share changes with the total weight
        self.mass_update_pools(ctx)?;

        self.total_alloc_weight = self
            .total_alloc_weight
            .checked_add(alloc_weight)
            .ok_or(DexError::Overflow)?;
        self.index.insert(pool, self.pools.len());
        self.pools.push(MiningPool {
            pool,
            alloc_weight,
            last_reward_block: ctx.block_number,
            acc_reward_per_share: U256::zero(),
            total_hash_rate: U256::zero(),
        });

        info!(
            "Pool {:?} registered for mining with weight {} (total {})",
            pool, alloc_weight, self.total_alloc_weight
        );
        Ok(())
    }

    pub fn set_alloc_weight(
        &mut self,
        ctx: &CallContext,
        pool: Address,
        alloc_weight: u64,
    ) -> Result<(), DexError> {
        self.ensure_operator(ctx)?;
        let idx = self.position(pool)?;
        self.mass_update_pools(ctx)?;

        let previous = self.pools[idx].alloc_weight;
        self.total_alloc_weight = (self.total_alloc_weight - previous)
            .checked_add(alloc_weight)
            .ok_or(DexError::Overflow)?;
        self.pools[idx].alloc_weight = alloc_weight;

        info!(
            "Pool {:?} weight {} -> {} (total {})",
            pool, previous, alloc_weight, self.total_alloc_weight
        );
        Ok(())
    }

    /// Stop further emission to `pool`; accrued rewards stay harvestable
    pub fn deregister_pool(&mut self, ctx: &CallContext, pool: Address) -> Result<(), DexError> {
        self.set_alloc_weight(ctx, pool, 0)
    }

    fn position(&self, pool: Address) -> Result<usize, DexError> {
        self.index
            .get(&pool)
            .copied()
            .ok_or(DexError::PoolNotRegistered(pool))
    }

    // ---------------------------------------------------------------------
    // Settlement
    // ---------------------------------------------------------------------

    /// `pool` with its accumulator brought up to `block`, without committing
    fn settled(&self, pool: &MiningPool, block: u64) -> Result<MiningPool, DexError> {
        let mut next = pool.clone();
        if block <= pool.last_reward_block {
            return Ok(next);
        }
        next.last_reward_block = block;
        if pool.total_hash_rate.is_zero() || self.total_alloc_weight == 0 {
            // Nothing to split these blocks between; their emission lapses
            return Ok(next);
        }

        let blocks = U256::from(block - pool.last_reward_block);
        let reward = math::mul_div(
            math::mul(blocks, self.reward_per_block)?,
            U256::from(pool.alloc_weight),
            U256::from(self.total_alloc_weight),
        )?;
        let delta = math::mul_div(reward, self.precision, pool.total_hash_rate)?;
        next.acc_reward_per_share = math::add(pool.acc_reward_per_share, delta)?;
        Ok(next)
    }

    fn update_at(&mut self, idx: usize, block: u64) -> Result<(), DexError> {
        let next = self.settled(&self.pools[idx], block)?;
        if next.acc_reward_per_share != self.pools[idx].acc_reward_per_share {
            debug!(
                "Pool {:?} settled to block {}: acc {} -> {}",
                next.pool, block, self.pools[idx].acc_reward_per_share, next.acc_reward_per_share
            );
        }
        self.pools[idx] = next;
        Ok(())
    }

    pub fn update_pool(&mut self, ctx: &CallContext, pool: Address) -> Result<(), DexError> {
        let idx = self.position(pool)?;
        self.update_at(idx, ctx.block_number)
    }

    pub fn mass_update_pools(&mut self, ctx: &CallContext) -> Result<(), DexError> {
        for idx in 0..self.pools.len() {
            self.update_at(idx, ctx.block_number)?;
        }
        Ok(())
    }

    fn accrued(&self, hash_rate: U256, acc: U256) -> Result<U256, DexError> {
        math::mul_div(hash_rate, acc, self.precision)
    }

    // ---------------------------------------------------------------------
    // Volume and rewards
    // ---------------------------------------------------------------------

    /// Credit `volume` of hash rate to `trader` in `pool`.
    ///
    /// Only the authorised reporter may call this. Existing pending reward is
    /// preserved: the new volume enters at the current accumulator value.
    pub fn report_swap_volume(
        &mut self,
        ctx: &CallContext,
        pool: Address,
        trader: Address,
        volume: U256,
    ) -> Result<(), DexError> {
        if self.reporter != Some(ctx.caller) {
            return Err(DexError::Unauthorized { caller: ctx.caller });
        }
        let idx = self.position(pool)?;
        if volume.is_zero() {
            return Ok(());
        }
        self.update_at(idx, ctx.block_number)?;

        let acc = self.pools[idx].acc_reward_per_share;
        let mut miner = self.user_info(pool, trader);
        miner.hash_rate = math::add(miner.hash_rate, volume)?;
        // Rounded up so the pool's payouts stay within its emission
        let entry_debt = math::mul_div_ceil(volume, acc, self.precision)?;
        miner.reward_debt = math::add(miner.reward_debt, entry_debt)?;
        let total = math::add(self.pools[idx].total_hash_rate, volume)?;

        self.pools[idx].total_hash_rate = total;
        self.miners.insert((pool, trader), miner);

        debug!(
            "Hash rate +{} for {:?} in pool {:?} (user {}, pool total {})",
            volume, trader, pool, miner.hash_rate, total
        );
        Ok(())
    }

    /// Reward `user` could harvest from `pool` at the context's block
    pub fn pending_reward(&self, pool: Address, user: Address, block: u64) -> U256 {
        let Some(&idx) = self.index.get(&pool) else {
            return U256::zero();
        };
        let miner = self.user_info(pool, user);
        self.settled(&self.pools[idx], block)
            .and_then(|p| self.accrued(miner.hash_rate, p.acc_reward_per_share))
            .map(|accrued| accrued.saturating_sub(miner.reward_debt))
            .unwrap_or_default()
    }

    /// Pay the caller's pending reward in `pool` to `recipient`.
    ///
    /// The reward is requested from `emission` before anything is committed,
    /// so a refusal leaves the ledger exactly as it was.
    pub fn harvest(
        &mut self,
        ctx: &CallContext,
        tokens: &mut dyn TokenBank,
        emission: &mut dyn EmissionSource,
        pool: Address,
        recipient: Address,
    ) -> Result<U256, DexError> {
        let idx = self.position(pool)?;
        let user = ctx.caller;
        let settled = self.settled(&self.pools[idx], ctx.block_number)?;
        let mut miner = self.user_info(pool, user);
        let accrued = self.accrued(miner.hash_rate, settled.acc_reward_per_share)?;
        let pending = accrued.saturating_sub(miner.reward_debt);

        if !pending.is_zero() {
            emission.request_reward(tokens, recipient, pending)?;
        }

        self.pools[idx] = settled;
        // Debt never drops below what entry rounding already charged
        miner.reward_debt = math::add(miner.reward_debt, pending)?;
        if miner != MinerInfo::default() {
            self.miners.insert((pool, user), miner);
        }

        if !pending.is_zero() {
            info!(
                "Harvested {} from pool {:?} for {:?} -> {:?}",
                pending, pool, user, recipient
            );
        }
        Ok(pending)
    }
}
