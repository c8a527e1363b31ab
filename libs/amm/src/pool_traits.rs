//! Pool trait definitions for directional quoting

use crate::reserve_pool::ReservePool;
use crate::v2_math::V2Math;
use serde::{Deserialize, Serialize};
use types::{Address, DexError, U256};

/// Unified read-only pool interface used for path quoting
pub trait AmmPool {
    /// Canonical pair `(token0, token1)`
    fn tokens(&self) -> (Address, Address);

    /// Current `(reserve0, reserve1)`
    fn reserves(&self) -> (U256, U256);

    /// Get fee tier
    fn fee_bps(&self) -> u32;

    /// `(reserve_in, reserve_out)` oriented for a trade selling `token_in`
    fn oriented_reserves(&self, token_in: Address) -> Result<(U256, U256), DexError> {
        let (token0, token1) = self.tokens();
        let (reserve0, reserve1) = self.reserves();
        if token_in == token0 {
            Ok((reserve0, reserve1))
        } else if token_in == token1 {
            Ok((reserve1, reserve0))
        } else {
            Err(DexError::invalid_path(format!(
                "token {:?} is not in pool {:?}/{:?}",
                token_in, token0, token1
            )))
        }
    }

    /// Calculate output amount for given input
    fn get_amount_out(&self, token_in: Address, amount_in: U256) -> Result<U256, DexError> {
        let (reserve_in, reserve_out) = self.oriented_reserves(token_in)?;
        V2Math::get_amount_out(amount_in, reserve_in, reserve_out, self.fee_bps())
    }

    /// Calculate required input for desired output
    fn get_amount_in(&self, token_in: Address, amount_out: U256) -> Result<U256, DexError> {
        let (reserve_in, reserve_out) = self.oriented_reserves(token_in)?;
        V2Math::get_amount_in(amount_out, reserve_in, reserve_out, self.fee_bps())
    }
}

impl AmmPool for ReservePool {
    fn tokens(&self) -> (Address, Address) {
        (self.token0(), self.token1())
    }

    fn reserves(&self) -> (U256, U256) {
        let (reserve0, reserve1, _) = ReservePool::reserves(self);
        (reserve0, reserve1)
    }

    fn fee_bps(&self) -> u32 {
        self.params().fee_bps
    }
}

/// Point-in-time copy of a pool's public state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub total_shares: U256,
    pub fee_bps: u32,
    pub block_timestamp_last: u32,
    pub price0_cumulative_last: U256,
    pub price1_cumulative_last: U256,
}

impl PoolSnapshot {
    pub fn capture(pool: &ReservePool) -> Self {
        let (reserve0, reserve1, block_timestamp_last) = pool.reserves();
        let (price0_cumulative_last, price1_cumulative_last) = pool.price_cumulative_last();
        Self {
            address: pool.address(),
            token0: pool.token0(),
            token1: pool.token1(),
            reserve0,
            reserve1,
            total_shares: pool.total_shares(),
            fee_bps: pool.params().fee_bps,
            block_timestamp_last,
            price0_cumulative_last,
            price1_cumulative_last,
        }
    }
}

impl AmmPool for PoolSnapshot {
    fn tokens(&self) -> (Address, Address) {
        (self.token0, self.token1)
    }

    fn reserves(&self) -> (U256, U256) {
        (self.reserve0, self.reserve1)
    }

    fn fee_bps(&self) -> u32 {
        self.fee_bps
    }
}
