//! Accounting checks for E2E tests

use anyhow::{anyhow, Result};
use router::Exchange;
use types::{Address, TokenBank, U256};

/// Every pool holds at least its reserves, keeps its minimum liquidity
/// locked and stays under the reserve cap
pub fn check_pool_accounting(exchange: &Exchange) -> Result<()> {
    let state = exchange.state();
    let cap = (U256::one() << 112) - U256::one();

    for pool in state.registry.pools() {
        let (reserve0, reserve1, _) = pool.reserves();
        let balance0 = state.tokens.balance_of(pool.token0(), pool.address());
        let balance1 = state.tokens.balance_of(pool.token1(), pool.address());
        if balance0 < reserve0 || balance1 < reserve1 {
            return Err(anyhow!(
                "Pool {:?} holds {}/{} below reserves {}/{}",
                pool.address(),
                balance0,
                balance1,
                reserve0,
                reserve1
            ));
        }
        if reserve0 > cap || reserve1 > cap {
            return Err(anyhow!("Pool {:?} reserves exceed 112 bits", pool.address()));
        }

        let locked = pool.share_balance(Address::zero());
        if !pool.total_shares().is_zero() && locked != pool.params().minimum_liquidity {
            return Err(anyhow!(
                "Pool {:?} has {} shares locked, expected {}",
                pool.address(),
                locked,
                pool.params().minimum_liquidity
            ));
        }
    }
    Ok(())
}

/// Each registered pool's total hash rate is the sum over `miners`
pub fn check_hash_rates(exchange: &Exchange, miners: &[Address]) -> Result<()> {
    let mining = &exchange.state().mining;
    for pool in mining.registered_pools() {
        let total = mining
            .pool_info(pool)
            .map(|info| info.total_hash_rate)
            .ok_or_else(|| anyhow!("Registered pool {:?} has no info", pool))?;
        let credited = miners
            .iter()
            .fold(U256::zero(), |acc, miner| acc + mining.user_info(pool, *miner).hash_rate);
        if credited != total {
            return Err(anyhow!(
                "Pool {:?} total hash rate {} but miners hold {}",
                pool,
                total,
                credited
            ));
        }
    }
    Ok(())
}
