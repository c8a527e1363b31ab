//! Trading scenario
//!
//! Deploys a fresh exchange, seeds two pools (token/token and
//! token/native), registers both for hash-rate mining and lets a set of
//! traders swap back and forth for a number of rounds before harvesting.

use amm::{AmmPool, PoolSnapshot, V2Math};
use anyhow::{Context, Result};
use dex_config::ExchangeConfig;
use router::{AddLiquidity, AddLiquidityNative, Exchange, Route};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use types::math::units;
use types::{Address, DexError, TokenBank, TokenMetadata, U256};

const TOKEN_A: u64 = 0x7a01;
const TOKEN_B: u64 = 0x7b01;
const PROVIDER: u64 = 0x4c50;
const TRADER_BASE: u64 = 0x7d_0000;

/// Allocation weights for the two mined pools
const TOKEN_POOL_WEIGHT: u64 = 100;
const NATIVE_POOL_WEIGHT: u64 = 50;

#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    pub traders: usize,
    pub rounds: u64,
    /// Base trade size in whole tokens
    pub trade_size: u64,
    /// Seed liquidity per side in whole tokens
    pub liquidity: u64,
    /// Empty blocks mined before harvesting
    pub idle_blocks: u64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            traders: 3,
            rounds: 20,
            trade_size: 1_000,
            liquidity: 1_000_000,
            idle_blocks: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub symbol0: String,
    pub symbol1: String,
    #[serde(flatten)]
    pub snapshot: PoolSnapshot,
    /// Token1 per token0, decimals applied
    pub spot_price: Option<Decimal>,
    pub alloc_weight: u64,
    pub total_hash_rate: U256,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinerReport {
    pub trader: Address,
    pub pool: Address,
    pub hash_rate: U256,
    pub harvested: U256,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub block_number: u64,
    pub timestamp: u64,
    pub swaps: u64,
    pub reverted: u64,
    pub rewards_minted: U256,
    pub pools: Vec<PoolReport>,
    pub miners: Vec<MinerReport>,
}

pub struct Scenario {
    settings: ScenarioSettings,
    exchange: Exchange,
    provider: Address,
    traders: Vec<Address>,
    token_a: Address,
    token_b: Address,
    swaps: u64,
    reverted: u64,
}

impl Scenario {
    /// Deploy the exchange and fund every participant
    pub fn deploy(config: &ExchangeConfig, settings: ScenarioSettings) -> Result<Self> {
        let mut exchange = Exchange::new(config).context("Failed to deploy exchange")?;
        let router = exchange.router().address();
        let wrapped = exchange.router().wrapped_native().address();
        let token_a = Address::from_low_u64_be(TOKEN_A);
        let token_b = Address::from_low_u64_be(TOKEN_B);
        let provider = Address::from_low_u64_be(PROVIDER);
        let traders: Vec<Address> = (0..settings.traders as u64)
            .map(|i| Address::from_low_u64_be(TRADER_BASE + i))
            .collect();

        let tokens = &mut exchange.state_mut().tokens;
        tokens.create_token(token_a, TokenMetadata::new("TKA", 18));
        tokens.create_token(token_b, TokenMetadata::new("TKB", 18));

        let seed = units(settings.liquidity, 18);
        let float = units(settings.trade_size, 18) * U256::from(10 * settings.rounds.max(1));
        for (account, amount) in std::iter::once((provider, seed * 2))
            .chain(traders.iter().map(|t| (*t, float)))
        {
            for token in [token_a, token_b] {
                tokens.mint(token, account, amount)?;
                tokens.approve(token, account, router, U256::MAX)?;
            }
            tokens.approve(wrapped, account, router, U256::MAX)?;
            tokens.fund_native(account, amount)?;
        }

        info!(
            "Scenario deployed: {} traders, {} rounds, base trade {} tokens",
            traders.len(),
            settings.rounds,
            settings.trade_size
        );
        Ok(Self {
            settings,
            exchange,
            provider,
            traders,
            token_a,
            token_b,
            swaps: 0,
            reverted: 0,
        })
    }

    fn wrapped(&self) -> Address {
        self.exchange.router().wrapped_native().address()
    }

    fn seed_liquidity(&mut self) -> Result<()> {
        let seed = units(self.settings.liquidity, 18);
        let request = AddLiquidity {
            token_a: self.token_a,
            token_b: self.token_b,
            amount_a_desired: seed,
            amount_b_desired: seed,
            amount_a_min: seed,
            amount_b_min: seed,
            to: self.provider,
            deadline: u64::MAX,
        };
        self.exchange
            .transact(self.provider, |state, router, ctx| {
                router.add_liquidity(&mut state.venue(), ctx, &request)
            })
            .context("Failed to seed token pool")?;

        // One native coin per hundred tokens
        let native = seed / U256::from(100u64);
        let request = AddLiquidityNative {
            token: self.token_a,
            amount_token_desired: seed,
            amount_token_min: seed,
            amount_native_min: native,
            to: self.provider,
            deadline: u64::MAX,
        };
        self.exchange
            .transact_with_value(self.provider, native, |state, router, ctx| {
                router.add_liquidity_native(&mut state.venue(), ctx, &request)
            })
            .context("Failed to seed native pool")?;
        Ok(())
    }

    fn pool(&self, token_a: Address, token_b: Address) -> Result<Address> {
        self.exchange
            .state()
            .registry
            .get_pool(token_a, token_b)
            .ok_or(DexError::PoolNotFound { token_a, token_b })
            .map_err(Into::into)
    }

    fn register_pools(&mut self) -> Result<()> {
        let token_pool = self.pool(self.token_a, self.token_b)?;
        let native_pool = self.pool(self.token_a, self.wrapped())?;
        let operator = self.exchange.operator();
        self.exchange
            .transact(operator, |state, _, ctx| {
                state.mining.register_pool(ctx, token_pool, TOKEN_POOL_WEIGHT)?;
                state.mining.register_pool(ctx, native_pool, NATIVE_POOL_WEIGHT)
            })
            .context("Failed to register pools for mining")?;
        Ok(())
    }

    fn record(&mut self, result: Result<Vec<U256>, DexError>) {
        match result {
            Ok(amounts) => {
                self.swaps += 1;
                debug!("Swap filled: {:?}", amounts);
            }
            Err(err) => {
                self.reverted += 1;
                warn!("Swap reverted: {}", err);
            }
        }
    }

    fn trade_round(&mut self, round: u64) {
        for (i, trader) in self.traders.clone().into_iter().enumerate() {
            let step = round + i as u64;
            let path = if step % 2 == 0 {
                vec![self.token_a, self.token_b]
            } else {
                vec![self.token_b, self.token_a]
            };
            let amount_in = units(self.settings.trade_size * (1 + step % 3), 18);

            // Accept 1% below the current quote
            let quoted = self
                .exchange
                .router()
                .get_amounts_out(&self.exchange.state().registry, amount_in, &path)
                .map(|amounts| amounts[amounts.len() - 1])
                .unwrap_or_default();
            let amount_out_min = quoted * U256::from(99u64) / U256::from(100u64);

            let route = Route::new(path, trader, u64::MAX);
            let result = self.exchange.transact(trader, |state, router, ctx| {
                router.swap_exact_tokens_for_tokens(
                    &mut state.venue(),
                    ctx,
                    amount_in,
                    amount_out_min,
                    &route,
                )
            });
            self.record(result);
        }

        if round % 3 == 0 {
            if let Some(&trader) = self.traders.first() {
                let route = Route::new(vec![self.wrapped(), self.token_a], trader, u64::MAX);
                let value = units(self.settings.trade_size, 18) / U256::from(100u64);
                let result = self
                    .exchange
                    .transact_with_value(trader, value, |state, router, ctx| {
                        router.swap_exact_native_for_tokens(&mut state.venue(), ctx, U256::zero(), &route)
                    });
                self.record(result);
            }
        }
    }

    fn harvest_all(&mut self) -> Result<Vec<MinerReport>> {
        let pools = self.exchange.state().mining.registered_pools();
        let mut miners = Vec::new();
        for pool in pools {
            for trader in self.traders.clone() {
                let hash_rate = self.exchange.state().mining.user_info(pool, trader).hash_rate;
                if hash_rate.is_zero() {
                    continue;
                }
                let harvested = self
                    .exchange
                    .transact(trader, |state, _, ctx| state.harvest(ctx, pool, ctx.caller))
                    .with_context(|| format!("Harvest failed for {:?} in {:?}", trader, pool))?;
                miners.push(MinerReport {
                    trader,
                    pool,
                    hash_rate,
                    harvested,
                });
            }
        }
        Ok(miners)
    }

    fn pool_reports(&self) -> Vec<PoolReport> {
        let state = self.exchange.state();
        let symbol = |token: Address| {
            state
                .tokens
                .metadata(token)
                .map(|m| m.symbol.clone())
                .unwrap_or_else(|| format!("{:?}", token))
        };
        let decimals = |token: Address| state.tokens.metadata(token).map_or(18, |m| m.decimals);

        state
            .registry
            .pools()
            .map(|pool| {
                let snapshot = PoolSnapshot::capture(pool);
                let (token0, token1) = pool.tokens();
                let mining = state.mining.pool_info(snapshot.address);
                PoolReport {
                    symbol0: symbol(token0),
                    symbol1: symbol(token1),
                    spot_price: V2Math::spot_price(
                        snapshot.reserve0,
                        snapshot.reserve1,
                        decimals(token0),
                        decimals(token1),
                    ),
                    alloc_weight: mining.map_or(0, |m| m.alloc_weight),
                    total_hash_rate: mining.map_or_else(U256::zero, |m| m.total_hash_rate),
                    snapshot,
                }
            })
            .collect()
    }

    /// Play the whole scenario and summarise the final state
    pub fn run(mut self) -> Result<ScenarioReport> {
        self.seed_liquidity()?;
        self.register_pools()?;

        for round in 0..self.settings.rounds {
            self.trade_round(round);
        }
        self.exchange.mine_blocks(self.settings.idle_blocks);
        let miners = self.harvest_all()?;

        info!(
            "Scenario finished at block {}: {} swaps, {} reverted, {} reward minted",
            self.exchange.block_number(),
            self.swaps,
            self.reverted,
            self.exchange.total_rewards_minted()
        );
        Ok(ScenarioReport {
            block_number: self.exchange.block_number(),
            timestamp: self.exchange.timestamp(),
            swaps: self.swaps,
            reverted: self.reverted,
            rewards_minted: self.exchange.total_rewards_minted(),
            pools: self.pool_reports(),
            miners,
        })
    }
}
