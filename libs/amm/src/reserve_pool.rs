//! Reserve Pool
//!
//! Holds the two reserves of a canonical token pair and the LP-share ledger.
//! Reserves only change through [`ReservePool::mint`], [`ReservePool::burn`],
//! [`ReservePool::swap`] and [`ReservePool::sync`]; every one of them
//! settles against the pool's actual token balances rather than declared
//! amounts, so fee-on-transfer tokens are never over-credited.
//!
//! The high-level entry points ([`ReservePool::provide_liquidity`],
//! [`ReservePool::remove_liquidity`], [`ReservePool::swap_exact_in`]) move
//! the caller's tokens in and then run the matching primitive.

use crate::v2_math::V2Math;
use dex_config::{AmmSettings, FEE_DENOMINATOR, RESERVE_BITS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use types::{math, pull, Address, CallContext, DexError, Side, TokenBank, U256};

/// Per-pool protocol parameters, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub fee_bps: u32,
    pub minimum_liquidity: U256,
}

impl PoolParams {
    pub fn new(fee_bps: u32, minimum_liquidity: U256) -> Result<Self, DexError> {
        if fee_bps >= FEE_DENOMINATOR {
            return Err(DexError::invalid_input(format!(
                "fee_bps {} must be below {}",
                fee_bps, FEE_DENOMINATOR
            )));
        }
        Ok(Self {
            fee_bps,
            minimum_liquidity,
        })
    }

    pub fn from_settings(settings: &AmmSettings) -> Result<Self, DexError> {
        Self::new(settings.fee_bps, U256::from(settings.minimum_liquidity))
    }
}

impl Default for PoolParams {
    fn default() -> Self {
        let settings = AmmSettings::default();
        Self {
            fee_bps: settings.fee_bps,
            minimum_liquidity: U256::from(settings.minimum_liquidity),
        }
    }
}

/// Amounts for [`ReservePool::provide_liquidity`], in token0/token1 order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepositRequest {
    pub amount0_desired: U256,
    pub amount1_desired: U256,
    pub amount0_min: U256,
    pub amount1_min: U256,
}

/// What a deposit actually took and minted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    pub amount0: U256,
    pub amount1: U256,
    pub shares: U256,
}

/// Flash-swap hook, invoked after the outputs left the pool and before the
/// invariant is checked. The pool is still locked while the hook runs.
pub trait SwapCallee {
    fn on_swap(
        &mut self,
        pool: &mut ReservePool,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        amount0_out: U256,
        amount1_out: U256,
    ) -> Result<(), DexError>;
}

/// Constant-product pool for one canonical token pair
#[derive(Debug, Clone)]
pub struct ReservePool {
    address: Address,
    registry: Address,
    token0: Address,
    token1: Address,
    params: PoolParams,

    reserve0: U256,
    reserve1: U256,
    block_timestamp_last: u32,
    price0_cumulative_last: U256,
    price1_cumulative_last: U256,
    /// reserve0 * reserve1 after the last liquidity event, while the protocol fee is on
    k_last: U256,

    total_shares: U256,
    shares: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,

    locked: bool,
}

impl ReservePool {
    /// Only the registry creates pools; token0 < token1 is its invariant
    pub(crate) fn new(
        address: Address,
        registry: Address,
        token0: Address,
        token1: Address,
        params: PoolParams,
    ) -> Self {
        debug_assert!(token0 < token1);
        Self {
            address,
            registry,
            token0,
            token1,
            params,
            reserve0: U256::zero(),
            reserve1: U256::zero(),
            block_timestamp_last: 0,
            price0_cumulative_last: U256::zero(),
            price1_cumulative_last: U256::zero(),
            k_last: U256::zero(),
            total_shares: U256::zero(),
            shares: HashMap::new(),
            allowances: HashMap::new(),
            locked: false,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn registry(&self) -> Address {
        self.registry
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    pub fn params(&self) -> PoolParams {
        self.params
    }

    /// `(reserve0, reserve1, block_timestamp_last)`
    pub fn reserves(&self) -> (U256, U256, u32) {
        (self.reserve0, self.reserve1, self.block_timestamp_last)
    }

    pub fn price_cumulative_last(&self) -> (U256, U256) {
        (self.price0_cumulative_last, self.price1_cumulative_last)
    }

    pub fn k_last(&self) -> U256 {
        self.k_last
    }

    pub fn total_shares(&self) -> U256 {
        self.total_shares
    }

    pub fn share_balance(&self, holder: Address) -> U256 {
        self.shares.get(&holder).copied().unwrap_or_default()
    }

    pub fn share_allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    // ---------------------------------------------------------------------
    // LP shares
    // ---------------------------------------------------------------------

    pub fn approve_shares(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn transfer_shares(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        self.burn_shares(from, amount)?;
        self.mint_shares(to, amount)
    }

    pub fn transfer_shares_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        let available = self.share_allowance(from, spender);
        if available < amount {
            return Err(DexError::InsufficientAllowance {
                token: self.address,
                owner: from,
                spender,
                needed: amount,
                available,
            });
        }
        self.transfer_shares(from, to, amount)?;
        if available != U256::MAX {
            self.allowances.insert((from, spender), available - amount);
        }
        Ok(())
    }

    fn mint_shares(&mut self, to: Address, amount: U256) -> Result<(), DexError> {
        self.total_shares = math::add(self.total_shares, amount)?;
        let balance = math::add(self.share_balance(to), amount)?;
        self.shares.insert(to, balance);
        Ok(())
    }

    fn burn_shares(&mut self, from: Address, amount: U256) -> Result<(), DexError> {
        let available = self.share_balance(from);
        if available < amount {
            return Err(DexError::InsufficientBalance {
                token: self.address,
                owner: from,
                needed: amount,
                available,
            });
        }
        self.shares.insert(from, available - amount);
        self.total_shares = math::sub(self.total_shares, amount)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Primitives
    // ---------------------------------------------------------------------

    fn enter(&mut self) -> Result<(), DexError> {
        if self.locked {
            return Err(DexError::Locked(self.address));
        }
        self.locked = true;
        Ok(())
    }

    fn exit(&mut self) {
        self.locked = false;
    }

    fn balances(&self, tokens: &dyn TokenBank) -> (U256, U256) {
        (
            tokens.balance_of(self.token0, self.address),
            tokens.balance_of(self.token1, self.address),
        )
    }

    /// Mint LP shares to `to` for the tokens sent in since the last update
    pub fn mint(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        to: Address,
        fee_to: Option<Address>,
    ) -> Result<U256, DexError> {
        self.enter()?;
        let result = self.mint_locked(tokens, ctx, to, fee_to);
        self.exit();
        result
    }

    fn mint_locked(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        to: Address,
        fee_to: Option<Address>,
    ) -> Result<U256, DexError> {
        let (reserve0, reserve1) = (self.reserve0, self.reserve1);
        let (balance0, balance1) = self.balances(tokens);
        let amount0 = math::sub(balance0, reserve0)?;
        let amount1 = math::sub(balance1, reserve1)?;

        let fee_on = self.mint_protocol_fee(fee_to)?;
        let liquidity = if self.total_shares.is_zero() {
            let shares =
                V2Math::initial_shares(amount0, amount1, self.params.minimum_liquidity)?;
            if !self.params.minimum_liquidity.is_zero() {
                // Permanently locked so the share price can never be reset
                self.mint_shares(Address::zero(), self.params.minimum_liquidity)?;
            }
            shares
        } else {
            V2Math::proportional_shares(
                (amount0, amount1),
                (reserve0, reserve1),
                self.total_shares,
            )?
        };

        if liquidity.is_zero() {
            return Err(DexError::InsufficientLiquidityMinted);
        }
        self.mint_shares(to, liquidity)?;

        self.update(balance0, balance1, ctx.timestamp)?;
        if fee_on {
            self.k_last = math::mul(self.reserve0, self.reserve1)?;
        }

        debug!(
            "Pool {:?} mint: amount0={} amount1={} shares={} to={:?}",
            self.address, amount0, amount1, liquidity, to
        );
        Ok(liquidity)
    }

    /// Burn the shares the pool holds and pay out the pro-rata reserves
    pub fn burn(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        to: Address,
        fee_to: Option<Address>,
    ) -> Result<(U256, U256), DexError> {
        self.enter()?;
        let result = self.burn_locked(tokens, ctx, to, fee_to);
        self.exit();
        result
    }

    fn burn_locked(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        to: Address,
        fee_to: Option<Address>,
    ) -> Result<(U256, U256), DexError> {
        let (balance0, balance1) = self.balances(tokens);
        let liquidity = self.share_balance(self.address);

        let fee_on = self.mint_protocol_fee(fee_to)?;
        let total = self.total_shares;
        if total.is_zero() {
            return Err(DexError::InsufficientLiquidityBurned);
        }

        let amount0 = math::mul_div(liquidity, balance0, total)?;
        let amount1 = math::mul_div(liquidity, balance1, total)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(DexError::InsufficientLiquidityBurned);
        }

        self.burn_shares(self.address, liquidity)?;
        tokens.transfer(self.token0, self.address, to, amount0)?;
        tokens.transfer(self.token1, self.address, to, amount1)?;

        let (balance0, balance1) = self.balances(tokens);
        self.update(balance0, balance1, ctx.timestamp)?;
        if fee_on {
            self.k_last = math::mul(self.reserve0, self.reserve1)?;
        }

        debug!(
            "Pool {:?} burn: shares={} amount0={} amount1={} to={:?}",
            self.address, liquidity, amount0, amount1, to
        );
        Ok((amount0, amount1))
    }

    /// Send out the requested amounts, then require enough input to have
    /// arrived that the fee-adjusted product does not decrease.
    pub fn swap(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        callee: Option<&mut dyn SwapCallee>,
    ) -> Result<(), DexError> {
        self.enter()?;
        let result = self.swap_locked(tokens, ctx, amount0_out, amount1_out, to, callee);
        self.exit();
        result
    }

    fn swap_locked(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        callee: Option<&mut dyn SwapCallee>,
    ) -> Result<(), DexError> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(DexError::InsufficientOutputAmount {
                amount_out: U256::zero(),
                amount_out_min: U256::one(),
            });
        }
        let (reserve0, reserve1) = (self.reserve0, self.reserve1);
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(DexError::InsufficientLiquidity);
        }
        if to == self.token0 || to == self.token1 {
            return Err(DexError::InvalidTo(to));
        }

        // Optimistic transfer
        if !amount0_out.is_zero() {
            tokens.transfer(self.token0, self.address, to, amount0_out)?;
        }
        if !amount1_out.is_zero() {
            tokens.transfer(self.token1, self.address, to, amount1_out)?;
        }
        if let Some(callee) = callee {
            callee.on_swap(self, tokens, ctx, amount0_out, amount1_out)?;
        }

        let (balance0, balance1) = self.balances(tokens);
        let amount0_in = Self::amount_in(balance0, reserve0, amount0_out);
        let amount1_in = Self::amount_in(balance1, reserve1, amount1_out);
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }

        let denominator = U256::from(FEE_DENOMINATOR);
        let fee = U256::from(self.params.fee_bps);
        let adjusted0 = math::sub(math::mul(balance0, denominator)?, math::mul(amount0_in, fee)?)?;
        let adjusted1 = math::sub(math::mul(balance1, denominator)?, math::mul(amount1_in, fee)?)?;
        let k_after = math::mul(adjusted0, adjusted1)?;
        let k_before = math::mul(
            math::mul(reserve0, reserve1)?,
            math::mul(denominator, denominator)?,
        )?;
        if k_after < k_before {
            return Err(DexError::InvariantViolated);
        }

        self.update(balance0, balance1, ctx.timestamp)?;
        debug!(
            "Pool {:?} swap: in=({}, {}) out=({}, {}) to={:?}",
            self.address, amount0_in, amount1_in, amount0_out, amount1_out, to
        );
        Ok(())
    }

    fn amount_in(balance: U256, reserve: U256, amount_out: U256) -> U256 {
        let floor = reserve - amount_out;
        if balance > floor {
            balance - floor
        } else {
            U256::zero()
        }
    }

    /// Pay out any balance above the reserves
    pub fn skim(&mut self, tokens: &mut dyn TokenBank, to: Address) -> Result<(), DexError> {
        self.enter()?;
        let result = self.skim_locked(tokens, to);
        self.exit();
        result
    }

    fn skim_locked(&mut self, tokens: &mut dyn TokenBank, to: Address) -> Result<(), DexError> {
        let (balance0, balance1) = self.balances(tokens);
        let excess0 = math::sub(balance0, self.reserve0)?;
        let excess1 = math::sub(balance1, self.reserve1)?;
        if !excess0.is_zero() {
            tokens.transfer(self.token0, self.address, to, excess0)?;
        }
        if !excess1.is_zero() {
            tokens.transfer(self.token1, self.address, to, excess1)?;
        }
        Ok(())
    }

    /// Force reserves to match balances
    pub fn sync(&mut self, tokens: &dyn TokenBank, ctx: &CallContext) -> Result<(), DexError> {
        self.enter()?;
        let (balance0, balance1) = self.balances(tokens);
        let result = self.update(balance0, balance1, ctx.timestamp);
        self.exit();
        result
    }

    fn update(&mut self, balance0: U256, balance1: U256, timestamp: u64) -> Result<(), DexError> {
        let cap = (U256::one() << RESERVE_BITS) - U256::one();
        if balance0 > cap || balance1 > cap {
            return Err(DexError::Overflow);
        }

        // Accumulators use a 32-bit clock and are meant to wrap
        let now = (timestamp % (1u64 << 32)) as u32;
        let elapsed = now.wrapping_sub(self.block_timestamp_last);
        if elapsed > 0 && !self.reserve0.is_zero() && !self.reserve1.is_zero() {
            let elapsed = U256::from(elapsed);
            let price0 = (self.reserve1 << RESERVE_BITS) / self.reserve0;
            let price1 = (self.reserve0 << RESERVE_BITS) / self.reserve1;
            self.price0_cumulative_last = self
                .price0_cumulative_last
                .overflowing_add(price0 * elapsed)
                .0;
            self.price1_cumulative_last = self
                .price1_cumulative_last
                .overflowing_add(price1 * elapsed)
                .0;
        }

        self.reserve0 = balance0;
        self.reserve1 = balance1;
        self.block_timestamp_last = now;
        Ok(())
    }

    fn mint_protocol_fee(&mut self, fee_to: Option<Address>) -> Result<bool, DexError> {
        match fee_to {
            Some(fee_to) => {
                if !self.k_last.is_zero() {
                    let root_k = math::sqrt(math::mul(self.reserve0, self.reserve1)?);
                    let root_k_last = math::sqrt(self.k_last);
                    let shares =
                        V2Math::protocol_fee_shares(self.total_shares, root_k, root_k_last)?;
                    if !shares.is_zero() {
                        debug!("Pool {:?} protocol fee: {} shares", self.address, shares);
                        self.mint_shares(fee_to, shares)?;
                    }
                }
                Ok(true)
            }
            None => {
                self.k_last = U256::zero();
                Ok(false)
            }
        }
    }

    // ---------------------------------------------------------------------
    // High-level entry points
    // ---------------------------------------------------------------------

    /// Deposit at the pool's ratio and mint shares to `to`.
    ///
    /// Only the optimal amounts are pulled from `payer`; the unused part of
    /// the larger side never leaves the payer. The caller in `ctx` acts as
    /// the spender of `payer`'s allowance unless it is the payer itself.
    pub fn provide_liquidity(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        payer: Address,
        request: DepositRequest,
        to: Address,
        fee_to: Option<Address>,
    ) -> Result<LiquidityReceipt, DexError> {
        let (amount0, amount1) = V2Math::optimal_deposit(
            (request.amount0_desired, request.amount1_desired),
            (request.amount0_min, request.amount1_min),
            (self.reserve0, self.reserve1),
        )?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(DexError::invalid_input("deposit amounts must be positive"));
        }

        pull(tokens, self.token0, ctx.caller, payer, self.address, amount0)?;
        pull(tokens, self.token1, ctx.caller, payer, self.address, amount1)?;
        let shares = self.mint(tokens, ctx, to, fee_to)?;

        Ok(LiquidityReceipt {
            amount0,
            amount1,
            shares,
        })
    }

    /// Redeem `shares` owned by `owner` and send the reserves to `to`
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        owner: Address,
        shares: U256,
        amount0_min: U256,
        amount1_min: U256,
        to: Address,
        fee_to: Option<Address>,
    ) -> Result<(U256, U256), DexError> {
        if shares.is_zero() {
            return Err(DexError::InsufficientLiquidityBurned);
        }
        let pool = self.address;
        if owner == ctx.caller {
            self.transfer_shares(owner, pool, shares)?;
        } else {
            self.transfer_shares_from(ctx.caller, owner, pool, shares)?;
        }

        let (amount0, amount1) = self.burn(tokens, ctx, to, fee_to)?;
        if amount0 < amount0_min {
            return Err(DexError::InsufficientOutput {
                side: Side::A,
                amount: amount0,
                minimum: amount0_min,
            });
        }
        if amount1 < amount1_min {
            return Err(DexError::InsufficientOutput {
                side: Side::B,
                amount: amount1,
                minimum: amount1_min,
            });
        }
        Ok((amount0, amount1))
    }

    /// Swap an exact input from `payer` and send the output to `to`.
    ///
    /// The output is priced on what actually arrived, not on `amount_in`.
    pub fn swap_exact_in(
        &mut self,
        tokens: &mut dyn TokenBank,
        ctx: &CallContext,
        payer: Address,
        amount_in: U256,
        input_is_token0: bool,
        to: Address,
    ) -> Result<U256, DexError> {
        if amount_in.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }
        let (token_in, reserve_in, reserve_out) = if input_is_token0 {
            (self.token0, self.reserve0, self.reserve1)
        } else {
            (self.token1, self.reserve1, self.reserve0)
        };
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }

        pull(tokens, token_in, ctx.caller, payer, self.address, amount_in)?;
        let received = math::sub(tokens.balance_of(token_in, self.address), reserve_in)?;
        let amount_out =
            V2Math::get_amount_out(received, reserve_in, reserve_out, self.params.fee_bps)?;
        if amount_out.is_zero() {
            return Err(DexError::InsufficientOutputAmount {
                amount_out,
                amount_out_min: U256::one(),
            });
        }

        let (amount0_out, amount1_out) = if input_is_token0 {
            (U256::zero(), amount_out)
        } else {
            (amount_out, U256::zero())
        };
        self.swap(tokens, ctx, amount0_out, amount1_out, to, None)?;
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::math::units;
    use types::{InMemoryTokenBank, TokenMetadata};

    const POOL: u64 = 0x9001;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn token0() -> Address {
        addr(0x10)
    }

    fn token1() -> Address {
        addr(0x11)
    }

    fn ctx(caller: Address) -> CallContext {
        CallContext::new(caller, 1, 1_000)
    }

    fn setup() -> (ReservePool, InMemoryTokenBank) {
        let mut bank = InMemoryTokenBank::new();
        bank.create_token(token0(), TokenMetadata::new("TK0", 18));
        bank.create_token(token1(), TokenMetadata::new("TK1", 18));
        for user in 1..=4 {
            bank.mint(token0(), addr(user), units(5_000_000, 18)).unwrap();
            bank.mint(token1(), addr(user), units(5_000_000, 18)).unwrap();
        }
        let pool = ReservePool::new(addr(POOL), addr(0xfac), token0(), token1(), PoolParams::default());
        (pool, bank)
    }

    fn deposit(amount0: U256, amount1: U256) -> DepositRequest {
        DepositRequest {
            amount0_desired: amount0,
            amount1_desired: amount1,
            ..Default::default()
        }
    }

    fn seeded() -> (ReservePool, InMemoryTokenBank) {
        let (mut pool, mut bank) = setup();
        pool.provide_liquidity(
            &mut bank,
            &ctx(addr(1)),
            addr(1),
            deposit(units(1_000_000, 18), units(1_000_000, 18)),
            addr(1),
            None,
        )
        .unwrap();
        (pool, bank)
    }

    #[test]
    fn test_first_deposit_locks_minimum_liquidity() {
        let (pool, _) = seeded();
        assert_eq!(
            pool.share_balance(addr(1)),
            U256::from_dec_str("999999999999999999999000").unwrap()
        );
        assert_eq!(pool.share_balance(Address::zero()), U256::from(1_000u64));
        assert_eq!(pool.total_shares(), units(1_000_000, 18));
    }

    #[test]
    fn test_views_before_liquidity_read_zero() {
        let (pool, _) = setup();
        assert_eq!(pool.reserves(), (U256::zero(), U256::zero(), 0));
        assert!(pool.total_shares().is_zero());
        assert!(pool.share_balance(addr(1)).is_zero());
    }

    #[test]
    fn test_second_deposit_is_proportional_and_keeps_excess() {
        let (mut pool, mut bank) = seeded();
        let before = bank.balance_of(token1(), addr(2));

        let receipt = pool
            .provide_liquidity(
                &mut bank,
                &ctx(addr(2)),
                addr(2),
                deposit(units(100_000, 18), units(300_000, 18)),
                addr(2),
                None,
            )
            .unwrap();

        assert_eq!(receipt.amount0, units(100_000, 18));
        assert_eq!(receipt.amount1, units(100_000, 18));
        assert_eq!(receipt.shares, units(100_000, 18));
        assert_eq!(before - bank.balance_of(token1(), addr(2)), units(100_000, 18));
    }

    #[test]
    fn test_swap_exact_in_matches_reference_and_grows_k() {
        let (mut pool, mut bank) = seeded();
        let (r0, r1, _) = pool.reserves();

        let out = pool
            .swap_exact_in(&mut bank, &ctx(addr(3)), addr(3), units(100_000, 18), true, addr(3))
            .unwrap();

        assert_eq!(out, U256::from_dec_str("90661089388014913158134").unwrap());
        let (a0, a1, _) = pool.reserves();
        assert!(a0 * a1 >= r0 * r1);
        assert_eq!(bank.balance_of(token1(), addr(3)), units(5_000_000, 18) + out);
    }

    #[test]
    fn test_swap_rejects_zero_output_and_bad_recipient() {
        let (mut pool, mut bank) = seeded();
        assert!(matches!(
            pool.swap(&mut bank, &ctx(addr(3)), U256::zero(), U256::zero(), addr(3), None),
            Err(DexError::InsufficientOutputAmount { .. })
        ));
        assert_eq!(
            pool.swap(&mut bank, &ctx(addr(3)), U256::one(), U256::zero(), token0(), None),
            Err(DexError::InvalidTo(token0()))
        );
        assert!(!pool.is_locked());
    }

    #[test]
    fn test_swap_without_input_violates_invariant() {
        let (mut pool, mut bank) = seeded();
        // Pay slightly less than the quoted input
        let needed = V2Math::get_amount_in(units(1_000, 18), units(1_000_000, 18), units(1_000_000, 18), 30)
            .unwrap();
        bank.transfer(token0(), addr(3), addr(POOL), needed - U256::from(10u64))
            .unwrap();
        assert_eq!(
            pool.swap(&mut bank, &ctx(addr(3)), U256::zero(), units(1_000, 18), addr(3), None),
            Err(DexError::InvariantViolated)
        );
    }

    #[test]
    fn test_swap_on_empty_pool_is_insufficient_liquidity() {
        let (mut pool, mut bank) = setup();
        assert_eq!(
            pool.swap_exact_in(&mut bank, &ctx(addr(3)), addr(3), units(1, 18), true, addr(3)),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_remove_everything_leaves_locked_remainder() {
        let (mut pool, mut bank) = seeded();
        let shares = pool.share_balance(addr(1));

        let (a0, a1) = pool
            .remove_liquidity(
                &mut bank,
                &ctx(addr(1)),
                addr(1),
                shares,
                U256::zero(),
                U256::zero(),
                addr(1),
                None,
            )
            .unwrap();

        assert_eq!(a0, units(1_000_000, 18) - U256::from(1_000u64));
        assert_eq!(a1, units(1_000_000, 18) - U256::from(1_000u64));
        assert!(pool.share_balance(addr(1)).is_zero());
        assert_eq!(pool.reserves().0, U256::from(1_000u64));
        assert_eq!(pool.total_shares(), U256::from(1_000u64));
    }

    #[test]
    fn test_remove_without_locked_minimum_empties_pool() {
        let (_, mut bank) = setup();
        let params = PoolParams::new(30, U256::zero()).unwrap();
        let mut pool = ReservePool::new(addr(POOL), addr(0xfac), token0(), token1(), params);
        let receipt = pool
            .provide_liquidity(
                &mut bank,
                &ctx(addr(1)),
                addr(1),
                deposit(units(10, 18), units(40, 18)),
                addr(1),
                None,
            )
            .unwrap();

        pool.remove_liquidity(
            &mut bank,
            &ctx(addr(1)),
            addr(1),
            receipt.shares,
            U256::zero(),
            U256::zero(),
            addr(1),
            None,
        )
        .unwrap();

        let (r0, r1, _) = pool.reserves();
        assert!(r0.is_zero() && r1.is_zero());
        assert!(pool.total_shares().is_zero());
    }

    #[test]
    fn test_remove_enforces_minimums() {
        let (mut pool, mut bank) = seeded();
        let err = pool
            .remove_liquidity(
                &mut bank,
                &ctx(addr(1)),
                addr(1),
                units(1, 18),
                units(2, 18),
                U256::zero(),
                addr(1),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DexError::InsufficientOutput { side: Side::A, .. }));
    }

    #[test]
    fn test_remove_on_behalf_needs_share_allowance() {
        let (mut pool, mut bank) = seeded();
        let router = addr(0x7e0);
        let err = pool
            .remove_liquidity(
                &mut bank,
                &ctx(router),
                addr(1),
                units(1, 18),
                U256::zero(),
                U256::zero(),
                addr(1),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DexError::InsufficientAllowance { .. }));

        pool.approve_shares(addr(1), router, units(1, 18));
        pool.remove_liquidity(
            &mut bank,
            &ctx(router),
            addr(1),
            units(1, 18),
            U256::zero(),
            U256::zero(),
            addr(1),
            None,
        )
        .unwrap();
        assert!(pool.share_allowance(addr(1), router).is_zero());
    }

    #[test]
    fn test_fee_on_transfer_input_is_priced_on_arrival() {
        let (pool, mut bank) = seeded();
        let taxed = addr(0x12);
        bank.create_token(taxed, TokenMetadata::new("TAX", 18).with_transfer_fee(100));
        bank.mint(taxed, addr(1), units(2_000_000, 18)).unwrap();
        let mut taxed_pool =
            ReservePool::new(addr(0x9002), addr(0xfac), token0(), taxed, PoolParams::default());
        taxed_pool
            .provide_liquidity(
                &mut bank,
                &ctx(addr(1)),
                addr(1),
                deposit(units(1_000_000, 18), units(1_000_000, 18)),
                addr(1),
                None,
            )
            .unwrap();

        // Reserves are what arrived after the 1% tax
        let (_, r1, _) = taxed_pool.reserves();
        assert_eq!(r1, units(990_000, 18));

        bank.transfer(taxed, addr(1), addr(3), units(10_000, 18)).unwrap();
        let arrived = units(9_900, 18) * U256::from(99u64) / U256::from(100u64);
        let expected = V2Math::get_amount_out(arrived, r1, units(1_000_000, 18), 30).unwrap();
        let out = taxed_pool
            .swap_exact_in(&mut bank, &ctx(addr(3)), addr(3), units(9_900, 18), false, addr(3))
            .unwrap();
        assert_eq!(out, expected);

        // The untaxed pool is untouched
        assert_eq!(pool.reserves().0, units(1_000_000, 18));
    }

    struct Borrower {
        repay: U256,
        reenter: bool,
        observed_lock: Option<DexError>,
    }

    impl SwapCallee for Borrower {
        fn on_swap(
            &mut self,
            pool: &mut ReservePool,
            tokens: &mut dyn TokenBank,
            ctx: &CallContext,
            _amount0_out: U256,
            _amount1_out: U256,
        ) -> Result<(), DexError> {
            if self.reenter {
                self.observed_lock = pool.sync(tokens, ctx).err();
            }
            tokens.transfer(pool.token0(), ctx.caller, pool.address(), self.repay)
        }
    }

    #[test]
    fn test_flash_swap_repaid_with_fee() {
        let (mut pool, mut bank) = seeded();
        let borrowed = units(1_000, 18);
        // Repay principal plus just over 0.3%
        let repay = borrowed * U256::from(1_004u64) / U256::from(1_000u64);
        let mut borrower = Borrower {
            repay,
            reenter: true,
            observed_lock: None,
        };

        pool.swap(&mut bank, &ctx(addr(2)), borrowed, U256::zero(), addr(2), Some(&mut borrower))
            .unwrap();

        assert_eq!(borrower.observed_lock, Some(DexError::Locked(addr(POOL))));
        assert!(!pool.is_locked());
        assert!(pool.reserves().0 > units(1_000_000, 18));
    }

    #[test]
    fn test_flash_swap_without_fee_fails() {
        let (mut pool, mut bank) = seeded();
        let borrowed = units(1_000, 18);
        let mut borrower = Borrower {
            repay: borrowed,
            reenter: false,
            observed_lock: None,
        };
        assert_eq!(
            pool.swap(&mut bank, &ctx(addr(2)), borrowed, U256::zero(), addr(2), Some(&mut borrower)),
            Err(DexError::InvariantViolated)
        );
        assert!(!pool.is_locked());
    }

    #[test]
    fn test_skim_and_sync() {
        let (mut pool, mut bank) = seeded();
        bank.transfer(token0(), addr(2), addr(POOL), units(5, 18)).unwrap();

        pool.skim(&mut bank, addr(4)).unwrap();
        assert_eq!(bank.balance_of(token0(), addr(4)), units(5_000_005, 18));

        bank.transfer(token1(), addr(2), addr(POOL), units(7, 18)).unwrap();
        pool.sync(&bank, &ctx(addr(2))).unwrap();
        assert_eq!(pool.reserves().1, units(1_000_007, 18));
    }

    #[test]
    fn test_price_accumulators_advance_with_time() {
        let (mut pool, mut bank) = seeded();
        let later = CallContext::new(addr(3), 2, 1_010);
        pool.swap_exact_in(&mut bank, &later, addr(3), units(1, 18), true, addr(3))
            .unwrap();

        let (p0, p1) = pool.price_cumulative_last();
        // Equal reserves for 10 seconds: price 1.0 in UQ112.112
        let expected = (U256::one() << 112) * U256::from(10u64);
        assert_eq!(p0, expected);
        assert_eq!(p1, expected);
    }

    #[test]
    fn test_protocol_fee_mints_to_fee_recipient() {
        let (mut pool, mut bank) = setup();
        let fee_to = addr(0xfee);
        pool.provide_liquidity(
            &mut bank,
            &ctx(addr(1)),
            addr(1),
            deposit(units(1_000_000, 18), units(1_000_000, 18)),
            addr(1),
            Some(fee_to),
        )
        .unwrap();
        assert!(!pool.k_last().is_zero());

        for _ in 0..5 {
            pool.swap_exact_in(&mut bank, &ctx(addr(3)), addr(3), units(100_000, 18), true, addr(3))
                .unwrap();
            pool.swap_exact_in(&mut bank, &ctx(addr(4)), addr(4), units(100_000, 18), false, addr(4))
                .unwrap();
        }
        assert!(pool.share_balance(fee_to).is_zero());

        pool.provide_liquidity(
            &mut bank,
            &ctx(addr(2)),
            addr(2),
            deposit(units(1_000, 18), units(1_000, 18)),
            addr(2),
            Some(fee_to),
        )
        .unwrap();
        assert!(!pool.share_balance(fee_to).is_zero());
    }
}
