//! Router
//!
//! Stateless orchestration over the registry's pools. Resolves each hop's
//! pool, computes chained amounts, enforces deadlines and slippage bounds,
//! wraps the native coin at the boundary and reports swap volume to the
//! hash-rate ledger. Holds nothing but its configuration.

use crate::native::WrappedNative;
use amm::{AmmPool, PoolRegistry, ReservePool, V2Math};
use mining::HashRateLedger;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::{math, pull, Address, CallContext, DexError, TokenBank, U256};

/// Deployment addresses the router works against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// The router's own account (spender of user approvals)
    pub address: Address,
    pub registry: Address,
    pub wrapped_native: Address,
    /// Ledger that receives swap volume; `None` disables reporting
    pub mining_ledger: Option<Address>,
}

/// Mutable views of the components one router call may touch
pub struct Venue<'a> {
    pub tokens: &'a mut dyn TokenBank,
    pub registry: &'a mut PoolRegistry,
    pub mining: Option<&'a mut HashRateLedger>,
}

/// Token path plus where the final output goes and by when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: Vec<Address>,
    pub to: Address,
    /// Latest acceptable block timestamp
    pub deadline: u64,
}

impl Route {
    pub fn new(path: Vec<Address>, to: Address, deadline: u64) -> Self {
        Self { path, to, deadline }
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    config: RouterConfig,
    wrapped: WrappedNative,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            wrapped: WrappedNative::new(config.wrapped_native),
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn wrapped_native(&self) -> &WrappedNative {
        &self.wrapped
    }

    // ---------------------------------------------------------------------
    // Guards
    // ---------------------------------------------------------------------

    pub(crate) fn ensure_deadline(ctx: &CallContext, deadline: u64) -> Result<(), DexError> {
        if ctx.timestamp > deadline {
            return Err(DexError::Expired {
                deadline,
                now: ctx.timestamp,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_not_payable(ctx: &CallContext) -> Result<(), DexError> {
        if !ctx.value.is_zero() {
            return Err(DexError::invalid_input(format!(
                "entry point does not accept native value ({})",
                ctx.value
            )));
        }
        Ok(())
    }

    fn ensure_path(path: &[Address]) -> Result<(), DexError> {
        if path.len() < 2 {
            return Err(DexError::invalid_path(format!(
                "need at least two tokens, got {}",
                path.len()
            )));
        }
        Ok(())
    }

    fn ensure_starts_with(&self, path: &[Address], token: Address) -> Result<(), DexError> {
        if path.first() != Some(&token) {
            return Err(DexError::invalid_path("path must start with the wrapped native token"));
        }
        Ok(())
    }

    fn ensure_ends_with(&self, path: &[Address], token: Address) -> Result<(), DexError> {
        if path.last() != Some(&token) {
            return Err(DexError::invalid_path("path must end with the wrapped native token"));
        }
        Ok(())
    }

    /// Pools are only resolved through the configured registry
    pub(crate) fn ensure_registry(&self, registry: &PoolRegistry) -> Result<(), DexError> {
        if registry.address() != self.config.registry {
            return Err(DexError::invalid_input(format!(
                "registry {:?} is not the configured {:?}",
                registry.address(),
                self.config.registry
            )));
        }
        Ok(())
    }

    /// Context for calls the router makes on its own account
    pub(crate) fn own_context(&self, ctx: &CallContext) -> CallContext {
        ctx.on_behalf_of(self.config.address)
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    pub fn quote(
        &self,
        amount_a: U256,
        reserve_a: U256,
        reserve_b: U256,
    ) -> Result<U256, DexError> {
        V2Math::quote(amount_a, reserve_a, reserve_b)
    }

    pub fn get_amount_out(
        &self,
        registry: &PoolRegistry,
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256, DexError> {
        self.ensure_registry(registry)?;
        V2Math::get_amount_out(amount_in, reserve_in, reserve_out, registry.params().fee_bps)
    }

    pub fn get_amount_in(
        &self,
        registry: &PoolRegistry,
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<U256, DexError> {
        self.ensure_registry(registry)?;
        V2Math::get_amount_in(amount_out, reserve_in, reserve_out, registry.params().fee_bps)
    }

    /// Pool reserves oriented as `(reserve_a, reserve_b)`; zero if no pool yet
    pub fn get_reserves(
        &self,
        registry: &PoolRegistry,
        token_a: Address,
        token_b: Address,
    ) -> Result<(U256, U256), DexError> {
        self.ensure_registry(registry)?;
        amm::sort_tokens(token_a, token_b)?;
        match registry.pool_for_pair(token_a, token_b) {
            Some(pool) => pool.oriented_reserves(token_a),
            None => Ok((U256::zero(), U256::zero())),
        }
    }

    /// Amounts at every step of `path` for an exact input
    pub fn get_amounts_out(
        &self,
        registry: &PoolRegistry,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, DexError> {
        self.ensure_registry(registry)?;
        Self::ensure_path(path)?;
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let pool = Self::pool_for(registry, hop[0], hop[1])?;
            let last = amounts[amounts.len() - 1];
            amounts.push(pool.get_amount_out(hop[0], last)?);
        }
        Ok(amounts)
    }

    /// Amounts at every step of `path` for an exact output, walked backwards
    pub fn get_amounts_in(
        &self,
        registry: &PoolRegistry,
        amount_out: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, DexError> {
        self.ensure_registry(registry)?;
        Self::ensure_path(path)?;
        let mut amounts = vec![U256::zero(); path.len()];
        amounts[path.len() - 1] = amount_out;
        for i in (1..path.len()).rev() {
            let pool = Self::pool_for(registry, path[i - 1], path[i])?;
            amounts[i - 1] = pool.get_amount_in(path[i - 1], amounts[i])?;
        }
        Ok(amounts)
    }

    fn pool_for(
        registry: &PoolRegistry,
        token_a: Address,
        token_b: Address,
    ) -> Result<&ReservePool, DexError> {
        registry
            .pool_for_pair(token_a, token_b)
            .ok_or(DexError::PoolNotFound { token_a, token_b })
    }

    pub(crate) fn pool_address(
        registry: &PoolRegistry,
        token_a: Address,
        token_b: Address,
    ) -> Result<Address, DexError> {
        amm::sort_tokens(token_a, token_b)?;
        registry
            .get_pool(token_a, token_b)
            .ok_or(DexError::PoolNotFound { token_a, token_b })
    }

    pub(crate) fn pool_mut<'r>(
        registry: &'r mut PoolRegistry,
        address: Address,
    ) -> Result<&'r mut ReservePool, DexError> {
        registry
            .pool_mut(address)
            .ok_or(DexError::UnknownPool(address))
    }

    // ---------------------------------------------------------------------
    // Swap execution
    // ---------------------------------------------------------------------

    /// Run every hop with precomputed `amounts`; the first pool must already
    /// hold the input. Returns `(pool, output)` per hop.
    fn execute_path(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amounts: &[U256],
        path: &[Address],
        to: Address,
    ) -> Result<Vec<(Address, U256)>, DexError> {
        self.ensure_registry(venue.registry)?;
        let own = self.own_context(ctx);
        let mut hops = Vec::with_capacity(path.len() - 1);
        for i in 0..path.len() - 1 {
            let (input, output) = (path[i], path[i + 1]);
            let pool_address = Self::pool_address(venue.registry, input, output)?;
            let recipient = if i + 2 < path.len() {
                Self::pool_address(venue.registry, output, path[i + 2])?
            } else {
                to
            };

            let amount_out = amounts[i + 1];
            let pool = Self::pool_mut(venue.registry, pool_address)?;
            let (amount0_out, amount1_out) = if input == pool.token0() {
                (U256::zero(), amount_out)
            } else {
                (amount_out, U256::zero())
            };
            pool.swap(venue.tokens, &own, amount0_out, amount1_out, recipient, None)?;
            hops.push((pool_address, amount_out));
        }
        Ok(hops)
    }

    /// Credit the sender with each hop's output on mining-registered pools
    fn report_volume(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        hops: &[(Address, U256)],
    ) -> Result<(), DexError> {
        let Some(ledger) = venue.mining.as_deref_mut() else {
            return Ok(());
        };
        if self.config.mining_ledger != Some(ledger.address()) {
            warn!(
                "Skipping volume report: ledger {:?} is not the configured {:?}",
                ledger.address(),
                self.config.mining_ledger
            );
            return Ok(());
        }

        let own = self.own_context(ctx);
        for &(pool, volume) in hops {
            if ledger.is_registered(pool) {
                ledger.report_swap_volume(&own, pool, ctx.caller, volume)?;
            }
        }
        Ok(())
    }

    fn finish_swap(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amounts: &[U256],
        path: &[Address],
        to: Address,
    ) -> Result<(), DexError> {
        let hops = self.execute_path(venue, ctx, amounts, path, to)?;
        self.report_volume(venue, ctx, &hops)?;
        debug!(
            "Swap by {:?}: {} hops, in {} out {}",
            ctx.caller,
            hops.len(),
            amounts[0],
            amounts[amounts.len() - 1]
        );
        Ok(())
    }

    /// Move the caller's input into the first pool
    fn fund_first_hop(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        path: &[Address],
        amount: U256,
    ) -> Result<(), DexError> {
        let first = Self::pool_address(venue.registry, path[0], path[1])?;
        pull(venue.tokens, path[0], self.config.address, ctx.caller, first, amount)
    }

    /// Wrap `amount` of the router's native balance and send it to the first pool
    fn fund_first_hop_native(
        &self,
        venue: &mut Venue<'_>,
        path: &[Address],
        amount: U256,
    ) -> Result<(), DexError> {
        let first = Self::pool_address(venue.registry, path[0], path[1])?;
        self.wrapped.wrap(venue.tokens, self.config.address, amount)?;
        venue
            .tokens
            .transfer(self.wrapped.address(), self.config.address, first, amount)
    }

    /// Unwrap the router's wrapped output and send the native coin on
    fn pay_out_native(
        &self,
        venue: &mut Venue<'_>,
        to: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        self.wrapped.unwrap(venue.tokens, self.config.address, amount)?;
        venue.tokens.transfer_native(self.config.address, to, amount)
    }

    fn check_min_out(amounts: &[U256], amount_out_min: U256) -> Result<(), DexError> {
        let amount_out = amounts[amounts.len() - 1];
        if amount_out < amount_out_min {
            return Err(DexError::InsufficientOutputAmount {
                amount_out,
                amount_out_min,
            });
        }
        Ok(())
    }

    fn check_max_in(amounts: &[U256], amount_in_max: U256) -> Result<(), DexError> {
        if amounts[0] > amount_in_max {
            return Err(DexError::ExcessiveInputAmount {
                amount_in: amounts[0],
                amount_in_max,
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Swap entry points
    // ---------------------------------------------------------------------

    pub fn swap_exact_tokens_for_tokens(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amount_in: U256,
        amount_out_min: U256,
        route: &Route,
    ) -> Result<Vec<U256>, DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, route.deadline)?;
        let amounts = self.get_amounts_out(venue.registry, amount_in, &route.path)?;
        Self::check_min_out(&amounts, amount_out_min)?;

        self.fund_first_hop(venue, ctx, &route.path, amounts[0])?;
        self.finish_swap(venue, ctx, &amounts, &route.path, route.to)?;
        Ok(amounts)
    }

    pub fn swap_tokens_for_exact_tokens(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amount_out: U256,
        amount_in_max: U256,
        route: &Route,
    ) -> Result<Vec<U256>, DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, route.deadline)?;
        let amounts = self.get_amounts_in(venue.registry, amount_out, &route.path)?;
        Self::check_max_in(&amounts, amount_in_max)?;

        self.fund_first_hop(venue, ctx, &route.path, amounts[0])?;
        self.finish_swap(venue, ctx, &amounts, &route.path, route.to)?;
        Ok(amounts)
    }

    /// Spend the attached native value as the exact input
    pub fn swap_exact_native_for_tokens(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amount_out_min: U256,
        route: &Route,
    ) -> Result<Vec<U256>, DexError> {
        Self::ensure_deadline(ctx, route.deadline)?;
        self.ensure_starts_with(&route.path, self.wrapped.address())?;
        let amounts = self.get_amounts_out(venue.registry, ctx.value, &route.path)?;
        Self::check_min_out(&amounts, amount_out_min)?;

        self.fund_first_hop_native(venue, &route.path, amounts[0])?;
        self.finish_swap(venue, ctx, &amounts, &route.path, route.to)?;
        Ok(amounts)
    }

    pub fn swap_tokens_for_exact_native(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amount_out: U256,
        amount_in_max: U256,
        route: &Route,
    ) -> Result<Vec<U256>, DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, route.deadline)?;
        self.ensure_ends_with(&route.path, self.wrapped.address())?;
        let amounts = self.get_amounts_in(venue.registry, amount_out, &route.path)?;
        Self::check_max_in(&amounts, amount_in_max)?;

        self.fund_first_hop(venue, ctx, &route.path, amounts[0])?;
        self.finish_swap(venue, ctx, &amounts, &route.path, self.config.address)?;
        self.pay_out_native(venue, route.to, amount_out)?;
        Ok(amounts)
    }

    pub fn swap_exact_tokens_for_native(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amount_in: U256,
        amount_out_min: U256,
        route: &Route,
    ) -> Result<Vec<U256>, DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, route.deadline)?;
        self.ensure_ends_with(&route.path, self.wrapped.address())?;
        let amounts = self.get_amounts_out(venue.registry, amount_in, &route.path)?;
        Self::check_min_out(&amounts, amount_out_min)?;

        self.fund_first_hop(venue, ctx, &route.path, amounts[0])?;
        self.finish_swap(venue, ctx, &amounts, &route.path, self.config.address)?;
        self.pay_out_native(venue, route.to, amounts[amounts.len() - 1])?;
        Ok(amounts)
    }

    /// Buy an exact output with the attached native value, refunding the rest
    pub fn swap_native_for_exact_tokens(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amount_out: U256,
        route: &Route,
    ) -> Result<Vec<U256>, DexError> {
        Self::ensure_deadline(ctx, route.deadline)?;
        self.ensure_starts_with(&route.path, self.wrapped.address())?;
        let amounts = self.get_amounts_in(venue.registry, amount_out, &route.path)?;
        Self::check_max_in(&amounts, ctx.value)?;

        self.fund_first_hop_native(venue, &route.path, amounts[0])?;
        self.finish_swap(venue, ctx, &amounts, &route.path, route.to)?;
        self.refund_native(venue, ctx, amounts[0])?;
        Ok(amounts)
    }

    /// Return whatever part of the attached value was not spent
    pub(crate) fn refund_native(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        spent: U256,
    ) -> Result<(), DexError> {
        let refund = math::sub(ctx.value, spent)?;
        if !refund.is_zero() {
            venue
                .tokens
                .transfer_native(self.config.address, ctx.caller, refund)?;
        }
        Ok(())
    }

    /// Exact-input swap for tokens that take a cut on transfer.
    ///
    /// Each hop is priced on what its pool actually received, and the
    /// minimum is checked against the recipient's balance change.
    pub fn swap_exact_tokens_for_tokens_supporting_fee_on_transfer_tokens(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        amount_in: U256,
        amount_out_min: U256,
        route: &Route,
    ) -> Result<U256, DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, route.deadline)?;
        Self::ensure_path(&route.path)?;
        self.ensure_registry(venue.registry)?;
        let path = &route.path;
        let last = path[path.len() - 1];

        self.fund_first_hop(venue, ctx, path, amount_in)?;
        let balance_before = venue.tokens.balance_of(last, route.to);

        let own = self.own_context(ctx);
        let mut hops = Vec::with_capacity(path.len() - 1);
        for i in 0..path.len() - 1 {
            let (input, output) = (path[i], path[i + 1]);
            let pool_address = Self::pool_address(venue.registry, input, output)?;
            let recipient = if i + 2 < path.len() {
                Self::pool_address(venue.registry, output, path[i + 2])?
            } else {
                route.to
            };

            let pool = Self::pool_mut(venue.registry, pool_address)?;
            let (reserve_in, reserve_out) = pool.oriented_reserves(input)?;
            let received = math::sub(venue.tokens.balance_of(input, pool_address), reserve_in)?;
            let amount_out =
                V2Math::get_amount_out(received, reserve_in, reserve_out, pool.params().fee_bps)?;
            let (amount0_out, amount1_out) = if input == pool.token0() {
                (U256::zero(), amount_out)
            } else {
                (amount_out, U256::zero())
            };
            pool.swap(venue.tokens, &own, amount0_out, amount1_out, recipient, None)?;
            hops.push((pool_address, amount_out));
        }

        let received = math::sub(venue.tokens.balance_of(last, route.to), balance_before)?;
        if received < amount_out_min {
            return Err(DexError::InsufficientOutputAmount {
                amount_out: received,
                amount_out_min,
            });
        }
        self.report_volume(venue, ctx, &hops)?;
        Ok(received)
    }
}
