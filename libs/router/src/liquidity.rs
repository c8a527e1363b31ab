//! Router liquidity entry points
//!
//! Deposits are sized at the pool's current ratio before any token moves,
//! so only the optimal amounts ever leave the provider.

use crate::router::{Router, Venue};
use amm::{AmmPool, V2Math};
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{pull, Address, CallContext, DexError, Side, U256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// The native side is the call's attached value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityNative {
    pub token: Address,
    pub amount_token_desired: U256,
    pub amount_token_min: U256,
    pub amount_native_min: U256,
    pub to: Address,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidity {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityNative {
    pub token: Address,
    pub liquidity: U256,
    pub amount_token_min: U256,
    pub amount_native_min: U256,
    pub to: Address,
    pub deadline: u64,
}

/// `(amount_a, amount_b, liquidity)` as deposited, in request order
pub type Deposit = (U256, U256, U256);

impl Router {
    /// Resolve (or create) the pool and size the deposit in A/B order
    fn size_deposit(
        &self,
        venue: &mut Venue<'_>,
        token_a: Address,
        token_b: Address,
        desired: (U256, U256),
        minimum: (U256, U256),
    ) -> Result<(Address, U256, U256), DexError> {
        self.ensure_registry(venue.registry)?;
        let pool_address = venue.registry.get_or_create_pool(token_a, token_b)?;
        let pool = Self::pool_mut(venue.registry, pool_address)?;
        let reserves = pool.oriented_reserves(token_a)?;
        let (amount_a, amount_b) = V2Math::optimal_deposit(desired, minimum, reserves)?;
        Ok((pool_address, amount_a, amount_b))
    }

    fn mint_shares(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        pool_address: Address,
        to: Address,
    ) -> Result<U256, DexError> {
        let fee_to = venue.registry.fee_to();
        let own = self.own_context(ctx);
        let pool = Self::pool_mut(venue.registry, pool_address)?;
        pool.mint(venue.tokens, &own, to, fee_to)
    }

    pub fn add_liquidity(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        request: &AddLiquidity,
    ) -> Result<Deposit, DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, request.deadline)?;
        let (pool, amount_a, amount_b) = self.size_deposit(
            venue,
            request.token_a,
            request.token_b,
            (request.amount_a_desired, request.amount_b_desired),
            (request.amount_a_min, request.amount_b_min),
        )?;

        let router = self.address();
        pull(venue.tokens, request.token_a, router, ctx.caller, pool, amount_a)?;
        pull(venue.tokens, request.token_b, router, ctx.caller, pool, amount_b)?;
        let liquidity = self.mint_shares(venue, ctx, pool, request.to)?;

        debug!(
            "Liquidity added by {:?} to {:?}: {} / {} -> {} shares",
            ctx.caller, pool, amount_a, amount_b, liquidity
        );
        Ok((amount_a, amount_b, liquidity))
    }

    /// Returns `(amount_token, amount_native, liquidity)`
    pub fn add_liquidity_native(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        request: &AddLiquidityNative,
    ) -> Result<Deposit, DexError> {
        Self::ensure_deadline(ctx, request.deadline)?;
        let wrapped = self.wrapped_native().address();
        let (pool, amount_token, amount_native) = self.size_deposit(
            venue,
            request.token,
            wrapped,
            (request.amount_token_desired, ctx.value),
            (request.amount_token_min, request.amount_native_min),
        )?;

        let router = self.address();
        pull(venue.tokens, request.token, router, ctx.caller, pool, amount_token)?;
        self.wrapped_native()
            .wrap(venue.tokens, router, amount_native)?;
        venue.tokens.transfer(wrapped, router, pool, amount_native)?;
        let liquidity = self.mint_shares(venue, ctx, pool, request.to)?;
        self.refund_native(venue, ctx, amount_native)?;

        Ok((amount_token, amount_native, liquidity))
    }

    /// Burn shares (approved to the router) and pay `to`; returns A/B amounts
    fn burn_shares(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        to: Address,
    ) -> Result<(U256, U256), DexError> {
        self.ensure_registry(venue.registry)?;
        let pool_address = Self::pool_address(venue.registry, token_a, token_b)?;
        let fee_to = venue.registry.fee_to();
        let own = self.own_context(ctx);
        let pool = Self::pool_mut(venue.registry, pool_address)?;

        pool.transfer_shares_from(self.address(), ctx.caller, pool_address, liquidity)?;
        let (amount0, amount1) = pool.burn(venue.tokens, &own, to, fee_to)?;
        let amounts = if token_a == pool.token0() {
            (amount0, amount1)
        } else {
            (amount1, amount0)
        };

        debug!(
            "Liquidity removed by {:?} from {:?}: {} shares -> {} / {}",
            ctx.caller, pool_address, liquidity, amounts.0, amounts.1
        );
        Ok(amounts)
    }

    fn check_withdrawal(
        amounts: (U256, U256),
        minimum: (U256, U256),
    ) -> Result<(), DexError> {
        if amounts.0 < minimum.0 {
            return Err(DexError::InsufficientOutput {
                side: Side::A,
                amount: amounts.0,
                minimum: minimum.0,
            });
        }
        if amounts.1 < minimum.1 {
            return Err(DexError::InsufficientOutput {
                side: Side::B,
                amount: amounts.1,
                minimum: minimum.1,
            });
        }
        Ok(())
    }

    pub fn remove_liquidity(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        request: &RemoveLiquidity,
    ) -> Result<(U256, U256), DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, request.deadline)?;
        let amounts = self.burn_shares(
            venue,
            ctx,
            request.token_a,
            request.token_b,
            request.liquidity,
            request.to,
        )?;
        Self::check_withdrawal(amounts, (request.amount_a_min, request.amount_b_min))?;
        Ok(amounts)
    }

    /// Returns `(amount_token, amount_native)`
    pub fn remove_liquidity_native(
        &self,
        venue: &mut Venue<'_>,
        ctx: &CallContext,
        request: &RemoveLiquidityNative,
    ) -> Result<(U256, U256), DexError> {
        Self::ensure_not_payable(ctx)?;
        Self::ensure_deadline(ctx, request.deadline)?;
        let wrapped = self.wrapped_native().address();
        let router = self.address();
        let (amount_token, amount_native) = self.burn_shares(
            venue,
            ctx,
            request.token,
            wrapped,
            request.liquidity,
            router,
        )?;
        Self::check_withdrawal(
            (amount_token, amount_native),
            (request.amount_token_min, request.amount_native_min),
        )?;

        venue
            .tokens
            .transfer(request.token, router, request.to, amount_token)?;
        self.wrapped_native()
            .unwrap(venue.tokens, router, amount_native)?;
        venue
            .tokens
            .transfer_native(router, request.to, amount_native)?;
        Ok((amount_token, amount_native))
    }
}
