//! Constant-product AMM math with exact integer calculations
//!
//! Every state-changing amount is computed in checked `U256` arithmetic with
//! the same rounding a pool enforces on-chain (outputs round down, required
//! inputs round up). `Decimal` only appears in the read-only analytics at
//! the bottom, which never feed back into state.

use dex_config::FEE_DENOMINATOR;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::{math, DexError, Side, U256};

/// Scale used when turning integer ratios into `Decimal`
const ANALYTICS_SCALE: u32 = 18;

/// Constant-product math functions
pub struct V2Math;

impl V2Math {
    /// Output amount for an exact input using the x*y=k formula
    ///
    /// # Arguments
    /// * `amount_in` - Input token amount (raw units)
    /// * `reserve_in` - Input token reserve
    /// * `reserve_out` - Output token reserve
    /// * `fee_bps` - Fee in basis points (30 = 0.3%)
    ///
    /// # Returns
    /// `reserve_out * in_after_fee / (reserve_in + in_after_fee)`, rounded down
    pub fn get_amount_out(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> Result<U256, DexError> {
        if amount_in.is_zero() {
            return Err(DexError::InsufficientInputAmount);
        }
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }

        // Scaled by the fee denominator on both sides to stay in integers
        let amount_in_with_fee = math::mul(amount_in, U256::from(FEE_DENOMINATOR - fee_bps))?;
        let numerator = math::mul(amount_in_with_fee, reserve_out)?;
        let denominator = math::add(
            math::mul(reserve_in, U256::from(FEE_DENOMINATOR))?,
            amount_in_with_fee,
        )?;

        math::div(numerator, denominator)
    }

    /// Input required for an exact output (reverse calculation), rounded up
    pub fn get_amount_in(
        amount_out: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> Result<U256, DexError> {
        if amount_out.is_zero() {
            return Err(DexError::InsufficientOutputAmount {
                amount_out,
                amount_out_min: U256::one(),
            });
        }
        if reserve_in.is_zero() || reserve_out.is_zero() || amount_out >= reserve_out {
            return Err(DexError::InsufficientLiquidity);
        }

        let numerator = math::mul(
            math::mul(reserve_in, amount_out)?,
            U256::from(FEE_DENOMINATOR),
        )?;
        let denominator = math::mul(
            reserve_out - amount_out,
            U256::from(FEE_DENOMINATOR - fee_bps),
        )?;

        math::add(math::div(numerator, denominator)?, U256::one())
    }

    /// Equivalent amount of the other token at the current reserve ratio
    pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Result<U256, DexError> {
        if amount_a.is_zero() {
            return Err(DexError::invalid_input("quote amount must be positive"));
        }
        if reserve_a.is_zero() || reserve_b.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        math::mul_div(amount_a, reserve_b, reserve_a)
    }

    /// Largest deposit at the pool's ratio that stays within the desired
    /// amounts, checked against the caller's minimums.
    ///
    /// An empty pool takes the desired amounts as-is and sets the ratio.
    pub fn optimal_deposit(
        desired: (U256, U256),
        minimum: (U256, U256),
        reserves: (U256, U256),
    ) -> Result<(U256, U256), DexError> {
        let (desired_a, desired_b) = desired;
        let (min_a, min_b) = minimum;
        let (reserve_a, reserve_b) = reserves;

        if reserve_a.is_zero() && reserve_b.is_zero() {
            return Ok((desired_a, desired_b));
        }

        let optimal_b = Self::quote(desired_a, reserve_a, reserve_b)?;
        if optimal_b <= desired_b {
            if optimal_b < min_b {
                return Err(DexError::DepositBelowMinimum {
                    side: Side::B,
                    amount: optimal_b,
                    minimum: min_b,
                });
            }
            return Ok((desired_a, optimal_b));
        }

        let optimal_a = Self::quote(desired_b, reserve_b, reserve_a)?;
        if optimal_a > desired_a {
            // Unreachable with consistent reserves: both quotes cannot exceed
            return Err(DexError::InvariantViolated);
        }
        if optimal_a < min_a {
            return Err(DexError::DepositBelowMinimum {
                side: Side::A,
                amount: optimal_a,
                minimum: min_a,
            });
        }
        Ok((optimal_a, desired_b))
    }

    /// Shares for the first deposit: `sqrt(a0 * a1) - minimum_liquidity`
    pub fn initial_shares(
        amount0: U256,
        amount1: U256,
        minimum_liquidity: U256,
    ) -> Result<U256, DexError> {
        let root = math::sqrt(math::mul(amount0, amount1)?);
        if root <= minimum_liquidity {
            return Err(DexError::InsufficientLiquidityMinted);
        }
        Ok(root - minimum_liquidity)
    }

    /// Shares for a deposit into a live pool, rounded against the depositor
    pub fn proportional_shares(
        amounts: (U256, U256),
        reserves: (U256, U256),
        total_shares: U256,
    ) -> Result<U256, DexError> {
        if reserves.0.is_zero() || reserves.1.is_zero() {
            return Err(DexError::InsufficientLiquidity);
        }
        let via0 = math::mul_div(amounts.0, total_shares, reserves.0)?;
        let via1 = math::mul_div(amounts.1, total_shares, reserves.1)?;
        Ok(via0.min(via1))
    }

    /// Protocol share of the growth in `sqrt(k)`: one sixth of it, paid as
    /// newly minted LP shares.
    pub fn protocol_fee_shares(
        total_shares: U256,
        root_k: U256,
        root_k_last: U256,
    ) -> Result<U256, DexError> {
        if root_k <= root_k_last {
            return Ok(U256::zero());
        }
        let numerator = math::mul(total_shares, root_k - root_k_last)?;
        let denominator = math::add(math::mul(root_k, U256::from(5u64))?, root_k_last)?;
        math::div(numerator, denominator)
    }

    /// Price impact of a trade in percent, fee excluded
    pub fn price_impact(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
    ) -> Result<Decimal, DexError> {
        Self::execution_shortfall(amount_in, reserve_in, reserve_out, 0)
    }

    /// Shortfall against the spot rate in percent, fee included
    pub fn slippage(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> Result<Decimal, DexError> {
        Self::execution_shortfall(amount_in, reserve_in, reserve_out, fee_bps)
    }

    fn execution_shortfall(
        amount_in: U256,
        reserve_in: U256,
        reserve_out: U256,
        fee_bps: u32,
    ) -> Result<Decimal, DexError> {
        let amount_out = Self::get_amount_out(amount_in, reserve_in, reserve_out, fee_bps)?;

        // execution rate / spot rate = (out / in) / (r_out / r_in)
        let realised = ratio_to_decimal(
            math::mul(amount_out, reserve_in)?,
            math::mul(amount_in, reserve_out)?,
        )
        .ok_or(DexError::Overflow)?;

        Ok((dec!(1) - realised) * dec!(100))
    }

    /// Spot price of the input token in output-token units, decimals applied
    pub fn spot_price(
        reserve_in: U256,
        reserve_out: U256,
        decimals_in: u8,
        decimals_out: u8,
    ) -> Option<Decimal> {
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return None;
        }
        let numerator = reserve_out.checked_mul(U256::exp10(decimals_in as usize))?;
        let denominator = reserve_in.checked_mul(U256::exp10(decimals_out as usize))?;
        ratio_to_decimal(numerator, denominator)
    }
}

/// `numerator / denominator` as a `Decimal`, `None` if it does not fit
fn ratio_to_decimal(numerator: U256, denominator: U256) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    let scaled = numerator
        .checked_mul(U256::exp10(ANALYTICS_SCALE as usize))?
        .checked_div(denominator)?;
    if scaled.bits() > 127 {
        return None;
    }
    Decimal::try_from_i128_with_scale(scaled.as_u128() as i128, ANALYTICS_SCALE)
        .ok()
        .map(|d| d.normalize())
}
