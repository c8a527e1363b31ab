//! Checked 256-bit arithmetic
//!
//! `U256` operators panic on overflow. Anything reachable from a public
//! entry point goes through these helpers so overflow becomes a
//! [`DexError::Overflow`] that aborts the call instead.

use crate::common::errors::DexError;
use ethereum_types::U256;

pub fn add(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_add(b).ok_or(DexError::Overflow)
}

pub fn sub(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_sub(b).ok_or(DexError::Overflow)
}

pub fn mul(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_mul(b).ok_or(DexError::Overflow)
}

pub fn div(a: U256, b: U256) -> Result<U256, DexError> {
    a.checked_div(b).ok_or(DexError::Overflow)
}

/// `a * b / d` with every step checked
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256, DexError> {
    div(mul(a, b)?, d)
}

/// `a * b / d` rounded up, every step checked
pub fn mul_div_ceil(a: U256, b: U256, d: U256) -> Result<U256, DexError> {
    let product = mul(a, b)?;
    let quotient = div(product, d)?;
    if (product % d).is_zero() {
        Ok(quotient)
    } else {
        add(quotient, U256::one())
    }
}

/// Integer square root rounded down
pub fn sqrt(value: U256) -> U256 {
    value.integer_sqrt()
}

/// `amount * 10^decimals`
pub fn units(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * U256::exp10(decimals as usize)
}
