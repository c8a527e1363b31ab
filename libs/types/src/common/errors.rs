//! Error taxonomy for the exchange core
//!
//! Every failure aborts the whole call. Each variant carries the amounts or
//! addresses that triggered it, and [`DexError::kind`] folds the variants
//! into the coarse categories callers branch on.

use ethereum_types::{Address, U256};
use thiserror::Error;

/// Coarse failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed call: identical tokens, zero amounts, bad paths
    InvalidInput,
    /// Output below the caller's minimum or input above the caller's maximum
    SlippageExceeded,
    /// Deadline already passed when the call started
    Expired,
    /// Empty or underfunded pool
    InsufficientLiquidity,
    /// Emission source could not fund a harvest
    RewardUnavailable,
    /// Operator-gated call from someone else
    Unauthorized,
    /// Token-level balance or allowance failure
    TransferFailed,
    /// Arithmetic overflow, broken pool invariant or re-entry
    InvariantViolation,
}

/// Which side of a pair a bound refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// All failures surfaced by pools, the registry, the router and the mining ledger
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DexError {
    #[error("Identical tokens: {0:?}")]
    IdenticalTokens(Address),

    #[error("Zero address is not a valid token")]
    ZeroAddress,

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid path: {reason}")]
    InvalidPath { reason: String },

    #[error("Recipient {0:?} is one of the pool tokens")]
    InvalidTo(Address),

    #[error("Pool already exists for pair: {0:?}")]
    PoolExists(Address),

    #[error("No pool for pair ({token_a:?}, {token_b:?})")]
    PoolNotFound { token_a: Address, token_b: Address },

    #[error("Unknown pool {0:?}")]
    UnknownPool(Address),

    #[error("Pool {0:?} is not registered for mining")]
    PoolNotRegistered(Address),

    #[error("Pool {0:?} is already registered for mining")]
    PoolAlreadyRegistered(Address),

    #[error("Insufficient input amount")]
    InsufficientInputAmount,

    #[error("Insufficient output amount: got {amount_out}, minimum {amount_out_min}")]
    InsufficientOutputAmount {
        amount_out: U256,
        amount_out_min: U256,
    },

    #[error("Excessive input amount: need {amount_in}, maximum {amount_in_max}")]
    ExcessiveInputAmount { amount_in: U256, amount_in_max: U256 },

    #[error("Deposit of token {side} below minimum: optimal {amount}, minimum {minimum}")]
    DepositBelowMinimum {
        side: Side,
        amount: U256,
        minimum: U256,
    },

    #[error("Insufficient output of token {side}: got {amount}, minimum {minimum}")]
    InsufficientOutput {
        side: Side,
        amount: U256,
        minimum: U256,
    },

    #[error("Deadline {deadline} expired at {now}")]
    Expired { deadline: u64, now: u64 },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Insufficient liquidity minted")]
    InsufficientLiquidityMinted,

    #[error("Insufficient liquidity burned")]
    InsufficientLiquidityBurned,

    #[error("Reward unavailable: requested {requested}, available {available}")]
    RewardUnavailable { requested: U256, available: U256 },

    #[error("Unauthorized caller {caller:?}")]
    Unauthorized { caller: Address },

    #[error("Unknown token {0:?}")]
    UnknownToken(Address),

    #[error("Insufficient balance of {token:?} for {owner:?}: need {needed}, have {available}")]
    InsufficientBalance {
        token: Address,
        owner: Address,
        needed: U256,
        available: U256,
    },

    #[error("Insufficient allowance of {token:?} from {owner:?} to {spender:?}: need {needed}, have {available}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        needed: U256,
        available: U256,
    },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Constant-product invariant violated")]
    InvariantViolated,

    #[error("Pool {0:?} is locked")]
    Locked(Address),
}

impl DexError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        DexError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn invalid_path(reason: impl Into<String>) -> Self {
        DexError::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Map the variant onto its failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            DexError::IdenticalTokens(_)
            | DexError::ZeroAddress
            | DexError::InvalidInput { .. }
            | DexError::InvalidPath { .. }
            | DexError::InvalidTo(_)
            | DexError::PoolExists(_)
            | DexError::PoolNotFound { .. }
            | DexError::UnknownPool(_)
            | DexError::PoolNotRegistered(_)
            | DexError::PoolAlreadyRegistered(_)
            | DexError::InsufficientInputAmount
            | DexError::UnknownToken(_) => ErrorKind::InvalidInput,

            DexError::InsufficientOutputAmount { .. }
            | DexError::ExcessiveInputAmount { .. }
            | DexError::DepositBelowMinimum { .. }
            | DexError::InsufficientOutput { .. } => ErrorKind::SlippageExceeded,

            DexError::Expired { .. } => ErrorKind::Expired,

            DexError::InsufficientLiquidity
            | DexError::InsufficientLiquidityMinted
            | DexError::InsufficientLiquidityBurned => ErrorKind::InsufficientLiquidity,

            DexError::RewardUnavailable { .. } => ErrorKind::RewardUnavailable,

            DexError::Unauthorized { .. } => ErrorKind::Unauthorized,

            DexError::InsufficientBalance { .. } | DexError::InsufficientAllowance { .. } => {
                ErrorKind::TransferFailed
            }

            DexError::Overflow | DexError::InvariantViolated | DexError::Locked(_) => {
                ErrorKind::InvariantViolation
            }
        }
    }
}
