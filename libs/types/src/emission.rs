//! Reward emission collaborators
//!
//! The mining ledger never holds reward tokens. On harvest it asks an
//! [`EmissionSource`] to deliver the reward straight to the recipient.

use crate::common::errors::DexError;
use crate::common::math;
use crate::tokens::TokenBank;
use ethereum_types::{Address, U256};
use tracing::debug;

/// Source of freshly minted reward tokens
pub trait EmissionSource {
    fn reward_token(&self) -> Address;

    /// Deliver `amount` to `recipient` or fail without side effects
    fn request_reward(
        &mut self,
        tokens: &mut dyn TokenBank,
        recipient: Address,
        amount: U256,
    ) -> Result<(), DexError>;
}

/// Mints the reward token on demand, optionally within a fixed budget
#[derive(Debug, Clone)]
pub struct RewardMinter {
    reward_token: Address,
    /// `None` means unbounded
    remaining: Option<U256>,
    minted: U256,
}

impl RewardMinter {
    pub fn new(reward_token: Address) -> Self {
        Self {
            reward_token,
            remaining: None,
            minted: U256::zero(),
        }
    }

    pub fn with_budget(reward_token: Address, budget: U256) -> Self {
        Self {
            reward_token,
            remaining: Some(budget),
            minted: U256::zero(),
        }
    }

    pub fn remaining(&self) -> Option<U256> {
        self.remaining
    }

    pub fn total_minted(&self) -> U256 {
        self.minted
    }
}

impl EmissionSource for RewardMinter {
    fn reward_token(&self) -> Address {
        self.reward_token
    }

    fn request_reward(
        &mut self,
        tokens: &mut dyn TokenBank,
        recipient: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        let remaining = match self.remaining {
            Some(available) if available < amount => {
                return Err(DexError::RewardUnavailable {
                    requested: amount,
                    available,
                })
            }
            Some(available) => Some(available - amount),
            None => None,
        };
        tokens.mint(self.reward_token, recipient, amount)?;
        self.remaining = remaining;
        self.minted = math::add(self.minted, amount)?;
        debug!("Minted {} reward to {:?}", amount, recipient);
        Ok(())
    }
}
