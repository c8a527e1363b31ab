//! Wrapped native coin
//!
//! The wrapper address is also the wrapped token's address. Wrapping parks
//! the native coin at the wrapper and mints the same amount of the token;
//! unwrapping burns the token and releases the coin.

use tracing::debug;
use types::{Address, DexError, TokenBank, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedNative {
    address: Address,
}

impl WrappedNative {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Wrapper and wrapped-token address
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn wrap(
        &self,
        tokens: &mut dyn TokenBank,
        owner: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        tokens.transfer_native(owner, self.address, amount)?;
        tokens.mint(self.address, owner, amount)?;
        debug!("Wrapped {} native for {:?}", amount, owner);
        Ok(())
    }

    pub fn unwrap(
        &self,
        tokens: &mut dyn TokenBank,
        owner: Address,
        amount: U256,
    ) -> Result<(), DexError> {
        tokens.burn(self.address, owner, amount)?;
        tokens.transfer_native(self.address, owner, amount)?;
        debug!("Unwrapped {} native for {:?}", amount, owner);
        Ok(())
    }
}
