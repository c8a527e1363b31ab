//! Per-call execution context
//!
//! Plays the role of `msg.sender`, `msg.value` and the block header for a
//! single call. The host environment builds one per transaction; components
//! that call into other components on their own behalf derive a new context
//! with [`CallContext::on_behalf_of`].

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Account that initiated this call
    pub caller: Address,
    /// Native value attached to the call
    pub value: U256,
    pub block_number: u64,
    /// Block timestamp in seconds
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, block_number: u64, timestamp: u64) -> Self {
        Self {
            caller,
            value: U256::zero(),
            block_number,
            timestamp,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Same block, new caller, no attached value
    pub fn on_behalf_of(&self, caller: Address) -> Self {
        Self {
            caller,
            value: U256::zero(),
            block_number: self.block_number,
            timestamp: self.timestamp,
        }
    }
}
