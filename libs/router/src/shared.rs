//! Shared exchange handle
//!
//! Serialises every transaction behind one lock so the exchange can be
//! embedded in a multi-threaded service without interleaving pool or
//! ledger mutations.

use crate::exchange::{DexState, Exchange};
use crate::router::Router;
use parking_lot::Mutex;
use std::sync::Arc;
use types::{Address, CallContext, DexError, U256};

#[derive(Clone)]
pub struct SharedExchange {
    inner: Arc<Mutex<Exchange>>,
}

impl SharedExchange {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            inner: Arc::new(Mutex::new(exchange)),
        }
    }

    pub fn transact<T, F>(&self, caller: Address, call: F) -> Result<T, DexError>
    where
        F: FnOnce(&mut DexState, &Router, &CallContext) -> Result<T, DexError>,
    {
        self.inner.lock().transact(caller, call)
    }

    pub fn transact_with_value<T, F>(
        &self,
        caller: Address,
        value: U256,
        call: F,
    ) -> Result<T, DexError>
    where
        F: FnOnce(&mut DexState, &Router, &CallContext) -> Result<T, DexError>,
    {
        self.inner.lock().transact_with_value(caller, value, call)
    }

    pub fn mine_blocks(&self, blocks: u64) {
        self.inner.lock().mine_blocks(blocks);
    }

    /// Read the exchange under the lock
    pub fn read<T>(&self, f: impl FnOnce(&Exchange) -> T) -> T {
        f(&self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_config::ExchangeConfig;
    use std::thread;
    use types::{math::units, TokenBank, TokenMetadata};

    #[test]
    fn test_concurrent_transactions_are_serialised() {
        let token = Address::from_low_u64_be(0x10);
        let mut exchange = Exchange::new(&ExchangeConfig::default()).unwrap();
        exchange
            .state_mut()
            .tokens
            .create_token(token, TokenMetadata::new("TK", 18));
        let shared = SharedExchange::new(exchange);
        let start = shared.read(|ex| ex.block_number());

        let handles: Vec<_> = (1..=8u64)
            .map(|user| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        shared
                            .transact(Address::from_low_u64_be(user), |state, _, ctx| {
                                state.tokens.mint(token, ctx.caller, units(1, 18))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        shared.read(|ex| {
            assert_eq!(ex.block_number(), start + 80);
            assert_eq!(ex.state().tokens.total_supply(token), units(80, 18));
        });
    }
}
