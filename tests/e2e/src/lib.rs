//! End-to-End Test Support for HashSwap
//!
//! Fixtures that deploy a complete exchange (registry, router, hash-rate
//! ledger, reward minter) and drive it through real transactions, plus
//! accounting checks shared by the scenario and property suites.

pub mod fixtures;
pub mod validation;

pub use fixtures::*;
pub use validation::*;
