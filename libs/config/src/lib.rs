//! # HashSwap Configuration
//!
//! Protocol constants and the layered deployment configuration shared by
//! every exchange crate and the simulator service.
//!
//! ## Usage
//!
//! ```rust
//! use dex_config::{protocol, ExchangeConfig};
//!
//! let config = ExchangeConfig::default();
//! assert_eq!(config.amm.fee_bps, protocol::DEFAULT_FEE_BPS);
//! ```

pub mod exchange_config;
pub mod protocol;

pub use exchange_config::{
    load_config, AmmSettings, ChainSettings, DeploymentConfig, ExchangeConfig, LoggingConfig,
    MiningSettings,
};
pub use protocol::*;
