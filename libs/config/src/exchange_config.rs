//! Exchange Configuration Module
//!
//! Layered configuration for an exchange deployment: built-in defaults,
//! then an optional TOML file, then `HASHSWAP__`-prefixed environment
//! variables (`HASHSWAP__AMM__FEE_BPS=25`).

use crate::protocol::{self, addressing, chain, mining};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use types::{Address, U256};

/// Complete exchange configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ExchangeConfig {
    pub amm: AmmSettings,
    pub mining: MiningSettings,
    pub chain: ChainSettings,
    pub deployment: DeploymentConfig,
    pub logging: LoggingConfig,
}

/// Pool parameters, fixed per pool at creation
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AmmSettings {
    pub fee_bps: u32,
    pub minimum_liquidity: u64,
    /// Hashed into the code fingerprint used for pool addressing
    pub pool_code_label: String,
}

/// Hash-rate mining parameters. Amounts are decimal strings since they
/// routinely exceed 64 bits.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MiningSettings {
    pub reward_per_block: String,
    pub reward_precision: String,
    /// Total the reward minter may ever issue; unbounded when absent
    pub emission_budget: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChainSettings {
    pub genesis_block: u64,
    pub genesis_timestamp: u64,
    pub block_time_secs: u64,
}

/// Addresses of every deployed component
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeploymentConfig {
    pub registry: Address,
    pub router: Address,
    pub wrapped_native: Address,
    pub mining_ledger: Address,
    pub reward_token: Address,
    pub operator: Address,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
    pub json: bool,
}

impl Default for AmmSettings {
    fn default() -> Self {
        Self {
            fee_bps: protocol::DEFAULT_FEE_BPS,
            minimum_liquidity: protocol::DEFAULT_MINIMUM_LIQUIDITY,
            pool_code_label: addressing::DEFAULT_POOL_CODE_LABEL.to_string(),
        }
    }
}

impl Default for MiningSettings {
    fn default() -> Self {
        Self {
            reward_per_block: mining::DEFAULT_REWARD_PER_BLOCK.to_string(),
            reward_precision: mining::DEFAULT_REWARD_PRECISION.to_string(),
            emission_budget: None,
        }
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            genesis_block: 0,
            genesis_timestamp: chain::DEFAULT_GENESIS_TIMESTAMP,
            block_time_secs: chain::DEFAULT_BLOCK_TIME_SECS,
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            registry: Address::from_low_u64_be(0xfac0_0001),
            router: Address::from_low_u64_be(0xfac0_0002),
            wrapped_native: Address::from_low_u64_be(0xfac0_0003),
            mining_ledger: Address::from_low_u64_be(0xfac0_0004),
            reward_token: Address::from_low_u64_be(0xfac0_0005),
            operator: Address::from_low_u64_be(0x0a11ce),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl MiningSettings {
    pub fn reward_per_block(&self) -> Result<U256> {
        parse_amount(&self.reward_per_block).context("Invalid mining.reward_per_block")
    }

    pub fn reward_precision(&self) -> Result<U256> {
        parse_amount(&self.reward_precision).context("Invalid mining.reward_precision")
    }

    pub fn emission_budget(&self) -> Result<Option<U256>> {
        self.emission_budget
            .as_deref()
            .map(parse_amount)
            .transpose()
            .context("Invalid mining.emission_budget")
    }
}

fn parse_amount(raw: &str) -> Result<U256> {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    U256::from_dec_str(cleaned.trim()).map_err(|e| anyhow::anyhow!("{:?}: {}", e, raw))
}

impl ExchangeConfig {
    /// Load configuration: defaults, then `path` if given, then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&ExchangeConfig::default()).context("Failed to encode defaults")?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            info!("Loading exchange config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("HASHSWAP")
                .prefix_separator("__")
                .separator("__"),
        );

        let config: ExchangeConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!("Exchange config: {:?}", config);
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults, without the environment
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: ExchangeConfig = toml::from_str(raw).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.amm.fee_bps >= protocol::FEE_DENOMINATOR {
            bail!(
                "amm.fee_bps must be below {}, got {}",
                protocol::FEE_DENOMINATOR,
                self.amm.fee_bps
            );
        }
        if self.mining.reward_precision()?.is_zero() {
            bail!("mining.reward_precision must be non-zero");
        }
        self.mining.reward_per_block()?;
        self.mining.emission_budget()?;
        if self.chain.block_time_secs == 0 {
            bail!("chain.block_time_secs must be non-zero");
        }

        let d = &self.deployment;
        let addresses = [
            d.registry,
            d.router,
            d.wrapped_native,
            d.mining_ledger,
            d.reward_token,
            d.operator,
        ];
        if addresses.iter().any(|a| a.is_zero()) {
            bail!("deployment addresses must be non-zero");
        }
        let unique: HashSet<_> = addresses.iter().collect();
        if unique.len() != addresses.len() {
            bail!("deployment addresses must be distinct");
        }
        Ok(())
    }
}

/// Convenience function to load configuration from an optional file
pub fn load_config(path: Option<&Path>) -> Result<ExchangeConfig> {
    ExchangeConfig::load(path)
}
