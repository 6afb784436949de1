//! Configuration management for the liquidity API

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::whirlpool::{ORCA_WHIRLPOOLS_CONFIG, ORCA_WHIRLPOOL_PROGRAM_ID};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub rpc: RpcConfig,
    pub whirlpools: WhirlpoolsConfig,
    pub trading: TradingConfig,
    pub api: ApiConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RpcConfig {
    #[validate(url)]
    pub url: String,
    pub commitment: String,
    #[validate(range(min = 1, max = 60))]
    pub connect_timeout_secs: u64,
    #[validate(range(min = 1, max = 300))]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WhirlpoolsConfig {
    pub program_id: String,
    pub config_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TradingConfig {
    /// Advise clients to submit swaps through a private relay instead of the public mempool
    pub use_private_relay: bool,
    /// Slippage applied when a swap request does not carry one
    #[validate(range(min = 1, max = 1000))]
    pub default_slippage_bps: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: String,
    pub enable_cors: bool,
    #[validate(range(min = 5, max = 300))]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub structured_logging: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: "confirmed".to_string(),
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
        }
    }
}

impl Default for WhirlpoolsConfig {
    fn default() -> Self {
        Self {
            program_id: ORCA_WHIRLPOOL_PROGRAM_ID.to_string(),
            config_address: ORCA_WHIRLPOOLS_CONFIG.to_string(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            use_private_relay: false,
            default_slippage_bps: 50,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3001".to_string(),
            enable_cors: true,
            request_timeout_secs: 30,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            structured_logging: false,
        }
    }
}

impl RpcConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl WhirlpoolsConfig {
    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .with_context(|| format!("Invalid Whirlpool program id: {}", self.program_id))
    }

    pub fn config_address(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.config_address)
            .with_context(|| format!("Invalid WhirlpoolsConfig address: {}", self.config_address))
    }
}

impl ServiceConfig {
    /// Parse configuration from file
    ///
    /// Values are not validated here; overrides may still replace them, so
    /// callers run [`ServiceConfig::check`] once every source is applied.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse `path`, apply overrides from `lookup`, then validate the result
    pub fn load<F>(path: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(lookup);
        config.check()?;
        Ok(config)
    }

    /// Apply `RPC_URL`, `USE_PRIVATE_RELAY` and `BIND_ADDRESS` from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(flag) = lookup("USE_PRIVATE_RELAY") {
            self.trading.use_private_relay = flag == "true";
        }
        if let Some(address) = lookup("BIND_ADDRESS") {
            self.api.bind_address = address;
        }
    }

    /// Validate every section
    pub fn check(&self) -> Result<()> {
        self.rpc.validate()?;
        self.whirlpools.validate()?;
        self.trading.validate()?;
        self.api.validate()?;
        self.monitoring.validate()?;

        self.whirlpools.program_id()?;
        self.whirlpools.config_address()?;
        if self.api.bind_address.is_empty() {
            return Err(anyhow::anyhow!("API bind address cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(
            config.whirlpools.program_id().unwrap(),
            ORCA_WHIRLPOOL_PROGRAM_ID
        );
        assert!(!config.trading.use_private_relay);
    }

    #[test]
    fn test_private_relay_requires_literal_true() {
        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| (key == "USE_PRIVATE_RELAY").then(|| "true".to_string()));
        assert!(config.trading.use_private_relay);

        config.apply_overrides(|key| (key == "USE_PRIVATE_RELAY").then(|| "1".to_string()));
        assert!(!config.trading.use_private_relay);
    }

    #[test]
    fn test_rejects_invalid_rpc_url() {
        let mut config = ServiceConfig::default();
        config.rpc.url = "not a url".to_string();
        assert!(config.check().is_err());
    }

    #[test]
    fn test_rejects_bad_program_id() {
        let mut config = ServiceConfig::default();
        config.whirlpools.program_id = "whirlpool".to_string();
        assert!(config.check().is_err());
    }
}
