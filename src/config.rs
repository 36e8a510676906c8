//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. The executor's private key is
//! only ever read from the `EXECUTOR_PRIVATE_KEY` environment variable.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use crate::domain::{BASE_GAS, DEFAULT_GAS_CEILING};
use crate::error::{ConfigError, Result};
use crate::service::MonitorSettings;

/// Environment variable holding the executor key.
pub const PRIVATE_KEY_ENV: &str = "EXECUTOR_PRIVATE_KEY";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub recipe: RecipeConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Loaded from `EXECUTOR_PRIVATE_KEY` at runtime, never from the file.
    #[serde(skip)]
    pub private_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// 1 for mainnet. Defaults to mainnet since the registry lives there.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Contract registry used to resolve executor addresses by name.
    #[serde(default)]
    pub registry: Option<Address>,
}

const fn default_chain_id() -> u64 {
    1
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".into()
}

fn default_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

impl LoggingConfig {
    /// Initialize the tracing subscriber. `RUST_LOG` overrides the level.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RecipeConfig {
    #[serde(default = "default_gas_ceiling")]
    pub gas_ceiling: u64,
}

const fn default_gas_ceiling() -> u64 {
    DEFAULT_GAS_CEILING
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            gas_ceiling: default_gas_ceiling(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: u64,
    #[serde(default = "default_price_tolerance_bps")]
    pub price_tolerance_bps: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Feed registry contract, required by `feeds`.
    #[serde(default)]
    pub feed_registry: Option<Address>,
}

const fn default_staleness_hours() -> u64 {
    24
}

const fn default_price_tolerance_bps() -> u32 {
    100
}

const fn default_concurrency() -> usize {
    8
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            staleness_hours: default_staleness_hours(),
            price_tolerance_bps: default_price_tolerance_bps(),
            concurrency: default_concurrency(),
            feed_registry: None,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            staleness: Duration::from_secs(self.staleness_hours * 60 * 60),
            price_tolerance_bps: self.price_tolerance_bps,
            concurrency: self.concurrency,
        }
    }
}

impl Config {
    /// Read, parse and validate a config file, then pick up the key from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] variant.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&content)?;
        config.private_key = std::env::var(PRIVATE_KEY_ENV).ok();
        Ok(config)
    }

    /// Parse and validate TOML content.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] or a validation error.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.network.rpc_url.is_empty() {
            return Err(ConfigError::MissingField { field: "rpc_url" }.into());
        }
        Url::parse(&self.network.rpc_url).map_err(|e| ConfigError::InvalidValue {
            field: "rpc_url",
            reason: e.to_string(),
        })?;
        if self.network.chain_id == 0 {
            return Err(invalid("chain_id", "must be non-zero"));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("format", "expected \"pretty\" or \"json\""));
        }
        if self.recipe.gas_ceiling <= BASE_GAS {
            return Err(invalid(
                "gas_ceiling",
                &format!("must exceed the base cost of {BASE_GAS}"),
            ));
        }
        if self.monitor.staleness_hours == 0 {
            return Err(invalid("staleness_hours", "must be at least 1"));
        }
        if self.monitor.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const MINIMAL: &str = r#"
        [network]
        rpc_url = "http://localhost:8545"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.network.chain_id, 1);
        assert_eq!(config.recipe.gas_ceiling, DEFAULT_GAS_CEILING);
        assert_eq!(config.monitor.staleness_hours, 24);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.private_key.is_none());
    }

    #[test]
    fn monitor_settings_convert_hours() {
        let config = Config::parse(
            r#"
            [network]
            rpc_url = "http://localhost:8545"

            [monitor]
            staleness_hours = 2
            price_tolerance_bps = 25
            concurrency = 4
            feed_registry = "0x47Fb2585D2C56Fe188D0E6ec628a38b74fCeeeDf"
            "#,
        )
        .unwrap();
        let settings = config.monitor.settings();
        assert_eq!(settings.staleness, Duration::from_secs(7_200));
        assert_eq!(settings.price_tolerance_bps, 25);
        assert!(config.monitor.feed_registry.is_some());
    }

    #[test]
    fn rejects_bad_rpc_url() {
        let err = Config::parse(
            r#"
            [network]
            rpc_url = "not a url"
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field: "rpc_url", .. })
        ));
    }

    #[test]
    fn rejects_ceiling_below_base_cost() {
        let err = Config::parse(
            r#"
            [network]
            rpc_url = "http://localhost:8545"

            [recipe]
            gas_ceiling = 1000
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "gas_ceiling",
                ..
            })
        ));
    }

    #[test]
    fn missing_network_is_parse_error() {
        let err = Config::parse("[logging]\nlevel = \"debug\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
