//! TOML configuration loading and validation.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration. Every field has a default, so an empty file
/// (or no file at all) yields the reference parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub estimator: EstimatorConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Number of daily log-returns in the volatility window.
    pub window_size: usize,
    pub trading_days_per_year: u32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            trading_days_per_year: 252,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Maximum calendar days between the latest close and the as-of date.
    pub max_staleness_days: u32,
    pub fetch_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            max_staleness_days: 4,
            fetch_timeout_secs: 30,
            max_concurrent_fetches: 4,
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.estimator.window_size < 2 {
            return Err(Error::Config(
                "window_size must be >= 2 (sample deviation needs two returns)".into(),
            ));
        }
        if self.estimator.trading_days_per_year == 0 {
            return Err(Error::Config("trading_days_per_year must be > 0".into()));
        }
        if self.provider.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be > 0".into()));
        }
        if self.provider.max_concurrent_fetches == 0 {
            return Err(Error::Config("max_concurrent_fetches must be >= 1".into()));
        }
        Ok(())
    }

    /// Closes needed for one estimate: `window_size` returns need one extra price.
    pub fn required_closes(&self) -> usize {
        self.estimator.window_size + 1
    }

    /// Calendar days of history to request so that `required_closes`
    /// trading days survive weekends, holidays and the staleness lag.
    pub fn lookback_calendar_days(&self) -> i64 {
        let trading = self.required_closes() as f64 * 1.4;
        (trading + self.provider.max_staleness_days as f64).ceil() as i64
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.fetch_timeout_secs)
    }
}
