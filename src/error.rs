//! Error types for the allocation engine.

use std::path::PathBuf;
use std::time::Duration;

use time::Date;

use crate::types::Symbol;

/// Everything that can abort a run.
///
/// There is no partial-success mode: any of these stops the run before a
/// plan is produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{symbol}: price history provider failed: {message}")]
    Provider { symbol: Symbol, message: String },

    #[error("{symbol}: price history provider did not answer within {timeout:?}")]
    ProviderUnavailable { symbol: Symbol, timeout: Duration },

    #[error("{symbol}: malformed price history: {reason}")]
    DataIntegrity { symbol: Symbol, reason: String },

    #[error("{symbol}: stale prices, latest close {latest} is over {max_days} days before {as_of}")]
    StaleData {
        symbol: Symbol,
        latest: Date,
        as_of: Date,
        max_days: u32,
    },

    #[error("{symbol}: insufficient price history, need {needed} closes but got {got}")]
    InsufficientHistory {
        symbol: Symbol,
        needed: usize,
        got: usize,
    },

    #[error("{symbol}: volatility is zero, inverse-volatility weight is undefined")]
    ZeroVolatility { symbol: Symbol },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("failed to build table: {0}")]
    Frame(#[from] polars::error::PolarsError),
}

impl Error {
    /// Symbol the error is attributed to, if any.
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Error::Provider { symbol, .. }
            | Error::ProviderUnavailable { symbol, .. }
            | Error::DataIntegrity { symbol, .. }
            | Error::StaleData { symbol, .. }
            | Error::InsufficientHistory { symbol, .. }
            | Error::ZeroVolatility { symbol } => Some(symbol),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
