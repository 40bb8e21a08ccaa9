//! inverse_volatility: risk-parity style allocation from recent daily closes.
//!
//! Pipeline: price history provider → volatility and performance estimate →
//! inverse-volatility weights → whole-share rebalance plan.

pub mod allocate;
pub mod assets;
pub mod config;
pub mod error;
pub mod estimate;
pub mod holdings;
pub mod portfolio;
pub mod rebalance;
pub mod report;
pub mod safe_money;
pub mod types;
