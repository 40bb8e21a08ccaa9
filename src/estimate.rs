//! Volatility and trailing-performance estimation from daily closes.

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::PriceSeries;

/// Figures derived from one instrument's price window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Annualized volatility of daily log-returns, as a fraction.
    pub volatility: f64,
    /// Simple return from the oldest close in the window to the latest.
    pub performance: f64,
    pub latest_price: f64,
}

/// Estimate volatility, performance and latest price over the most recent
/// `window_size` returns of `series`.
///
/// Only the newest `window_size + 1` closes are used; older history is
/// ignored. A constant series yields a volatility of exactly zero, which the
/// allocator rejects.
pub fn estimate(series: &PriceSeries, config: &Config) -> Result<Estimate> {
    let window = config.estimator.window_size;
    if series.close_count() < config.required_closes() {
        return Err(Error::InsufficientHistory {
            symbol: series.symbol().clone(),
            needed: config.required_closes(),
            got: series.close_count(),
        });
    }
    let prices: Vec<f64> = series.closes_newest_first().take(window + 1).collect();

    let returns: Vec<f64> = prices.windows(2).map(|p| (p[0] / p[1]).ln()).collect();
    let volatility =
        sample_std_dev(&returns) * f64::from(config.estimator.trading_days_per_year).sqrt();
    let performance = prices[0] / prices[window] - 1.0;

    let estimate = Estimate {
        volatility,
        performance,
        latest_price: prices[0],
    };
    debug!(
        "{}: volatility {:.4}, performance {:.4}, price {:.2}",
        series.symbol(),
        estimate.volatility,
        estimate.performance,
        estimate.latest_price
    );
    Ok(estimate)
}

/// Bessel-corrected standard deviation. Callers guarantee at least two values.
fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    (sum_sq / (n - 1.0)).sqrt()
}
