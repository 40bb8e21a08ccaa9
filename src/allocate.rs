//! Inverse-volatility portfolio weights.
//!
//! `weight[i] = (1 / vol[i]) / sum_j(1 / vol[j])`
//!
//! This is the closed-form equal-risk-contribution solution under the
//! assumption that instruments are uncorrelated. No covariance term is
//! estimated: correlated instruments (e.g. two equity ETFs) will carry more
//! combined risk than their weights suggest. That simplification is the
//! model, not a numerical approximation.

use crate::error::{Error, Result};
use crate::types::Symbol;

/// Tolerance for the weights-sum-to-one invariant.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Compute normalized inverse-volatility weights, in input order.
///
/// Fails with [`Error::ZeroVolatility`] for a volatility of exactly zero and
/// with [`Error::InvalidInput`] for negative or non-finite volatilities or an
/// empty input.
pub fn inverse_volatility_weights(volatilities: &[(Symbol, f64)]) -> Result<Vec<f64>> {
    if volatilities.is_empty() {
        return Err(Error::InvalidInput("no instruments to allocate".into()));
    }

    let inverses = volatilities
        .iter()
        .map(|(symbol, vol)| {
            if *vol == 0.0 {
                Err(Error::ZeroVolatility {
                    symbol: symbol.clone(),
                })
            } else if !vol.is_finite() || *vol < 0.0 {
                Err(Error::InvalidInput(format!(
                    "{symbol}: volatility {vol} is not a positive number"
                )))
            } else {
                Ok(1.0 / vol)
            }
        })
        .collect::<Result<Vec<f64>>>()?;

    let sum_inverse: f64 = inverses.iter().sum();
    let weights: Vec<f64> = inverses.iter().map(|inv| inv / sum_inverse).collect();

    debug_assert!(
        (weights.iter().sum::<f64>() - 1.0).abs() < WEIGHT_SUM_TOLERANCE,
        "Weights do not add up to 1"
    );
    Ok(weights)
}
