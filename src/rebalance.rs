//! CURRENT→TARGET share plan.
//!
//! Turns target weights, latest prices and current holdings into whole-share
//! targets. Targets are always rounded down: leftover cash is preferred over
//! a cash shortfall, so the plan never spends more than one share's price
//! per instrument beyond the reserve.

use std::fmt;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::holdings::Holdings;
use crate::safe_money::Usd;
use crate::types::Symbol;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "buy"),
            Action::Sell => write!(f, "sell"),
            Action::Hold => write!(f, "no change"),
        }
    }
}

/// One instrument's line in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: Symbol,
    pub action: Action,
    pub price: Usd,
    pub current_shares: f64,
    pub target_shares: u64,
    /// `target_shares - current_shares`; positive buys, negative sells.
    pub delta: f64,
    /// Target position value as a percentage of total value (reserve included).
    pub target_percent: f64,
    /// The computed target was negative and was raised to zero.
    pub clamped: bool,
}

/// Conditions that do not stop the plan but should be shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The cash reserve exceeds total portfolio value.
    NegativeInvestable { investable: Usd },
    ClampedTarget { symbol: Symbol },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NegativeInvestable { investable } => write!(
                f,
                "cash reserve exceeds portfolio value (investable value {investable}), \
                 everything is sold"
            ),
            Warning::ClampedTarget { symbol } => {
                write!(f, "{symbol}: negative target share count clamped to 0")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    pub trades: Vec<Trade>,
    /// Cash plus market value of current holdings.
    pub total_value: Usd,
    /// Total value minus the cash reserve.
    pub investable_value: Usd,
    pub resulting_cash: Usd,
    pub warnings: Vec<Warning>,
}

impl RebalancePlan {
    /// Market value of the target holdings.
    pub fn target_holdings_value(&self) -> Usd {
        self.trades
            .iter()
            .map(|t| t.price * t.target_shares as f64)
            .sum()
    }
}

/// Compute the whole-share plan moving `holdings` to `weights`.
///
/// `symbols`, `weights` and `prices` are parallel slices in instrument order;
/// the plan preserves that order.
pub fn plan(
    symbols: &[Symbol],
    weights: &[f64],
    prices: &[Usd],
    holdings: &Holdings,
) -> Result<RebalancePlan> {
    if weights.len() != symbols.len() || prices.len() != symbols.len() {
        return Err(Error::InvalidInput(format!(
            "{} symbols, {} weights and {} prices do not line up",
            symbols.len(),
            weights.len(),
            prices.len()
        )));
    }
    holdings.validate(symbols)?;
    for ((symbol, &w), price) in symbols.iter().zip(weights).zip(prices) {
        if !(w.is_finite() && w >= 0.0) {
            return Err(Error::InvalidInput(format!("{symbol}: weight {w} is not valid")));
        }
        if !(price.amount.is_finite() && price.amount > 0.0) {
            return Err(Error::InvalidInput(format!("{symbol}: price {price} is not valid")));
        }
    }

    let total_value = prices
        .iter()
        .zip(&holdings.shares)
        .fold(holdings.cash, |acc, (&price, &shares)| acc + price * shares);
    let investable_value = total_value - holdings.cash_reserve;

    let mut warnings = Vec::new();
    if investable_value.is_negative() {
        warn!(
            "Cash reserve {} exceeds portfolio value {}",
            holdings.cash_reserve, total_value
        );
        warnings.push(Warning::NegativeInvestable {
            investable: investable_value,
        });
    }

    let trades: Vec<Trade> = symbols
        .iter()
        .zip(weights)
        .zip(prices)
        .zip(&holdings.shares)
        .map(|(((symbol, &weight), &price), &current_shares)| {
            let raw = (investable_value.amount * weight / price.amount).floor();
            let clamped = raw < 0.0;
            let target_shares = if clamped { 0 } else { raw as u64 };
            let delta = target_shares as f64 - current_shares;

            let target_percent = if total_value.amount > 0.0 {
                target_shares as f64 * price.amount * 100.0 / total_value.amount
            } else {
                0.0
            };
            let action = if delta > 0.0 {
                Action::Buy
            } else if delta < 0.0 {
                Action::Sell
            } else {
                Action::Hold
            };

            Trade {
                symbol: symbol.clone(),
                action,
                price,
                current_shares,
                target_shares,
                delta,
                target_percent,
                clamped,
            }
        })
        .collect();

    for t in trades.iter().filter(|t| t.clamped) {
        warn!("{}: target share count clamped to 0", t.symbol);
        warnings.push(Warning::ClampedTarget {
            symbol: t.symbol.clone(),
        });
    }

    let resulting_cash = trades
        .iter()
        .fold(holdings.cash, |cash, t| cash - t.price * t.delta);

    info!(
        "Plan: total value {}, investable {}, cash {} -> {}",
        total_value, investable_value, holdings.cash, resulting_cash
    );

    Ok(RebalancePlan {
        trades,
        total_value,
        investable_value,
        resulting_cash,
        warnings,
    })
}
