//! Current holdings and where they come from.

use dialoguer::Input;

use crate::error::{Error, Result};
use crate::safe_money::Usd;
use crate::types::Symbol;

/// What the account holds before rebalancing.
#[derive(Debug, Clone, PartialEq)]
pub struct Holdings {
    /// Share count per instrument, in instrument order. May be fractional.
    pub shares: Vec<f64>,
    pub cash: Usd,
    /// Minimum cash to retain after rebalancing.
    pub cash_reserve: Usd,
}

impl Holdings {
    pub fn new(shares: Vec<f64>, cash: f64, cash_reserve: f64) -> Self {
        Self {
            shares,
            cash: Usd::new(cash),
            cash_reserve: Usd::new(cash_reserve),
        }
    }

    /// Check holdings against the instruments they belong to.
    pub fn validate(&self, symbols: &[Symbol]) -> Result<()> {
        if self.shares.len() != symbols.len() {
            return Err(Error::InvalidInput(format!(
                "got {} share counts for {} symbols",
                self.shares.len(),
                symbols.len()
            )));
        }
        for (symbol, &shares) in symbols.iter().zip(&self.shares) {
            check_amount(&format!("{symbol} quantity"), shares)?;
        }
        check_amount("cash", self.cash.amount)?;
        check_amount("cash reserve", self.cash_reserve.amount)?;
        Ok(())
    }
}

fn check_amount(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidInput(format!(
            "{what} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

/// Supplies current share counts and cash to the rebalancer.
pub trait HoldingsSource {
    fn holdings(&mut self, symbols: &[Symbol]) -> Result<Holdings>;
}

/// Holdings fixed up front, e.g. from command-line flags. Invalid values
/// are fatal.
#[derive(Debug, Clone)]
pub struct FixedHoldings(pub Holdings);

impl FixedHoldings {
    /// Build from a comma-separated share list such as `"10, 2.5"`.
    pub fn parse(shares: &str, cash: f64, cash_reserve: f64) -> Result<Self> {
        let shares = shares
            .split(',')
            .map(|s| {
                let s = s.trim();
                s.parse::<f64>()
                    .map_err(|_| Error::InvalidInput(format!("'{s}' is not a share count")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(Holdings::new(shares, cash, cash_reserve)))
    }
}

impl HoldingsSource for FixedHoldings {
    fn holdings(&mut self, symbols: &[Symbol]) -> Result<Holdings> {
        self.0.validate(symbols)?;
        Ok(self.0.clone())
    }
}

/// Asks on the terminal, re-prompting until each answer is a non-negative
/// number.
#[derive(Debug, Default)]
pub struct PromptHoldings;

impl PromptHoldings {
    fn ask(prompt: &str) -> Result<f64> {
        let value = Input::<f64>::new()
            .with_prompt(prompt)
            .validate_with(|v: &f64| -> std::result::Result<(), &str> {
                if v.is_finite() && *v >= 0.0 {
                    Ok(())
                } else {
                    Err("must be a non-negative number")
                }
            })
            .interact_text()?;
        Ok(value)
    }
}

impl HoldingsSource for PromptHoldings {
    fn holdings(&mut self, symbols: &[Symbol]) -> Result<Holdings> {
        let shares = symbols
            .iter()
            .map(|s| Self::ask(&format!("{s} Quantity")))
            .collect::<Result<Vec<_>>>()?;
        let cash = Self::ask("Cash")?;
        let cash_reserve = Self::ask("Minimal cash wish to keep")?;

        let holdings = Holdings::new(shares, cash, cash_reserve);
        holdings.validate(symbols)?;
        Ok(holdings)
    }
}
