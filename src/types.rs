use std::collections::HashSet;
use std::fmt;

use log::debug;
use time::Date;

use crate::config::Config;
use crate::error::{Error, Result};

/// Instrument identifier, always trimmed and upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(Error::InvalidInput("empty symbol".into()));
        }
        if symbol.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(Error::InvalidInput(format!(
                "symbol '{symbol}' contains a separator"
            )));
        }
        Ok(Self(symbol))
    }

    /// Parse a comma-separated list such as `"upro, tmf"`, preserving order.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        let symbols = raw
            .split(',')
            .map(Symbol::parse)
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        for s in &symbols {
            if !seen.insert(s) {
                return Err(Error::InvalidInput(format!("duplicate symbol: {s}")));
            }
        }
        Ok(symbols)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One daily close as delivered by a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: Date,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: Date, close: f64) -> Self {
        Self { date, close }
    }
}

/// Validated, chronologically ascending daily closes for one instrument.
///
/// Holding a `PriceSeries` means: every close is finite and positive, the
/// dates strictly increase, the latest close is recent relative to the
/// as-of date, and there are enough closes for one volatility window.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: Symbol,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(
        symbol: Symbol,
        points: Vec<PricePoint>,
        as_of: Date,
        config: &Config,
    ) -> Result<Self> {
        let integrity = |reason: String| Error::DataIntegrity {
            symbol: symbol.clone(),
            reason,
        };

        let Some(latest) = points.last() else {
            return Err(integrity("provider returned no closes".into()));
        };

        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(integrity(format!(
                    "dates not strictly ascending ({} followed by {})",
                    pair[0].date, pair[1].date
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
            return Err(integrity(format!(
                "close {} on {} is not a positive price",
                bad.close, bad.date
            )));
        }

        let lag = (as_of - latest.date).whole_days();
        let max_days = config.provider.max_staleness_days;
        if lag > i64::from(max_days) {
            return Err(Error::StaleData {
                symbol,
                latest: latest.date,
                as_of,
                max_days,
            });
        }
        if lag < 0 {
            debug!("{symbol}: latest close {} is after as-of date {as_of}", latest.date);
        }

        let needed = config.required_closes();
        if points.len() < needed {
            return Err(Error::InsufficientHistory {
                symbol,
                needed,
                got: points.len(),
            });
        }

        Ok(Self { symbol, points })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn latest(&self) -> &PricePoint {
        // non-empty by construction
        &self.points[self.points.len() - 1]
    }

    /// Closes from most recent to oldest.
    pub fn closes_newest_first(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().rev().map(|p| p.close)
    }

    /// Number of daily closes held.
    pub fn close_count(&self) -> usize {
        self.points.len()
    }
}
