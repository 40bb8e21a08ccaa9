use futures::{stream, StreamExt, TryStreamExt};
use log::info;
use polars::prelude::*;
use time::{Date, Duration, OffsetDateTime};

use crate::allocate::inverse_volatility_weights;
use crate::assets::PriceHistoryProvider;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::estimate::{estimate, Estimate};
use crate::holdings::Holdings;
use crate::rebalance::{self, RebalancePlan};
use crate::safe_money::Usd;
use crate::types::{PriceSeries, Symbol};

/// Symbols allocated when none are given: a leveraged equity/treasury pair.
pub const DEFAULT_SYMBOLS: &str = "UPRO,TMF";

/// One allocated instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub symbol: Symbol,
    /// Date of the close `estimate.latest_price` was taken from.
    pub latest_date: Date,
    pub estimate: Estimate,
    pub weight: f64,
}

/// Instruments with their inverse-volatility target weights, in input order.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub as_of: Date,
    pub window_size: usize,
    pub instruments: Vec<Instrument>,
}

impl Portfolio {
    pub fn builder() -> PortfolioBuilder {
        PortfolioBuilder::new()
    }

    /// Estimate and allocate already-validated series.
    pub fn from_series(series: &[PriceSeries], as_of: Date, config: &Config) -> Result<Self> {
        let estimated: Vec<(Symbol, Date, Estimate)> = series
            .iter()
            .map(|s| -> Result<(Symbol, Date, Estimate)> {
                Ok((s.symbol().clone(), s.latest().date, estimate(s, config)?))
            })
            .collect::<Result<_>>()?;
        Self::from_estimates(estimated, as_of, config)
    }

    fn from_estimates(
        estimated: Vec<(Symbol, Date, Estimate)>,
        as_of: Date,
        config: &Config,
    ) -> Result<Self> {
        let volatilities: Vec<(Symbol, f64)> = estimated
            .iter()
            .map(|(symbol, _, e)| (symbol.clone(), e.volatility))
            .collect();
        let weights = inverse_volatility_weights(&volatilities)?;

        let instruments = estimated
            .into_iter()
            .zip(weights)
            .map(|((symbol, latest_date, estimate), weight)| Instrument {
                symbol,
                latest_date,
                estimate,
                weight,
            })
            .collect();

        Ok(Self {
            as_of,
            window_size: config.estimator.window_size,
            instruments,
        })
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.instruments.iter().map(|i| i.symbol.clone()).collect()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.instruments.iter().map(|i| i.weight).collect()
    }

    pub fn prices(&self) -> Vec<Usd> {
        self.instruments
            .iter()
            .map(|i| Usd::new(i.estimate.latest_price))
            .collect()
    }

    /// Whole-share plan moving `holdings` to this portfolio's weights.
    pub fn rebalance(&self, holdings: &Holdings) -> Result<RebalancePlan> {
        rebalance::plan(&self.symbols(), &self.weights(), &self.prices(), holdings)
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let column =
            |f: fn(&Instrument) -> f64| -> Vec<f64> { self.instruments.iter().map(f).collect() };
        let symbols: Vec<String> = self
            .instruments
            .iter()
            .map(|i| i.symbol.to_string())
            .collect();
        let weights: Vec<f64> = self.weights();
        let prices = column(|i| i.estimate.latest_price);
        let volatilities = column(|i| i.estimate.volatility);
        let performances = column(|i| i.estimate.performance);
        Ok(df!(
            "symbol" => symbols,
            "weight" => weights,
            "price" => prices,
            "volatility" => volatilities,
            "performance" => performances
        )?)
    }
}

pub struct PortfolioBuilder {
    symbols: Vec<Symbol>,
    config: Config,
    as_of: Option<Date>,
}

impl Default for PortfolioBuilder {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            config: Config::default(),
            as_of: None,
        }
    }
}

impl PortfolioBuilder {
    pub fn new() -> PortfolioBuilder {
        PortfolioBuilder::default()
    }

    pub fn symbols(mut self, symbols: Vec<Symbol>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Date the staleness check is measured against. Defaults to today (UTC).
    pub fn as_of(mut self, as_of: Date) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Fetch history for every symbol, estimate, and allocate.
    ///
    /// Fetches run concurrently up to `max_concurrent_fetches`; results keep
    /// symbol order and the first failure aborts the build.
    pub async fn build<P: PriceHistoryProvider>(self, provider: &P) -> Result<Portfolio> {
        self.config.validate()?;
        let symbols = if self.symbols.is_empty() {
            Symbol::parse_list(DEFAULT_SYMBOLS)?
        } else {
            self.symbols
        };
        let as_of = self.as_of.unwrap_or_else(|| OffsetDateTime::now_utc().date());
        let start = as_of - Duration::days(self.config.lookback_calendar_days());
        let config = &self.config;

        info!(
            "Building portfolio of {} symbols from {} as of {as_of}",
            symbols.len(),
            provider.name()
        );

        let estimated: Vec<(Symbol, Date, Estimate)> = stream::iter(symbols.iter())
            .map(|symbol| fetch_and_estimate(provider, symbol, start, as_of, config))
            .buffered(config.provider.max_concurrent_fetches)
            .try_collect()
            .await?;

        Portfolio::from_estimates(estimated, as_of, config)
    }
}

async fn fetch_and_estimate<P: PriceHistoryProvider>(
    provider: &P,
    symbol: &Symbol,
    start: Date,
    as_of: Date,
    config: &Config,
) -> Result<(Symbol, Date, Estimate)> {
    let timeout = config.fetch_timeout();
    let points = tokio::time::timeout(timeout, provider.fetch_daily_closes(symbol, start, as_of))
        .await
        .map_err(|_| Error::ProviderUnavailable {
            symbol: symbol.clone(),
            timeout,
        })??;

    let series = PriceSeries::new(symbol.clone(), points, as_of, config)?;
    Ok((symbol.clone(), series.latest().date, estimate(&series, config)?))
}
