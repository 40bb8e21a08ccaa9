//! End-to-end runs of the provider → estimator → allocator → rebalancer
//! pipeline against an in-memory provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use inverse_volatility::assets::PriceHistoryProvider;
use inverse_volatility::config::Config;
use inverse_volatility::error::{Error, Result};
use inverse_volatility::holdings::{FixedHoldings, HoldingsSource};
use inverse_volatility::portfolio::Portfolio;
use inverse_volatility::rebalance::Action;
use inverse_volatility::types::{PricePoint, Symbol};
use time::macros::date;
use time::{Date, Duration};

const AS_OF: Date = date!(2024 - 03 - 15);

/// Serves canned closes; symbols without data fail like a 404.
#[derive(Default)]
struct StaticProvider {
    closes: HashMap<String, Vec<PricePoint>>,
    delay: Option<StdDuration>,
    calls: AtomicUsize,
}

impl StaticProvider {
    fn with(mut self, symbol: &str, points: Vec<PricePoint>) -> Self {
        self.closes.insert(symbol.to_string(), points);
        self
    }
}

impl PriceHistoryProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_daily_closes(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
    ) -> Result<Vec<PricePoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let points = self.closes.get(symbol.as_str()).ok_or_else(|| Error::Provider {
            symbol: symbol.clone(),
            message: "HTTP 404".into(),
        })?;
        Ok(points
            .iter()
            .copied()
            .filter(|p| p.date >= start && p.date <= end)
            .collect())
    }
}

/// Weekday closes ending at `last`, oldest first, alternating around `base`
/// by `swing` so the series has a known, non-zero volatility.
fn weekday_closes(last: Date, count: usize, base: f64, swing: f64) -> Vec<PricePoint> {
    let mut dates = Vec::with_capacity(count);
    let mut d = last;
    while dates.len() < count {
        if d.weekday().number_days_from_monday() < 5 {
            dates.push(d);
        }
        d = d - Duration::days(1);
    }
    dates.reverse();
    dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| PricePoint::new(date, if i % 2 == 0 { base } else { base + swing }))
        .collect()
}

fn symbols(list: &str) -> Vec<Symbol> {
    Symbol::parse_list(list).unwrap()
}

#[tokio::test]
async fn full_run_produces_ordered_plan() {
    let provider = StaticProvider::default()
        .with("UPRO", weekday_closes(AS_OF, 23, 60.0, 3.0))
        .with("TMF", weekday_closes(AS_OF, 23, 50.0, 1.0));

    let portfolio = Portfolio::builder()
        .symbols(symbols("UPRO,TMF"))
        .as_of(AS_OF)
        .build(&provider)
        .await
        .unwrap();

    assert_eq!(portfolio.symbols(), symbols("UPRO,TMF"));
    let w = portfolio.weights();
    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    // TMF swings less relative to its price
    assert!(w[1] > w[0]);

    let mut holdings = FixedHoldings::parse("10,5", 2000.0, 100.0).unwrap();
    let holdings = holdings.holdings(&portfolio.symbols()).unwrap();
    let plan = portfolio.rebalance(&holdings).unwrap();

    assert_eq!(plan.trades.len(), 2);
    assert_eq!(plan.trades[0].symbol.as_str(), "UPRO");
    assert!(plan.trades.iter().all(|t| t.action == Action::Buy));
    let prices: f64 = portfolio.prices().iter().map(|p| p.amount).sum();
    assert!(plan.resulting_cash.amount >= 100.0 - prices);
    assert!(plan.warnings.is_empty());
}

#[tokio::test]
async fn order_is_preserved_with_concurrent_fetches() {
    let names = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];
    let mut provider = StaticProvider::default();
    for (i, name) in names.iter().enumerate() {
        provider = provider.with(name, weekday_closes(AS_OF, 21, 100.0, 1.0 + i as f64));
    }

    let mut config = Config::default();
    config.provider.max_concurrent_fetches = 3;
    let portfolio = Portfolio::builder()
        .symbols(symbols(&names.join(",")))
        .config(config)
        .as_of(AS_OF)
        .build(&provider)
        .await
        .unwrap();

    let got: Vec<String> = portfolio.symbols().iter().map(|s| s.to_string()).collect();
    assert_eq!(got, names);
    // bigger swing, lower weight
    let w = portfolio.weights();
    assert!(w.windows(2).all(|p| p[0] > p[1]));
    assert_eq!(provider.calls.load(Ordering::SeqCst), names.len());
}

#[tokio::test]
async fn missing_symbol_aborts_run() {
    let provider = StaticProvider::default().with("UPRO", weekday_closes(AS_OF, 21, 60.0, 3.0));
    let err = Portfolio::builder()
        .symbols(symbols("UPRO,NOPE"))
        .as_of(AS_OF)
        .build(&provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert_eq!(err.symbol().map(Symbol::as_str), Some("NOPE"));
}

#[tokio::test]
async fn stale_history_is_rejected() {
    let last = AS_OF - Duration::days(5);
    let provider = StaticProvider::default().with("SPY", weekday_closes(last, 21, 400.0, 2.0));
    let err = Portfolio::builder()
        .symbols(symbols("SPY"))
        .as_of(AS_OF)
        .build(&provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StaleData { .. }), "{err}");
}

#[tokio::test]
async fn short_history_is_insufficient() {
    let provider = StaticProvider::default().with("SPY", weekday_closes(AS_OF, 12, 400.0, 2.0));
    let err = Portfolio::builder()
        .symbols(symbols("SPY"))
        .as_of(AS_OF)
        .build(&provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientHistory { needed: 21, got: 12, .. }));
}

#[tokio::test]
async fn flat_history_is_zero_volatility() {
    let provider = StaticProvider::default()
        .with("SPY", weekday_closes(AS_OF, 21, 400.0, 2.0))
        .with("BIL", weekday_closes(AS_OF, 21, 91.5, 0.0));
    let err = Portfolio::builder()
        .symbols(symbols("SPY,BIL"))
        .as_of(AS_OF)
        .build(&provider)
        .await
        .unwrap_err();
    match err {
        Error::ZeroVolatility { symbol } => assert_eq!(symbol.as_str(), "BIL"),
        other => panic!("expected zero volatility, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out() {
    let provider = StaticProvider {
        delay: Some(StdDuration::from_secs(120)),
        ..StaticProvider::default()
    }
    .with("SPY", weekday_closes(AS_OF, 21, 400.0, 2.0));

    let err = Portfolio::builder()
        .symbols(symbols("SPY"))
        .as_of(AS_OF)
        .build(&provider)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable { .. }));
}

#[tokio::test]
async fn empty_symbol_list_uses_default_pair() {
    let provider = StaticProvider::default()
        .with("UPRO", weekday_closes(AS_OF, 21, 60.0, 3.0))
        .with("TMF", weekday_closes(AS_OF, 21, 50.0, 1.0));
    let portfolio = Portfolio::builder().as_of(AS_OF).build(&provider).await.unwrap();
    assert_eq!(portfolio.symbols(), symbols("UPRO,TMF"));
}
