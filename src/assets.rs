//! Daily price history providers.

use log::{debug, info};
use serde_json::Value;
use time::{Date, Duration, OffsetDateTime};
use yahoo_finance_api::YahooConnector;

use crate::error::{Error, Result};
use crate::types::{PricePoint, Symbol};

/// Source of daily closing prices.
///
/// Implementations return closes in ascending date order covering
/// `start..=end` as far as the venue has data; validation against the
/// window and staleness rules happens in [`crate::types::PriceSeries`].
#[allow(async_fn_in_trait)]
pub trait PriceHistoryProvider {
    fn name(&self) -> &'static str;

    async fn fetch_daily_closes(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
    ) -> Result<Vec<PricePoint>>;
}

/// Equities and ETFs from Yahoo Finance.
pub struct YahooProvider {
    client: YahooConnector,
}

impl std::fmt::Debug for YahooProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "YahooProvider")
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooProvider {
    pub fn new() -> Self {
        Self {
            client: YahooConnector::new(),
        }
    }
}

impl PriceHistoryProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_daily_closes(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
    ) -> Result<Vec<PricePoint>> {
        let provider_error = |e: &dyn std::fmt::Display| Error::Provider {
            symbol: symbol.clone(),
            message: e.to_string(),
        };

        let period_start = start.midnight().assume_utc();
        // the end bound is exclusive on Yahoo's side
        let period_end = (end + Duration::days(1)).midnight().assume_utc();
        debug!("Fetching {symbol} from Yahoo, {start} to {end}");

        let res = self
            .client
            .get_quote_history(symbol.as_str(), period_start, period_end)
            .await
            .map_err(|e| provider_error(&e))?;
        let quotes = res.quotes().map_err(|e| provider_error(&e))?;

        let points = quotes
            .iter()
            .map(|q| {
                let date = OffsetDateTime::from_unix_timestamp(q.timestamp as i64)
                    .map_err(|e| Error::DataIntegrity {
                        symbol: symbol.clone(),
                        reason: format!("bad quote timestamp {}: {e}", q.timestamp),
                    })?
                    .date();
                Ok(PricePoint::new(date, q.close))
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Fetched {} closes for {symbol}", points.len());
        Ok(points)
    }
}

/// Crypto assets from CoinGecko, addressed by coin id (`ethereum`,
/// `bitcoin`, ...). Symbols are lower-cased to form the id.
#[derive(Debug, Default)]
pub struct CoinGeckoProvider;

impl PriceHistoryProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_daily_closes(
        &self,
        symbol: &Symbol,
        start: Date,
        end: Date,
    ) -> Result<Vec<PricePoint>> {
        let id = symbol.as_str().to_lowercase();
        let days = ((end - start).whole_days() + 1).to_string();
        debug!("Fetching {id} from CoinGecko, {days} days");

        let res = tokio::task::spawn_blocking(move || {
            rust_gecko::coins::market_chart(&id, "usd", days.as_str(), Some("daily"))
        })
        .await
        .map_err(|e| Error::Provider {
            symbol: symbol.clone(),
            message: e.to_string(),
        })?;

        let json = res.json.as_ref().ok_or_else(|| Error::Provider {
            symbol: symbol.clone(),
            message: "no data received".into(),
        })?;
        let points = parse_market_chart(symbol, json, start, end)?;

        info!("Fetched {} closes for {symbol}", points.len());
        Ok(points)
    }
}

/// Extract daily closes from a CoinGecko `market_chart` body:
/// `{"prices": [[unix_millis, price], ...], ...}`.
///
/// CoinGecko appends a live price after the last midnight point; when two
/// points fall on the same date the later one wins.
pub fn parse_market_chart(
    symbol: &Symbol,
    json: &Value,
    start: Date,
    end: Date,
) -> Result<Vec<PricePoint>> {
    let integrity = |reason: &str| Error::DataIntegrity {
        symbol: symbol.clone(),
        reason: reason.to_string(),
    };

    let prices = json
        .get("prices")
        .and_then(Value::as_array)
        .ok_or_else(|| integrity("missing 'prices' array"))?;

    let mut points: Vec<PricePoint> = Vec::with_capacity(prices.len());
    for entry in prices {
        let pair = entry
            .as_array()
            .filter(|a| a.len() == 2)
            .ok_or_else(|| integrity("price entry is not a [timestamp, price] pair"))?;
        let millis = pair[0]
            .as_f64()
            .ok_or_else(|| integrity("price timestamp is not a number"))?;
        let close = pair[1]
            .as_f64()
            .ok_or_else(|| integrity("price is not a number"))?;
        let date = OffsetDateTime::from_unix_timestamp((millis / 1000.0) as i64)
            .map_err(|_| integrity("price timestamp out of range"))?
            .date();

        if date < start || date > end {
            continue;
        }
        match points.last_mut() {
            Some(last) if last.date == date => last.close = close,
            _ => points.push(PricePoint::new(date, close)),
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    const DAY_MS: i64 = 86_400_000;

    fn eth() -> Symbol {
        Symbol::parse("ethereum").unwrap()
    }

    fn millis(d: Date) -> i64 {
        d.midnight().assume_utc().unix_timestamp() * 1000
    }

    #[test]
    fn parses_daily_points() {
        let d0 = date!(2024 - 02 - 01);
        let body = json!({
            "prices": [
                [millis(d0), 2300.5],
                [millis(d0) + DAY_MS, 2310.0],
                [millis(d0) + 2 * DAY_MS, 2290.25],
            ],
            "market_caps": [],
        });
        let points = parse_market_chart(&eth(), &body, d0, date!(2024 - 02 - 10)).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], PricePoint::new(d0, 2300.5));
        assert_eq!(points[2].date, date!(2024 - 02 - 03));
    }

    #[test]
    fn live_point_replaces_same_day_close() {
        let d0 = date!(2024 - 02 - 01);
        let body = json!({
            "prices": [[millis(d0), 2300.0], [millis(d0) + DAY_MS / 2, 2333.0]],
        });
        let points = parse_market_chart(&eth(), &body, d0, d0).unwrap();
        assert_eq!(points, vec![PricePoint::new(d0, 2333.0)]);
    }

    #[test]
    fn drops_points_outside_range() {
        let d0 = date!(2024 - 02 - 01);
        let body = json!({
            "prices": [[millis(d0) - DAY_MS, 1.0], [millis(d0), 2.0], [millis(d0) + DAY_MS, 3.0]],
        });
        let points = parse_market_chart(&eth(), &body, d0, d0).unwrap();
        assert_eq!(points, vec![PricePoint::new(d0, 2.0)]);
    }

    #[test]
    fn missing_prices_is_integrity_error() {
        let body = json!({ "error": "coin not found" });
        let err = parse_market_chart(&eth(), &body, date!(2024 - 02 - 01), date!(2024 - 02 - 02))
            .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { .. }));
    }

    #[test]
    fn malformed_entry_is_integrity_error() {
        let body = json!({ "prices": [[1706745600000_i64, "2300"]] });
        let err = parse_market_chart(&eth(), &body, date!(2024 - 02 - 01), date!(2024 - 02 - 02))
            .unwrap_err();
        assert!(matches!(err, Error::DataIntegrity { .. }));
    }
}
