use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use time::macros::format_description;
use time::Date;

use inverse_volatility::assets::{CoinGeckoProvider, PriceHistoryProvider, YahooProvider};
use inverse_volatility::config::Config;
use inverse_volatility::holdings::{FixedHoldings, HoldingsSource, PromptHoldings};
use inverse_volatility::portfolio::{Portfolio, DEFAULT_SYMBOLS};
use inverse_volatility::report;
use inverse_volatility::types::Symbol;

#[derive(Parser)]
#[command(name = "inverse_volatility")]
#[command(about = "Inverse-volatility allocation and whole-share rebalance plan")]
#[command(version)]
struct Cli {
    /// Comma-separated symbols
    #[arg(default_value = DEFAULT_SYMBOLS)]
    symbols: String,

    /// Where to fetch daily closes
    #[arg(long, value_enum, default_value_t = Source::Yahoo)]
    source: Source,

    /// Date staleness is measured against (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date)]
    as_of: Option<Date>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the volatility window (trading days)
    #[arg(long)]
    window_size: Option<usize>,

    /// Current share counts, comma-separated in symbol order
    #[arg(long, requires = "cash")]
    shares: Option<String>,

    /// Cash on hand; with --shares, skips the interactive prompts
    #[arg(long, requires = "shares")]
    cash: Option<f64>,

    /// Minimum cash to keep after rebalancing
    #[arg(long, default_value_t = 0.0, requires = "cash")]
    reserve: f64,

    /// Also print the allocation as a table
    #[arg(long)]
    table: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Yahoo,
    Coingecko,
}

fn parse_date(s: &str) -> std::result::Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]")).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(window) = cli.window_size {
        config.estimator.window_size = window;
    }
    config.validate()?;

    let symbols = Symbol::parse_list(&cli.symbols)?;

    // batch holdings are checked before anything is fetched or printed
    let batch_holdings = match (&cli.shares, cli.cash) {
        (Some(shares), Some(cash)) => Some(
            FixedHoldings::parse(shares, cash, cli.reserve)?
                .holdings(&symbols)
                .context("reading current holdings")?,
        ),
        _ => None,
    };

    let portfolio = match cli.source {
        Source::Yahoo => build(&cli, symbols, config, &YahooProvider::new()).await?,
        Source::Coingecko => build(&cli, symbols, config, &CoinGeckoProvider).await?,
    };

    print!("{}", report::allocation(&portfolio));
    if cli.table {
        println!("{}", portfolio.to_dataframe()?);
    }

    let holdings = match batch_holdings {
        Some(holdings) => holdings,
        None => PromptHoldings
            .holdings(&portfolio.symbols())
            .context("reading current holdings")?,
    };

    let plan = portfolio.rebalance(&holdings)?;
    print!("{}", report::plan(&plan));
    Ok(())
}

async fn build<P: PriceHistoryProvider>(
    cli: &Cli,
    symbols: Vec<Symbol>,
    config: Config,
    provider: &P,
) -> Result<Portfolio> {
    let mut builder = Portfolio::builder().symbols(symbols).config(config);
    if let Some(as_of) = cli.as_of {
        builder = builder.as_of(as_of);
    }
    builder
        .build(provider)
        .await
        .with_context(|| format!("computing allocation from {}", provider.name()))
}
