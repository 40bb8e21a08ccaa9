//! Plain-text rendering of allocations and plans.

use crate::portfolio::Portfolio;
use crate::rebalance::{Action, RebalancePlan};
use crate::safe_money::Usd;

/// Every line ends with a newline, including the last.
fn lines_to_text(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub fn allocation(portfolio: &Portfolio) -> String {
    let names: Vec<&str> = portfolio
        .instruments
        .iter()
        .map(|i| i.symbol.as_str())
        .collect();
    let mut lines = vec![format!(
        "Portfolio: [{}], as of {} (window size is {} days)",
        names.join(", "),
        portfolio.as_of,
        portfolio.window_size
    )];
    for i in &portfolio.instruments {
        let details = format!(
            "price: {}, annualized volatility: {:.2}%, performance: {:.2}%",
            Usd::new(i.estimate.latest_price),
            i.estimate.volatility * 100.0,
            i.estimate.performance * 100.0
        );
        lines.push(format!(
            "{} allocation ratio: {:.2}% ({details})",
            i.symbol,
            i.weight * 100.0
        ));
    }
    lines_to_text(lines)
}

pub fn plan(plan: &RebalancePlan) -> String {
    let mut lines = vec![format!("My value: {:.2}", plan.total_value.amount)];
    lines.extend(plan.trades.iter().map(|t| match t.action {
        Action::Buy | Action::Sell => format!(
            "{} {} {} shares -> {:.2}%",
            t.symbol,
            t.action,
            t.delta.abs(),
            t.target_percent
        ),
        Action::Hold => format!("{} {} -> {:.2}%", t.symbol, t.action, t.target_percent),
    }));
    lines.extend(plan.warnings.iter().map(|w| format!("Warning: {w}")));
    lines.push(format!("Cash remain: {}", plan.resulting_cash));
    lines_to_text(lines)
}
