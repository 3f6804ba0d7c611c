use serde::Serialize;
use stockwatch_core::format::{format_currency, format_number, format_percentage, format_time_ago};
use stockwatch_core::{PortfolioMetrics, RefreshReport, Stock, Symbol, UtcDateTime, WatchlistState};

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WatchlistView<'a> {
    watchlist: &'a [Stock],
    #[serde(flatten)]
    metrics: PortfolioMetrics,
}

#[derive(Debug, Serialize)]
struct SearchView<'a> {
    query: &'a str,
    results: &'a [Stock],
}

#[derive(Debug, Serialize)]
struct FailureView<'a> {
    symbol: &'a Symbol,
    kind: &'static str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshView<'a> {
    refreshed: &'a [Symbol],
    unavailable: &'a [Symbol],
    failed: Vec<FailureView<'a>>,
}

pub fn search_results(
    query: &str,
    results: &[Stock],
    format: OutputFormat,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(&SearchView { query, results }),
        OutputFormat::Text => {
            if results.is_empty() {
                println!("No stocks found for '{}'", query.trim());
            }
            for stock in results {
                println!("{}", stock_line(stock, UtcDateTime::now()));
            }
            Ok(())
        }
    }
}

pub fn watchlist(state: &WatchlistState, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(&WatchlistView {
            watchlist: state.watchlist(),
            metrics: state.metrics(),
        }),
        OutputFormat::Text => {
            if state.watchlist().is_empty() {
                println!("Your watchlist is empty. Search for a stock to add it.");
            }
            let now = UtcDateTime::now();
            for stock in state.watchlist() {
                println!("{}", stock_line(stock, now));
            }
            println!("{}", summary_line(&state.metrics()));
            Ok(())
        }
    }
}

pub fn summary(state: &WatchlistState, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&state.metrics())?);
            Ok(())
        }
        OutputFormat::Text => {
            println!("{}", summary_line(&state.metrics()));
            Ok(())
        }
    }
}

pub fn refresh_report(report: &RefreshReport, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(&RefreshView {
            refreshed: &report.refreshed,
            unavailable: &report.unavailable,
            failed: report
                .failed
                .iter()
                .map(|(symbol, error)| FailureView {
                    symbol,
                    kind: error.kind().as_str(),
                    message: error.message(),
                })
                .collect(),
        }),
        OutputFormat::Text => {
            println!(
                "Refreshed {} of {} stocks",
                report.refreshed.len(),
                report.attempted()
            );
            for symbol in &report.unavailable {
                println!("  {symbol}: no quote available");
            }
            for (symbol, error) in &report.failed {
                println!("  {symbol}: {}", error.user_message());
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn stock_line(stock: &Stock, now: UtcDateTime) -> String {
    let market_cap = if stock.market_cap > 0 {
        format_number(stock.market_cap as f64)
    } else {
        String::from("-")
    };
    format!(
        "{:<6} {:<28} {:>12} {:>10} {:>8}  vol {:>7}  cap {:>7}  {}",
        stock.symbol.as_str(),
        truncate(&stock.name, 28),
        format_currency(stock.price),
        format_currency(stock.change),
        format_percentage(stock.change_percent),
        format_number(stock.volume as f64),
        market_cap,
        format_time_ago(stock.last_updated, now),
    )
}

fn summary_line(metrics: &PortfolioMetrics) -> String {
    format!(
        "Portfolio {}  Today {}  Up {} / Down {}  Stocks {}",
        format_currency(metrics.portfolio_value),
        format_currency(metrics.todays_change),
        metrics.market_movers.up,
        metrics.market_movers.down,
        metrics.total_stocks,
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut shortened: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}
