//! CLI argument definitions.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `search` | Look up a ticker and print the match |
//! | `add` | Add a ticker to the watchlist |
//! | `remove` | Remove a ticker from the watchlist |
//! | `list` | Print the watchlist and portfolio summary |
//! | `refresh` | Refresh every watchlist quote once |
//! | `watch` | Keep refreshing on an interval until Ctrl-C |
//!
//! Settings not given as flags come from `STOCKWATCH_*` environment
//! variables or a `.env` file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "stockwatch",
    author,
    version,
    about = "Stock watchlist dashboard for the terminal"
)]
pub struct Cli {
    /// Directory holding the persisted watchlist.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Alpha Vantage API key; overrides STOCKWATCH_ALPHAVANTAGE_API_KEY.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Keep the watchlist in memory only for this invocation.
    #[arg(long, global = true, default_value_t = false)]
    pub ephemeral: bool,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for a terminal.
    Text,
    /// Pretty-printed JSON.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up a ticker symbol.
    Search(SearchArgs),
    /// Add a ticker to the watchlist.
    Add(SymbolArgs),
    /// Remove a ticker from the watchlist.
    Remove(SymbolArgs),
    /// Print the watchlist with summary metrics.
    List,
    /// Refresh all watchlist quotes once.
    Refresh,
    /// Refresh periodically and print the summary on every change.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,
}

#[derive(Debug, Args)]
pub struct SymbolArgs {
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between refreshes; overrides STOCKWATCH_REFRESH_SECS.
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Refresh once right away instead of waiting a full interval.
    #[arg(long, default_value_t = false)]
    pub now: bool,
}
