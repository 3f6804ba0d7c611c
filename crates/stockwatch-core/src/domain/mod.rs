//! # Domain Models
//!
//! Canonical types shared by the watchlist store, the market-data client and
//! the persistence boundary.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Stock`] | Quote record tracked in the watchlist |
//! | [`PortfolioMetrics`] | Aggregates derived from a set of stocks |
//! | [`MarketMovers`] | Up/down counts of changed entries |
//! | [`Symbol`] | Validated ticker symbol |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Constructors validate their invariants, so a `Stock` obtained from
//! [`Stock::new`] or deserialized from storage always has a finite,
//! non-negative price and a well-formed symbol.

mod stock;
mod symbol;
mod timestamp;

pub use stock::{MarketMovers, PortfolioMetrics, Stock};
pub use symbol::{Symbol, MAX_SYMBOL_LEN};
pub use timestamp::UtcDateTime;
