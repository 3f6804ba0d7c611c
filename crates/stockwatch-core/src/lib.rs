//! # Stockwatch Core
//!
//! Client-state core of the stockwatch dashboard: the watchlist store, the
//! market-data client and the background tasks that keep them in sync.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Alpha Vantage client |
//! | [`cache`] | Namespaced response cache with lazy TTL expiry |
//! | [`config`] | Runtime configuration and environment overrides |
//! | [`domain`] | Domain models (Stock, Symbol, PortfolioMetrics) |
//! | [`error`] | Core error types |
//! | [`format`] | Display formatting and input helpers |
//! | [`http_client`] | HTTP client abstraction |
//! | [`market_data`] | Provider contract and structured provider errors |
//! | [`persistence`] | Key-value storage for the watchlist |
//! | [`refresh`] | Periodic quote refresh |
//! | [`search`] | Debounced symbol search |
//! | [`store`] | Action reducer and the shared watchlist store |
//! | [`throttling`] | Request quota for the free API tier |
//!
//! ## Data flow
//!
//! ```text
//! keystrokes ──▶ SearchPipeline ──┐
//!                                 ├──▶ MarketDataProvider ──▶ ResponseCache
//! interval ───▶ RefreshScheduler ─┘            │
//!                                              ▼
//!                                       WatchlistStore ──▶ KeyValueStore
//!                                              │
//!                                              ▼
//!                                         subscribers
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockwatch_core::{AlphaVantageClient, DashboardConfig, MarketDataProvider, WatchlistStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DashboardConfig::from_env()?;
//!     let client = AlphaVantageClient::from_config(&config);
//!     let store = WatchlistStore::in_memory();
//!
//!     if let Some(stock) = client.search_symbol("AAPL").await?.into_iter().next() {
//!         store.add_stock(stock);
//!     }
//!     println!("portfolio value: {}", store.snapshot().portfolio_value());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod http_client;
pub mod market_data;
pub mod persistence;
pub mod refresh;
pub mod search;
pub mod store;
pub mod throttling;

// Adapter implementations
pub use adapters::{AlphaVantageClient, CompanyOverview, ALPHAVANTAGE_BASE_URL};

// Caching
pub use cache::{CacheKey, CacheNamespace, ResponseCache, DEFAULT_CACHE_TTL};

// Configuration
pub use config::DashboardConfig;

// Domain models
pub use domain::{MarketMovers, PortfolioMetrics, Stock, Symbol, UtcDateTime};

// Error types
pub use error::{ConfigError, PersistenceError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Provider contract
pub use market_data::{MarketDataError, MarketDataErrorKind, MarketDataProvider, ProviderFuture};

// Persistence
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, WATCHLIST_KEY};

// Background tasks
pub use refresh::{RefreshReport, RefreshScheduler};
pub use search::{SearchPhase, SearchPipeline};

// State
pub use store::{reduce, Action, WatchlistState, WatchlistStore};

// Throttling
pub use throttling::RequestBudget;
