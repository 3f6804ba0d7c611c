//! Provider adapters implementing [`crate::MarketDataProvider`].

pub mod alphavantage;

pub use alphavantage::{AlphaVantageClient, CachedPayload, CompanyOverview, ALPHAVANTAGE_BASE_URL};
