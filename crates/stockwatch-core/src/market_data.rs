//! Market-data provider contract.
//!
//! The dashboard needs two lookups from a provider: a symbol search that
//! yields display-ready [`Stock`] records and a quote fetch used by the
//! refresh loop. "Not found" is not an error on either path; it is an empty
//! vector or `None`.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{Stock, Symbol};

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, MarketDataError>> + Send + 'a>>;

/// Provider failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketDataErrorKind {
    /// The provider (or the local request budget) signalled throttling.
    RateLimited,
    /// The payload was not a document the client understands.
    InvalidResponse,
    /// Transport failure or unexpected HTTP status.
    Network,
    /// The request was rejected before reaching the provider.
    InvalidRequest,
}

impl MarketDataErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::InvalidResponse => "invalid_response",
            Self::Network => "network",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDataError {
    kind: MarketDataErrorKind,
    message: String,
}

impl MarketDataError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(MarketDataErrorKind::RateLimited, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(MarketDataErrorKind::InvalidResponse, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(MarketDataErrorKind::Network, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(MarketDataErrorKind::InvalidRequest, message)
    }

    fn new(kind: MarketDataErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> MarketDataErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn is_rate_limited(&self) -> bool {
        matches!(self.kind, MarketDataErrorKind::RateLimited)
    }

    /// Sentence suitable for an end user; raw provider text stays in the logs.
    pub const fn user_message(&self) -> &'static str {
        match self.kind {
            MarketDataErrorKind::RateLimited => "API rate limit exceeded. Please try again later.",
            MarketDataErrorKind::Network => "Network error. Please check your connection.",
            MarketDataErrorKind::InvalidResponse | MarketDataErrorKind::InvalidRequest => {
                "An unexpected error occurred. Please try again."
            }
        }
    }
}

impl Display for MarketDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for MarketDataError {}

/// Contract every market-data backend implements.
pub trait MarketDataProvider: Send + Sync {
    /// Look up a symbol; yields zero or one normalized record.
    fn search_symbol<'a>(&'a self, query: &'a str) -> ProviderFuture<'a, Vec<Stock>>;

    /// Fetch the live quote for a symbol. Identity fields (`name`,
    /// `market_cap`) are not known on this path.
    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Option<Stock>>;
}
