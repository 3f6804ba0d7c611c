use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// Canonical quote record tracked by the watchlist.
///
/// `change_percent` is stored next to `change` rather than derived from it;
/// whoever builds the record keeps the two consistent. A `market_cap` of zero
/// means the capitalization is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStock")]
pub struct Stock {
    pub symbol: Symbol,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: u64,
    pub last_updated: UtcDateTime,
}

impl Stock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        name: impl Into<String>,
        price: f64,
        change: f64,
        change_percent: f64,
        volume: u64,
        market_cap: u64,
        last_updated: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_finite("change", change)?;
        validate_finite("changePercent", change_percent)?;

        let name = name.into();
        let name = if name.trim().is_empty() {
            symbol.as_str().to_owned()
        } else {
            name
        };

        Ok(Self {
            symbol,
            name,
            price,
            change,
            change_percent,
            volume,
            market_cap,
            last_updated,
        })
    }

    /// Copy of `self` carrying the display name and market cap of `existing`.
    ///
    /// Quote-only fetches know neither field, so refreshed records take them
    /// from the entry already in the watchlist.
    pub fn with_identity_of(&self, existing: &Stock) -> Stock {
        Stock {
            name: existing.name.clone(),
            market_cap: existing.market_cap,
            ..self.clone()
        }
    }

    pub fn is_up(&self) -> bool {
        self.change > 0.0
    }

    pub fn is_down(&self) -> bool {
        self.change < 0.0
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStock {
    symbol: Symbol,
    #[serde(default)]
    name: String,
    price: f64,
    change: f64,
    change_percent: f64,
    volume: u64,
    #[serde(default)]
    market_cap: u64,
    last_updated: UtcDateTime,
}

impl TryFrom<RawStock> for Stock {
    type Error = ValidationError;

    fn try_from(raw: RawStock) -> Result<Self, Self::Error> {
        Stock::new(
            raw.symbol,
            raw.name,
            raw.price,
            raw.change,
            raw.change_percent,
            raw.volume,
            raw.market_cap,
            raw.last_updated,
        )
    }
}

/// Count of watchlist entries currently up and down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMovers {
    pub up: usize,
    pub down: usize,
}

/// Aggregates derived from a slice of stocks.
///
/// The portfolio value is the plain sum of current prices; no holdings or
/// cost basis are involved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    pub portfolio_value: f64,
    pub todays_change: f64,
    pub market_movers: MarketMovers,
    pub total_stocks: usize,
}

impl PortfolioMetrics {
    pub fn from_stocks(stocks: &[Stock]) -> Self {
        let mut metrics = Self {
            total_stocks: stocks.len(),
            ..Self::default()
        };

        for stock in stocks {
            metrics.portfolio_value += stock.price;
            metrics.todays_change += stock.change;
            if stock.is_up() {
                metrics.market_movers.up += 1;
            } else if stock.is_down() {
                metrics.market_movers.down += 1;
            }
        }

        metrics
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
