use std::sync::Arc;

use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::{CacheKey, ResponseCache};
use crate::format::sanitize_search_input;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::market_data::{MarketDataError, MarketDataProvider, ProviderFuture};
use crate::throttling::RequestBudget;
use crate::{DashboardConfig, Stock, Symbol, UtcDateTime, ValidationError};

pub const ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

const FUNCTION_OVERVIEW: &str = "OVERVIEW";
const FUNCTION_GLOBAL_QUOTE: &str = "GLOBAL_QUOTE";

/// Company metadata from the `OVERVIEW` function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyOverview {
    pub symbol: Symbol,
    pub name: String,
    /// Zero when the provider does not report a capitalization.
    pub market_cap: u64,
}

/// Normalized results kept in the shared response cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Search(Vec<Stock>),
    Quote(Stock),
    Overview(CompanyOverview),
}

/// Alpha Vantage market-data client.
///
/// Search combines an `OVERVIEW` lookup (name, market cap) with a
/// `GLOBAL_QUOTE` lookup (price, change, volume); the refresh path uses the
/// quote lookup alone. Both sub-lookups are cached under their own
/// namespaces in a cache that may be shared with other clients.
#[derive(Clone)]
pub struct AlphaVantageClient {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
    cache: ResponseCache<CachedPayload>,
    budget: Option<RequestBudget>,
}

impl AlphaVantageClient {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: String::from(ALPHAVANTAGE_BASE_URL),
            timeout_ms: 5_000,
            cache: ResponseCache::with_default_ttl(),
            budget: Some(RequestBudget::alphavantage_free_tier()),
        }
    }

    /// Production client over reqwest, configured from `config`.
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()), config.api_key.clone())
            .with_base_url(config.base_url.clone())
            .with_timeout_ms(config.request_timeout_ms)
            .with_cache(ResponseCache::new(config.cache_ttl))
            .with_budget(RequestBudget::new(
                std::time::Duration::from_secs(60),
                config.quota_per_minute,
            ))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache<CachedPayload>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_budget(mut self, budget: RequestBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Disable the local request budget, e.g. for premium API keys.
    pub fn without_budget(mut self) -> Self {
        self.budget = None;
        self
    }

    pub fn cache(&self) -> &ResponseCache<CachedPayload> {
        &self.cache
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Stock>, MarketDataError> {
        let sanitized = sanitize_search_input(query);
        let symbol = match Symbol::parse(&sanitized) {
            Ok(symbol) => symbol,
            Err(error) => {
                debug!("search query '{sanitized}' is not a ticker ({error}); skipping provider");
                return Ok(Vec::new());
            }
        };

        let cache_key = CacheKey::search(symbol.as_str());
        if let Some(CachedPayload::Search(results)) = self.cache.get(&cache_key).await {
            debug!("cache hit for {cache_key}");
            return Ok(results);
        }

        let Some(overview) = self.company_overview(&symbol).await? else {
            return Ok(Vec::new());
        };
        let Some(quote) = self.quote(&symbol).await? else {
            return Ok(Vec::new());
        };

        let stock = Stock {
            name: overview.name,
            market_cap: overview.market_cap,
            ..quote
        };
        let results = vec![stock];
        self.cache
            .set(cache_key, CachedPayload::Search(results.clone()))
            .await;
        Ok(results)
    }

    pub async fn quote(&self, symbol: &Symbol) -> Result<Option<Stock>, MarketDataError> {
        let cache_key = CacheKey::quote(symbol);
        if let Some(CachedPayload::Quote(stock)) = self.cache.get(&cache_key).await {
            debug!("cache hit for {cache_key}");
            return Ok(Some(stock));
        }

        let body = self.call(FUNCTION_GLOBAL_QUOTE, symbol).await?;
        let Some(stock) = normalize_quote(body, symbol)? else {
            return Ok(None);
        };

        self.cache
            .set(cache_key, CachedPayload::Quote(stock.clone()))
            .await;
        Ok(Some(stock))
    }

    pub async fn company_overview(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<CompanyOverview>, MarketDataError> {
        let cache_key = CacheKey::overview(symbol);
        if let Some(CachedPayload::Overview(overview)) = self.cache.get(&cache_key).await {
            debug!("cache hit for {cache_key}");
            return Ok(Some(overview));
        }

        let body = self.call(FUNCTION_OVERVIEW, symbol).await?;
        let Some(overview) = normalize_overview(body, symbol)? else {
            return Ok(None);
        };

        self.cache
            .set(cache_key, CachedPayload::Overview(overview.clone()))
            .await;
        Ok(Some(overview))
    }

    async fn call(&self, function: &str, symbol: &Symbol) -> Result<Value, MarketDataError> {
        if let Some(budget) = &self.budget {
            budget.acquire().map_err(|wait| {
                MarketDataError::rate_limited(format!(
                    "alphavantage request budget exhausted; retry in {:.2}s",
                    wait.as_secs_f64()
                ))
            })?;
        }

        let request = HttpRequest::get(&self.base_url)
            .with_query("function", function)
            .with_query("symbol", symbol.as_str())
            .with_query("apikey", &self.api_key)
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|e| {
            MarketDataError::network(format!("alphavantage transport error: {}", e.message()))
        })?;

        if response.status == 429 {
            return Err(MarketDataError::rate_limited(
                "alphavantage returned status 429",
            ));
        }
        if !response.is_success() {
            return Err(MarketDataError::network(format!(
                "alphavantage returned status {}",
                response.status
            )));
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|e| {
            MarketDataError::invalid_response(format!(
                "failed to parse alphavantage {function} response: {e}"
            ))
        })?;
        check_provider_notice(&body)?;
        Ok(body)
    }
}

impl MarketDataProvider for AlphaVantageClient {
    fn search_symbol<'a>(&'a self, query: &'a str) -> ProviderFuture<'a, Vec<Stock>> {
        Box::pin(self.search(query))
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Option<Stock>> {
        Box::pin(self.quote(symbol))
    }
}

/// Alpha Vantage answers throttled or rejected calls with HTTP 200 and a
/// marker field instead of data.
fn check_provider_notice(body: &Value) -> Result<(), MarketDataError> {
    let Some(object) = body.as_object() else {
        return Err(MarketDataError::invalid_response(
            "alphavantage response is not a JSON object",
        ));
    };

    for marker in ["Note", "Information"] {
        if let Some(notice) = object.get(marker) {
            return Err(MarketDataError::rate_limited(format!(
                "alphavantage {marker}: {}",
                notice.as_str().unwrap_or("rate limit exceeded")
            )));
        }
    }

    if let Some(message) = object.get("Error Message") {
        return Err(MarketDataError::invalid_response(format!(
            "alphavantage error: {}",
            message.as_str().unwrap_or("unspecified")
        )));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct OverviewPayload {
    #[serde(rename = "Symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "MarketCapitalization", default)]
    market_capitalization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol", default)]
    symbol: Option<String>,
    #[serde(rename = "05. price", default)]
    price: Option<String>,
    #[serde(rename = "06. volume", default)]
    volume: Option<String>,
    #[serde(rename = "09. change", default)]
    change: Option<String>,
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
}

fn normalize_overview(
    body: Value,
    requested: &Symbol,
) -> Result<Option<CompanyOverview>, MarketDataError> {
    let payload: OverviewPayload = serde_json::from_value(body).map_err(|e| {
        MarketDataError::invalid_response(format!("malformed alphavantage overview: {e}"))
    })?;

    let has_symbol = payload
        .symbol
        .as_deref()
        .is_some_and(|symbol| !symbol.trim().is_empty());
    if !has_symbol {
        return Ok(None);
    }

    let name = payload
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| requested.as_str().to_owned());
    let market_cap = payload
        .market_capitalization
        .as_deref()
        .map(parse_market_cap)
        .unwrap_or(0);

    Ok(Some(CompanyOverview {
        symbol: requested.clone(),
        name,
        market_cap,
    }))
}

fn normalize_quote(body: Value, requested: &Symbol) -> Result<Option<Stock>, MarketDataError> {
    let response: QuoteResponse = serde_json::from_value(body).map_err(|e| {
        MarketDataError::invalid_response(format!("malformed alphavantage quote: {e}"))
    })?;

    let Some(quote) = response.quote else {
        return Ok(None);
    };
    let Some(price) = quote.price.as_deref().filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };

    let symbol = quote
        .symbol
        .as_deref()
        .and_then(|raw| Symbol::parse(raw).ok())
        .unwrap_or_else(|| requested.clone());

    let price = parse_decimal("05. price", price)?;
    let change = parse_decimal("09. change", required("09. change", &quote.change)?)?;
    let change_percent = parse_decimal(
        "10. change percent",
        required("10. change percent", &quote.change_percent)?.trim_end_matches('%'),
    )?;
    let volume = required("06. volume", &quote.volume)?
        .trim()
        .parse::<u64>()
        .map_err(|e| MarketDataError::invalid_response(format!("invalid 06. volume: {e}")))?;

    let name = symbol.as_str().to_owned();
    Stock::new(
        symbol,
        name,
        price,
        change,
        change_percent,
        volume,
        0,
        UtcDateTime::now(),
    )
    .map(Some)
    .map_err(validation_to_error)
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, MarketDataError> {
    value
        .as_deref()
        .ok_or_else(|| MarketDataError::invalid_response(format!("missing {field}")))
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64, MarketDataError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| MarketDataError::invalid_response(format!("invalid {field} '{raw}': {e}")))
}

fn parse_market_cap(raw: &str) -> u64 {
    let raw = raw.trim();
    raw.parse::<u64>().unwrap_or_else(|_| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value as u64)
            .unwrap_or(0)
    })
}

fn validation_to_error(error: ValidationError) -> MarketDataError {
    MarketDataError::invalid_response(error.to_string())
}
