use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stockwatch_core::{
    AlphaVantageClient, CacheKey, DashboardConfig, HttpClient, HttpError, HttpErrorKind,
    HttpRequest, HttpResponse, MarketDataErrorKind, MarketDataProvider, RequestBudget,
    ResponseCache, Symbol, WatchlistStore,
};

const AAPL_OVERVIEW: &str =
    r#"{"Symbol":"AAPL","Name":"Apple Inc.","MarketCapitalization":"3000000000000"}"#;
const AAPL_QUOTE: &str = r#"{"Global Quote":{"01. symbol":"AAPL","05. price":"150.00",
    "06. volume":"1000000","09. change":"1.50","10. change percent":"1.01%"}}"#;

/// Serves canned bodies keyed by `function` and counts calls.
#[derive(Default)]
struct CannedHttp {
    bodies: HashMap<&'static str, Result<HttpResponse, HttpError>>,
    calls: Mutex<Vec<String>>,
}

impl CannedHttp {
    fn with(mut self, function: &'static str, body: &str) -> Self {
        self.bodies.insert(function, Ok(HttpResponse::ok_json(body)));
        self
    }

    fn failing(mut self, function: &'static str, error: HttpError) -> Self {
        self.bodies.insert(function, Err(error));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log not poisoned").clone()
    }
}

impl HttpClient for CannedHttp {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let function = request.query_param("function").unwrap_or_default().to_owned();
        let response = self
            .bodies
            .get(function.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(HttpResponse::ok_json("{}")));
        self.calls.lock().expect("call log not poisoned").push(function);
        Box::pin(async move { response })
    }
}

fn apple_http() -> Arc<CannedHttp> {
    Arc::new(
        CannedHttp::default()
            .with("OVERVIEW", AAPL_OVERVIEW)
            .with("GLOBAL_QUOTE", AAPL_QUOTE),
    )
}

fn provider(http: Arc<CannedHttp>) -> Arc<dyn MarketDataProvider> {
    Arc::new(AlphaVantageClient::new(http, "demo").without_budget())
}

#[tokio::test]
async fn search_yields_display_ready_stock() {
    let provider = provider(apple_http());

    let results = provider.search_symbol("AAPL").await.expect("search succeeds");

    assert_eq!(results.len(), 1);
    let stock = &results[0];
    assert_eq!(stock.symbol.as_str(), "AAPL");
    assert_eq!(stock.name, "Apple Inc.");
    assert_eq!(stock.price, 150.00);
    assert_eq!(stock.change, 1.50);
    assert_eq!(stock.change_percent, 1.01);
    assert_eq!(stock.volume, 1_000_000);
    assert_eq!(stock.market_cap, 3_000_000_000_000);
}

#[tokio::test]
async fn adding_search_result_sets_portfolio_value() {
    let provider = provider(apple_http());
    let store = WatchlistStore::in_memory();

    let stock = provider
        .search_symbol("aapl")
        .await
        .expect("search succeeds")
        .remove(0);
    store.add_stock(stock);

    let state = store.snapshot();
    assert_eq!(state.portfolio_value(), 150.00);
    assert_eq!(state.todays_change(), 1.50);
    assert_eq!(state.market_movers().up, 1);
}

#[tokio::test]
async fn quote_path_does_not_know_identity_fields() {
    let provider = provider(apple_http());

    let quote = provider
        .fetch_quote(&Symbol::parse("AAPL").expect("valid symbol"))
        .await
        .expect("quote succeeds")
        .expect("quote present");

    assert_eq!(quote.price, 150.00);
    assert_eq!(quote.market_cap, 0);
}

#[tokio::test]
async fn non_ticker_queries_find_nothing_without_network() {
    let http = apple_http();
    let provider = provider(Arc::clone(&http));

    for query in ["", "   ", "apple inc", "TOOLONG", "BRK1"] {
        let results = provider.search_symbol(query).await.expect("not an error");
        assert!(results.is_empty(), "query {query:?} should find nothing");
    }
    assert!(http.calls().is_empty());
}

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
    let http = apple_http();
    let provider = provider(Arc::clone(&http));

    provider.search_symbol("AAPL").await.expect("first search");
    provider.search_symbol(" aapl ").await.expect("second search");
    provider
        .fetch_quote(&Symbol::parse("AAPL").expect("valid symbol"))
        .await
        .expect("quote");

    assert_eq!(http.calls(), vec!["OVERVIEW", "GLOBAL_QUOTE"]);
}

#[tokio::test]
async fn shared_cache_is_visible_across_clients() {
    let cache = ResponseCache::new(Duration::from_secs(60));
    let first = AlphaVantageClient::new(apple_http(), "demo")
        .without_budget()
        .with_cache(cache.clone());
    first.search("AAPL").await.expect("search succeeds");

    let idle_http = Arc::new(CannedHttp::default());
    let second = AlphaVantageClient::new(idle_http.clone(), "demo")
        .without_budget()
        .with_cache(cache.clone());
    let quote = second
        .quote(&Symbol::parse("AAPL").expect("valid symbol"))
        .await
        .expect("cached quote");

    assert!(quote.is_some());
    assert!(idle_http.calls().is_empty());
    assert!(cache.get(&CacheKey::search("AAPL")).await.is_some());
}

#[tokio::test]
async fn rate_limit_notice_maps_to_rate_limited() {
    let http = Arc::new(CannedHttp::default().with(
        "OVERVIEW",
        r#"{"Note":"Our standard API call frequency is 5 calls per minute and 500 calls per day."}"#,
    ));

    let error = provider(http).search_symbol("AAPL").await.expect_err("must fail");

    assert_eq!(error.kind(), MarketDataErrorKind::RateLimited);
    assert_eq!(
        error.user_message(),
        "API rate limit exceeded. Please try again later."
    );
}

#[tokio::test]
async fn transport_failure_maps_to_network() {
    let http = Arc::new(CannedHttp::default().failing(
        "OVERVIEW",
        HttpError::new(HttpErrorKind::Timeout, "request timed out"),
    ));

    let error = provider(http).search_symbol("AAPL").await.expect_err("must fail");

    assert_eq!(error.kind(), MarketDataErrorKind::Network);
}

#[tokio::test]
async fn overview_without_quote_yields_no_results() {
    let http = Arc::new(
        CannedHttp::default()
            .with("OVERVIEW", AAPL_OVERVIEW)
            .with("GLOBAL_QUOTE", r#"{"Global Quote":{}}"#),
    );

    let results = provider(http.clone())
        .search_symbol("AAPL")
        .await
        .expect("search succeeds");

    assert!(results.is_empty());
    assert_eq!(http.calls(), vec!["OVERVIEW", "GLOBAL_QUOTE"]);
}

#[tokio::test]
async fn malformed_overview_maps_to_invalid_response() {
    for body in ["<html>busy</html>", r#"{"Symbol":"AAPL","Name":7}"#] {
        let http = Arc::new(
            CannedHttp::default()
                .with("OVERVIEW", body)
                .with("GLOBAL_QUOTE", AAPL_QUOTE),
        );

        let error = provider(http.clone())
            .search_symbol("AAPL")
            .await
            .expect_err("must fail");

        assert_eq!(error.kind(), MarketDataErrorKind::InvalidResponse, "body {body}");
        assert_eq!(http.calls(), vec!["OVERVIEW"]);
    }
}

#[tokio::test]
async fn exhausted_budget_rejects_before_network() {
    let http = apple_http();
    let client = AlphaVantageClient::new(http.clone(), "demo")
        .with_budget(RequestBudget::new(Duration::from_secs(60), 1));

    let error = client.search("AAPL").await.expect_err("second call is over budget");

    assert!(error.is_rate_limited());
    assert_eq!(http.calls(), vec!["OVERVIEW"]);
}

#[tokio::test]
async fn config_sets_cache_ttl() {
    let config = DashboardConfig {
        cache_ttl: Duration::from_secs(42),
        ..DashboardConfig::default()
    };

    let client = AlphaVantageClient::from_config(&config);

    assert_eq!(client.cache().ttl().await, Duration::from_secs(42));
    assert!(client.cache().is_empty().await);
}
