#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use stockwatch_core::{
    MarketDataError, MarketDataProvider, ProviderFuture, Stock, Symbol, UtcDateTime,
};
use tokio::time::Instant;

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

pub fn stock(raw: &str, price: f64, change: f64) -> Stock {
    Stock::new(
        symbol(raw),
        format!("{raw} Holdings"),
        price,
        change,
        0.0,
        1_000,
        0,
        UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid timestamp"),
    )
    .expect("valid stock")
}

#[derive(Clone)]
struct Scripted<T> {
    outcome: Result<T, MarketDataError>,
    delay: Duration,
}

/// In-memory provider with per-query scripted outcomes and latencies.
/// Unscripted searches find nothing; unscripted quotes are absent.
#[derive(Default)]
pub struct FakeProvider {
    searches: HashMap<String, Scripted<Vec<Stock>>>,
    quotes: HashMap<String, Scripted<Option<Stock>>>,
    search_calls: Mutex<Vec<(String, Instant)>>,
    quote_calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(self, query: &str, results: Vec<Stock>) -> Self {
        self.with_search_delayed(query, Ok(results), Duration::ZERO)
    }

    pub fn with_search_failure(self, query: &str, error: MarketDataError) -> Self {
        self.with_search_delayed(query, Err(error), Duration::ZERO)
    }

    pub fn with_search_delayed(
        mut self,
        query: &str,
        outcome: Result<Vec<Stock>, MarketDataError>,
        delay: Duration,
    ) -> Self {
        self.searches
            .insert(query.to_owned(), Scripted { outcome, delay });
        self
    }

    pub fn with_quote(self, raw: &str, quote: Stock) -> Self {
        self.with_quote_delayed(raw, Ok(Some(quote)), Duration::ZERO)
    }

    pub fn with_quote_failure(self, raw: &str, error: MarketDataError) -> Self {
        self.with_quote_delayed(raw, Err(error), Duration::ZERO)
    }

    pub fn with_quote_delayed(
        mut self,
        raw: &str,
        outcome: Result<Option<Stock>, MarketDataError>,
        delay: Duration,
    ) -> Self {
        self.quotes.insert(raw.to_owned(), Scripted { outcome, delay });
        self
    }

    pub fn search_calls(&self) -> Vec<(String, Instant)> {
        self.search_calls.lock().expect("call log not poisoned").clone()
    }

    pub fn searched_queries(&self) -> Vec<String> {
        self.search_calls()
            .into_iter()
            .map(|(query, _)| query)
            .collect()
    }

    pub fn quote_calls(&self) -> Vec<String> {
        self.quote_calls.lock().expect("call log not poisoned").clone()
    }
}

impl MarketDataProvider for FakeProvider {
    fn search_symbol<'a>(&'a self, query: &'a str) -> ProviderFuture<'a, Vec<Stock>> {
        self.search_calls
            .lock()
            .expect("call log not poisoned")
            .push((query.to_owned(), Instant::now()));
        let scripted = self.searches.get(query).cloned();
        Box::pin(async move {
            match scripted {
                Some(Scripted { outcome, delay }) => {
                    tokio::time::sleep(delay).await;
                    outcome
                }
                None => Ok(Vec::new()),
            }
        })
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Option<Stock>> {
        self.quote_calls
            .lock()
            .expect("call log not poisoned")
            .push(symbol.as_str().to_owned());
        let scripted = self.quotes.get(symbol.as_str()).cloned();
        Box::pin(async move {
            match scripted {
                Some(Scripted { outcome, delay }) => {
                    tokio::time::sleep(delay).await;
                    outcome
                }
                None => Ok(None),
            }
        })
    }
}
