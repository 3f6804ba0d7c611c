//! Watchlist state machine.
//!
//! [`reduce`] is the pure transition function over [`WatchlistState`];
//! [`WatchlistStore`] owns the live state, applies actions atomically,
//! notifies subscribers and persists the watchlist after it changes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use tokio::sync::watch;

use crate::persistence::{load_watchlist, save_watchlist, KeyValueStore, MemoryStore};
use crate::{MarketMovers, PortfolioMetrics, Stock, Symbol};

/// Closed set of state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddStock(Stock),
    RemoveStock(Symbol),
    SetWatchlist(Vec<Stock>),
    UpdateStockData(Stock),
    SetLoading(bool),
    SetError(Option<String>),
    SetSearchResults(Vec<Stock>),
    SetSearchLoading(bool),
    ClearSearch,
}

impl Action {
    /// Whether this action can change watchlist membership or content.
    pub const fn affects_watchlist(&self) -> bool {
        matches!(
            self,
            Self::AddStock(_)
                | Self::RemoveStock(_)
                | Self::SetWatchlist(_)
                | Self::UpdateStockData(_)
        )
    }
}

/// Dashboard state. Aggregates are recomputed whenever `watchlist` changes
/// and are never set independently of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistState {
    watchlist: Vec<Stock>,
    metrics: PortfolioMetrics,
    loading: bool,
    error: Option<String>,
    search_results: Vec<Stock>,
    search_loading: bool,
}

impl WatchlistState {
    pub fn watchlist(&self) -> &[Stock] {
        &self.watchlist
    }

    pub fn portfolio_value(&self) -> f64 {
        self.metrics.portfolio_value
    }

    pub fn todays_change(&self) -> f64 {
        self.metrics.todays_change
    }

    pub fn market_movers(&self) -> MarketMovers {
        self.metrics.market_movers
    }

    pub fn metrics(&self) -> PortfolioMetrics {
        self.metrics
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn search_results(&self) -> &[Stock] {
        &self.search_results
    }

    pub fn search_loading(&self) -> bool {
        self.search_loading
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.watchlist.iter().any(|stock| &stock.symbol == symbol)
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Stock> {
        self.watchlist.iter().find(|stock| &stock.symbol == symbol)
    }

    fn with_watchlist(&self, watchlist: Vec<Stock>) -> Self {
        Self {
            metrics: PortfolioMetrics::from_stocks(&watchlist),
            watchlist,
            ..self.clone()
        }
    }
}

/// Pure, total transition function.
pub fn reduce(state: &WatchlistState, action: Action) -> WatchlistState {
    match action {
        Action::AddStock(stock) => {
            if state.contains(&stock.symbol) {
                return state.clone();
            }
            let mut watchlist = state.watchlist.clone();
            watchlist.push(stock);
            WatchlistState {
                error: None,
                ..state.with_watchlist(watchlist)
            }
        }
        Action::RemoveStock(symbol) => {
            if !state.contains(&symbol) {
                return state.clone();
            }
            let watchlist = state
                .watchlist
                .iter()
                .filter(|stock| stock.symbol != symbol)
                .cloned()
                .collect();
            state.with_watchlist(watchlist)
        }
        Action::SetWatchlist(stocks) => {
            let mut seen = HashSet::new();
            let watchlist = stocks
                .into_iter()
                .filter(|stock| seen.insert(stock.symbol.clone()))
                .collect();
            state.with_watchlist(watchlist)
        }
        Action::UpdateStockData(updated) => {
            if !state.contains(&updated.symbol) {
                return state.clone();
            }
            let watchlist = state
                .watchlist
                .iter()
                .map(|stock| {
                    if stock.symbol == updated.symbol {
                        updated.clone()
                    } else {
                        stock.clone()
                    }
                })
                .collect();
            state.with_watchlist(watchlist)
        }
        Action::SetLoading(loading) => WatchlistState {
            loading,
            ..state.clone()
        },
        Action::SetError(error) => WatchlistState {
            error,
            loading: false,
            ..state.clone()
        },
        Action::SetSearchResults(search_results) => WatchlistState {
            search_results,
            search_loading: false,
            ..state.clone()
        },
        Action::SetSearchLoading(search_loading) => WatchlistState {
            search_loading,
            ..state.clone()
        },
        Action::ClearSearch => WatchlistState {
            search_results: Vec::new(),
            search_loading: false,
            ..state.clone()
        },
    }
}

/// Single source of truth for dashboard state, shared by injection.
///
/// Transitions run inside `watch::Sender::send_modify`, so a reader never
/// observes a half-applied action and every subscriber sees each change.
/// Writes to persistence are serialized and always store the watchlist as it
/// is when the write starts, so the last write reflects the latest state.
pub struct WatchlistStore {
    state: watch::Sender<WatchlistState>,
    persistence: Arc<dyn KeyValueStore>,
    persist_lock: Mutex<()>,
}

impl WatchlistStore {
    /// Create a store seeded from `persistence`; unreadable data yields an
    /// empty watchlist.
    pub fn open(persistence: Arc<dyn KeyValueStore>) -> Self {
        let stored = load_watchlist(persistence.as_ref());
        let initial = reduce(&WatchlistState::default(), Action::SetWatchlist(stored));
        let (state, _) = watch::channel(initial);
        Self {
            state,
            persistence,
            persist_lock: Mutex::new(()),
        }
    }

    /// Store without durable persistence.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStore::new()))
    }

    pub fn dispatch(&self, action: Action) {
        let persist = action.affects_watchlist();
        let mut changed = false;
        self.state.send_modify(|state| {
            let next = reduce(state, action);
            changed = persist && next.watchlist != state.watchlist;
            *state = next;
        });

        if changed {
            self.persist();
        }
    }

    /// Apply a quote-only record, keeping the current entry's name and market
    /// cap. Returns `false` when the symbol is no longer watched.
    pub fn merge_quote(&self, quote: Stock) -> bool {
        !self.merge_quotes(vec![quote]).is_empty()
    }

    /// Apply a batch of quote-only records in one transition and one write.
    ///
    /// Each record keeps the identity fields of the entry it replaces. The
    /// lookup and the update happen in the same transition, so an entry
    /// removed while its quote was in flight is never brought back. Returns
    /// the symbols that were merged, in input order.
    pub fn merge_quotes(&self, quotes: Vec<Stock>) -> Vec<Symbol> {
        let mut merged = Vec::with_capacity(quotes.len());
        let changed = self.state.send_if_modified(|state| {
            let mut next = state.clone();
            for quote in quotes {
                let Some(existing) = next.get(&quote.symbol) else {
                    debug!("{} left the watchlist before its quote arrived", quote.symbol);
                    continue;
                };
                let update = quote.with_identity_of(existing);
                merged.push(quote.symbol);
                next = reduce(&next, Action::UpdateStockData(update));
            }

            if next == *state {
                return false;
            }
            *state = next;
            true
        });

        if changed {
            self.persist();
        }
        merged
    }

    pub fn snapshot(&self) -> WatchlistState {
        self.state.borrow().clone()
    }

    pub fn watchlist(&self) -> Vec<Stock> {
        self.state.borrow().watchlist.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().watchlist.is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<WatchlistState> {
        self.state.subscribe()
    }

    pub fn add_stock(&self, stock: Stock) {
        self.dispatch(Action::AddStock(stock));
    }

    pub fn remove_stock(&self, symbol: Symbol) {
        self.dispatch(Action::RemoveStock(symbol));
    }

    pub fn update_stock_data(&self, stock: Stock) {
        self.dispatch(Action::UpdateStockData(stock));
    }

    pub fn set_search_results(&self, results: Vec<Stock>) {
        self.dispatch(Action::SetSearchResults(results));
    }

    pub fn set_search_loading(&self, loading: bool) {
        self.dispatch(Action::SetSearchLoading(loading));
    }

    pub fn clear_search(&self) {
        self.dispatch(Action::ClearSearch);
    }

    fn persist(&self) {
        let _write = self
            .persist_lock
            .lock()
            .expect("persist lock should not be poisoned");
        // Read under the lock: a writer that lost the race to a newer
        // transition still stores that newer watchlist.
        let watchlist = self.state.borrow().watchlist.clone();
        if let Err(error) = save_watchlist(self.persistence.as_ref(), &watchlist) {
            warn!("failed to persist watchlist: {error}");
        }
    }
}
