//! Debounced symbol search.
//!
//! Each keystroke re-arms a timer; only the last query of a quiet window
//! reaches the provider. Every session step bumps a generation token and a
//! completion whose token is no longer current is dropped, so a slow early
//! request can never overwrite the results of a later one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::market_data::{MarketDataError, MarketDataProvider};
use crate::store::WatchlistStore;
use crate::Stock;

/// Presentation state of the current search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Debouncing,
    Loading,
    Results,
    Empty,
    Failed,
}

#[derive(Debug)]
struct Session {
    query: String,
    phase: SearchPhase,
    generation: u64,
}

struct Shared {
    store: Arc<WatchlistStore>,
    provider: Arc<dyn MarketDataProvider>,
    session: Mutex<Session>,
}

impl Shared {
    fn session(&self) -> std::sync::MutexGuard<'_, Session> {
        self.session.lock().expect("search session lock should not be poisoned")
    }

    fn is_current(&self, token: u64) -> bool {
        self.session().generation == token
    }

    async fn lookup(&self, token: u64, query: String) -> Result<Vec<Stock>, MarketDataError> {
        {
            // The flag is raised under the session lock so that a concurrent
            // clear or cancel either sees this lookup as loading or stops it.
            let mut session = self.session();
            if session.generation != token {
                return Ok(Vec::new());
            }
            session.phase = SearchPhase::Loading;
            self.store.set_search_loading(true);
        }

        let outcome = self.provider.search_symbol(&query).await;

        let mut session = self.session();
        if session.generation != token {
            debug!("discarding stale search completion for '{query}'");
            return outcome;
        }
        match &outcome {
            Ok(results) => {
                session.phase = if results.is_empty() {
                    SearchPhase::Empty
                } else {
                    SearchPhase::Results
                };
                self.store.set_search_results(results.clone());
            }
            Err(error) => {
                warn!("search for '{query}' failed: {error}");
                session.phase = SearchPhase::Failed;
                self.store.set_search_results(Vec::new());
            }
        }
        outcome
    }
}

/// Search session bound to a store and a provider.
///
/// `input` spawns onto the current tokio runtime and must be called from
/// within one.
pub struct SearchPipeline {
    shared: Arc<Shared>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchPipeline {
    pub fn new(
        store: Arc<WatchlistStore>,
        provider: Arc<dyn MarketDataProvider>,
        debounce: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                provider,
                session: Mutex::new(Session {
                    query: String::new(),
                    phase: SearchPhase::Idle,
                    generation: 0,
                }),
            }),
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Record a keystroke and re-arm the debounce timer.
    pub fn input(&self, raw: &str) {
        self.abort_pending();

        let token = {
            let mut session = self.shared.session();
            session.query = raw.to_owned();
            session.generation += 1;
            if raw.trim().is_empty() {
                session.phase = SearchPhase::Idle;
                self.shared.store.clear_search();
                None
            } else {
                session.phase = SearchPhase::Debouncing;
                Some(session.generation)
            }
        };

        let Some(token) = token else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;
        let query = raw.trim().to_owned();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if !shared.is_current(token) {
                return;
            }
            // Detached so that a later keystroke aborting this timer leaves the
            // request running; its completion is then dropped by token.
            tokio::spawn(async move {
                let _ = shared.lookup(token, query).await;
            });
        });
        *self.pending() = Some(timer);
    }

    /// Run a lookup for `raw` now, skipping the debounce window. Results are
    /// written to the store as for a debounced lookup; the provider error, if
    /// any, is also returned to the caller.
    pub async fn search_now(&self, raw: &str) -> Result<Vec<Stock>, MarketDataError> {
        self.abort_pending();

        let token = {
            let mut session = self.shared.session();
            session.query = raw.to_owned();
            session.generation += 1;
            session.generation
        };

        let query = raw.trim();
        if query.is_empty() {
            let mut session = self.shared.session();
            session.phase = SearchPhase::Idle;
            self.shared.store.clear_search();
            return Ok(Vec::new());
        }
        self.shared.lookup(token, query.to_owned()).await
    }

    /// Add a chosen result to the watchlist and end the session.
    pub fn select(&self, stock: Stock) {
        self.shared.store.add_stock(stock);
        self.reset();
    }

    /// Cancel the pending timer and ignore any in-flight completion.
    pub fn cancel(&self) {
        self.abort_pending();
        let mut session = self.shared.session();
        session.generation += 1;
        if matches!(session.phase, SearchPhase::Debouncing | SearchPhase::Loading) {
            session.phase = SearchPhase::Idle;
            // Lowered before the session is released so a lookup started
            // afterwards cannot have its flag cleared.
            self.shared.store.set_search_loading(false);
        }
    }

    pub fn query(&self) -> String {
        self.shared.session().query.clone()
    }

    pub fn phase(&self) -> SearchPhase {
        self.shared.session().phase
    }

    fn reset(&self) {
        self.abort_pending();
        let mut session = self.shared.session();
        session.query.clear();
        session.generation += 1;
        session.phase = SearchPhase::Idle;
        self.shared.store.clear_search();
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().expect("debounce handle lock should not be poisoned")
    }

    fn abort_pending(&self) {
        if let Some(timer) = self.pending().take() {
            timer.abort();
        }
    }
}

impl Drop for SearchPipeline {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
