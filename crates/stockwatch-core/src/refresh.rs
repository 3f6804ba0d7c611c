//! Periodic quote refresh for the watchlist.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::market_data::{MarketDataError, MarketDataProvider};
use crate::store::WatchlistStore;
use crate::Symbol;

/// Outcome of one refresh batch.
///
/// Quotes that arrive for a symbol removed while the batch was in flight are
/// dropped and appear in none of the lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub refreshed: Vec<Symbol>,
    pub unavailable: Vec<Symbol>,
    pub failed: Vec<(Symbol, MarketDataError)>,
}

impl RefreshReport {
    pub fn attempted(&self) -> usize {
        self.refreshed.len() + self.unavailable.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.unavailable.is_empty() && self.failed.is_empty()
    }
}

struct Refresher {
    store: Arc<WatchlistStore>,
    provider: Arc<dyn MarketDataProvider>,
    in_flight: AtomicUsize,
}

// Counts running batches so overlapping manual refreshes keep the flag set
// until the last one settles.
struct RefreshGuard<'a>(&'a AtomicUsize);

impl<'a> RefreshGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Refresher {
    fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    async fn refresh_all(&self) -> RefreshReport {
        let _guard = RefreshGuard::enter(&self.in_flight);

        let symbols: Vec<Symbol> = self
            .store
            .watchlist()
            .into_iter()
            .map(|stock| stock.symbol)
            .collect();
        if symbols.is_empty() {
            return RefreshReport::default();
        }

        let fetches = symbols.into_iter().map(|symbol| async move {
            let outcome = self.provider.fetch_quote(&symbol).await;
            (symbol, outcome)
        });

        let mut report = RefreshReport::default();
        let mut quotes = Vec::new();
        for (symbol, outcome) in join_all(fetches).await {
            match outcome {
                Ok(Some(quote)) => quotes.push(quote),
                Ok(None) => {
                    warn!("no quote returned for {symbol}");
                    report.unavailable.push(symbol);
                }
                Err(error) => {
                    warn!("error refreshing {symbol}: {error}");
                    report.failed.push((symbol, error));
                }
            }
        }

        // One transition and one write for the whole batch.
        report.refreshed = self.store.merge_quotes(quotes);

        info!(
            "refresh finished: {} refreshed, {} unavailable, {} failed",
            report.refreshed.len(),
            report.unavailable.len(),
            report.failed.len()
        );
        report
    }
}

/// Drives [`RefreshScheduler::refresh_all`] on a fixed interval.
///
/// The timer only runs while the watchlist has entries and restarts whenever
/// the number of entries changes.
pub struct RefreshScheduler {
    refresher: Arc<Refresher>,
    interval: Duration,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<WatchlistStore>,
        provider: Arc<dyn MarketDataProvider>,
        interval: Duration,
    ) -> Self {
        Self {
            refresher: Arc::new(Refresher {
                store,
                provider,
                in_flight: AtomicUsize::new(0),
            }),
            interval,
            stop_tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Fetch a fresh quote for every watchlist entry concurrently, then merge
    /// every success into the store once the whole batch has settled.
    pub async fn refresh_all(&self) -> RefreshReport {
        self.refresher.refresh_all().await
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresher.is_refreshing()
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx
            .lock()
            .expect("scheduler lock should not be poisoned")
            .is_some()
    }

    /// Spawn the periodic loop on the current runtime. Returns `false` when
    /// it is already running.
    pub fn start(&self) -> bool {
        let mut stop_slot = self.stop_tx.lock().expect("scheduler lock should not be poisoned");
        if stop_slot.is_some() {
            warn!("refresh scheduler is already running");
            return false;
        }

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        *stop_slot = Some(stop_tx);

        let refresher = Arc::clone(&self.refresher);
        let interval = self.interval;
        let task = tokio::spawn(async move {
            let mut changes = refresher.store.subscribe();
            loop {
                let entries = {
                    let state = changes.borrow_and_update();
                    state.watchlist().len()
                };

                if entries == 0 {
                    debug!("watchlist is empty, refresh paused");
                    select! {
                        alive = async {
                            changes.wait_for(|state| !state.watchlist().is_empty()).await.is_ok()
                        } => {
                            if !alive {
                                return;
                            }
                        }
                        _ = stop_rx.recv() => {
                            info!("stopping refresh scheduler");
                            return;
                        }
                    }
                    continue;
                }

                select! {
                    _ = sleep(interval) => {
                        if refresher.is_refreshing() {
                            debug!("refresh already in flight, skipping tick");
                            continue;
                        }
                        refresher.refresh_all().await;
                    }
                    alive = async {
                        changes.wait_for(|state| state.watchlist().len() != entries).await.is_ok()
                    } => {
                        if !alive {
                            return;
                        }
                    }
                    _ = stop_rx.recv() => {
                        info!("stopping refresh scheduler");
                        return;
                    }
                }
            }
        });

        *self.task.lock().expect("scheduler lock should not be poisoned") = Some(task);
        info!("refresh scheduler started, interval {}s", interval.as_secs());
        true
    }

    /// Signal the loop to stop. A batch already running completes first.
    pub async fn stop(&self) {
        let stop_tx = self
            .stop_tx
            .lock()
            .expect("scheduler lock should not be poisoned")
            .take();
        if let Some(tx) = stop_tx {
            let _ = tx.send(()).await;
            info!("refresh scheduler stop signal sent");
        }

        let task = self.task.lock().expect("scheduler lock should not be poisoned").take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                warn!("refresh scheduler task ended abnormally: {error}");
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}
