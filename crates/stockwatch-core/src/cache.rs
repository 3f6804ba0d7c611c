//! In-memory caching for market-data responses.
//!
//! Entries expire lazily: an expired entry is evicted by the lookup that finds
//! it, and nothing sweeps the map in the background.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::Symbol;

/// Time-to-live applied when no other TTL is configured.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Provider operation a cache key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    Search,
    Quote,
    Overview,
}

impl CacheNamespace {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Quote => "quote",
            Self::Overview => "overview",
        }
    }
}

/// Compound key of operation and subject, so that different operations on the
/// same symbol never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: CacheNamespace,
    key: String,
}

impl CacheKey {
    pub fn new(namespace: CacheNamespace, key: impl Into<String>) -> Self {
        Self {
            namespace,
            key: key.into(),
        }
    }

    pub fn quote(symbol: &Symbol) -> Self {
        Self::new(CacheNamespace::Quote, symbol.as_str())
    }

    pub fn overview(symbol: &Symbol) -> Self {
        Self::new(CacheNamespace::Overview, symbol.as_str())
    }

    pub fn search(query: &str) -> Self {
        Self::new(CacheNamespace::Search, query.trim().to_ascii_lowercase())
    }

    pub const fn namespace(&self) -> CacheNamespace {
        self.namespace
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace.as_str(), self.key)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    captured_at: Instant,
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<CacheKey, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> CacheInner<V> {
    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.captured_at) < self.ttl
    }
}

/// Thread-safe TTL cache shared by the search and refresh paths.
///
/// Values are replaced whole on `set`, never mutated in place.
#[derive(Debug)]
pub struct ResponseCache<V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<V>>>,
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    /// Create a cache with a TTL of 5 minutes.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }

    /// Returns the cached value while it is younger than the TTL.
    ///
    /// An expired entry behaves as a miss and is removed from the map.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        {
            let store = self.inner.read().await;
            match store.map.get(key) {
                None => return None,
                Some(entry) if store.is_fresh(entry, now) => return Some(entry.data.clone()),
                Some(_) => {}
            }
        }

        let mut store = self.inner.write().await;
        // Another writer may have replaced the entry between the two locks.
        let fresh = store
            .map
            .get(key)
            .filter(|entry| store.is_fresh(entry, now))
            .map(|entry| entry.data.clone());
        if fresh.is_none() {
            store.map.remove(key);
        }
        fresh
    }

    pub async fn set(&self, key: CacheKey, data: V) {
        let mut store = self.inner.write().await;
        store.map.insert(
            key,
            CacheEntry {
                data,
                captured_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    pub async fn ttl(&self) -> Duration {
        self.inner.read().await.ttl
    }
}
