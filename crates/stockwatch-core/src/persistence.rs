//! Persistent key-value boundary for the watchlist.
//!
//! Only the watchlist survives a session. It is stored as a JSON array of
//! [`Stock`] under [`WATCHLIST_KEY`]; unreadable content on startup is
//! discarded and the session starts empty.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::warn;

use crate::{PersistenceError, Stock};

pub const WATCHLIST_KEY: &str = "stock-watchlist";

/// String-keyed, string-valued storage in the manner of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// One JSON file per key inside a directory.
///
/// Clones share one write lock, so concurrent writers never interleave in
/// the staging file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let io_error = |source| PersistenceError::Io {
            key: key.to_owned(),
            source,
        };

        let _write = self
            .write_lock
            .lock()
            .expect("file store lock should not be poisoned");
        fs::create_dir_all(&self.dir).map_err(io_error)?;

        // Write-then-rename so a crash never leaves a half-written file behind.
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        let mut file = fs::File::create(&staging).map_err(io_error)?;
        file.write_all(value.as_bytes()).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        fs::rename(&staging, &target).map_err(io_error)
    }
}

/// Volatile store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .expect("memory store should not be poisoned")
            .insert(key.into(), value.into());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self
            .entries
            .lock()
            .expect("memory store should not be poisoned")
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .lock()
            .expect("memory store should not be poisoned")
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Read the stored watchlist, reporting why it could not be used.
pub fn read_watchlist(store: &dyn KeyValueStore) -> Result<Option<Vec<Stock>>, PersistenceError> {
    let Some(raw) = store.get(WATCHLIST_KEY)? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| PersistenceError::Malformed {
            key: WATCHLIST_KEY.to_owned(),
            source,
        })
}

/// Read the stored watchlist, falling back to empty on any failure.
pub fn load_watchlist(store: &dyn KeyValueStore) -> Vec<Stock> {
    match read_watchlist(store) {
        Ok(stocks) => stocks.unwrap_or_default(),
        Err(error) => {
            warn!("discarding stored watchlist: {error}");
            Vec::new()
        }
    }
}

pub fn save_watchlist(store: &dyn KeyValueStore, stocks: &[Stock]) -> Result<(), PersistenceError> {
    let encoded = serde_json::to_string(stocks).map_err(|source| PersistenceError::Encode {
        key: WATCHLIST_KEY.to_owned(),
        source,
    })?;
    store.set(WATCHLIST_KEY, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Symbol, UtcDateTime};

    fn stock(symbol: &str) -> Stock {
        Stock::new(
            Symbol::parse(symbol).expect("valid symbol"),
            "Test Corp",
            10.0,
            0.5,
            5.0,
            100,
            1_000,
            UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid timestamp"),
        )
        .expect("valid stock")
    }

    #[test]
    fn file_store_round_trips_watchlist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("nested"));

        assert!(load_watchlist(&store).is_empty());
        save_watchlist(&store, &[stock("AAPL"), stock("MSFT")]).expect("save succeeds");

        let loaded = load_watchlist(&store);
        assert_eq!(loaded, vec![stock("AAPL"), stock("MSFT")]);
        assert!(dir.path().join("nested/stock-watchlist.json").exists());
    }

    #[test]
    fn concurrent_writers_leave_a_readable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());
        let lists: Vec<Vec<Stock>> = ["AAPL", "MSFT", "TSLA", "NVDA", "AMZN", "META"]
            .iter()
            .map(|raw| vec![stock(raw), stock("GOOGL")])
            .collect();

        let writers: Vec<_> = lists
            .iter()
            .cloned()
            .map(|list| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        save_watchlist(&store, &list).expect("save succeeds");
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread completes");
        }

        let stored = read_watchlist(&store)
            .expect("stored file is well formed")
            .expect("present");
        assert!(lists.contains(&stored));
        assert_eq!(store.dir(), dir.path());
    }

    #[test]
    fn malformed_content_falls_back_to_empty() {
        let store = MemoryStore::with_entry(WATCHLIST_KEY, "{not json");
        assert!(matches!(
            read_watchlist(&store),
            Err(PersistenceError::Malformed { .. })
        ));
        assert!(load_watchlist(&store).is_empty());
    }

    #[test]
    fn invalid_records_discard_whole_list() {
        let store = MemoryStore::with_entry(
            WATCHLIST_KEY,
            r#"[{"symbol":"not a ticker","name":"x","price":1,"change":0,"changePercent":0,
                "volume":0,"marketCap":0,"lastUpdated":"2024-01-01T00:00:00Z"}]"#,
        );
        assert!(load_watchlist(&store).is_empty());
    }

    #[test]
    fn stored_layout_uses_camel_case() {
        let store = MemoryStore::new();
        save_watchlist(&store, &[stock("AAPL")]).expect("save succeeds");

        let raw = store.get(WATCHLIST_KEY).expect("readable").expect("present");
        assert!(raw.starts_with('['));
        assert!(raw.contains("\"changePercent\":5.0"));
        assert!(raw.contains("\"lastUpdated\":\"2024-01-01T00:00:00Z\""));
    }
}
