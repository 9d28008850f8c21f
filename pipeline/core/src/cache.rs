//! Local State and Genre Cache
//!
//! [`LocalStore`] is a tiny JSON key/value file, read and written with async
//! I/O. [`GenreCache`] keeps the genre catalog in it under two fixed keys: the
//! list itself and the Unix-millisecond time it was fetched.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde_json::{Map, Value};

use crate::backend::GenreCatalog;

/// Key holding the cached genre list
pub const GENRES_KEY: &str = "genresCache";
/// Key holding the cache timestamp (Unix ms)
pub const GENRES_TIME_KEY: &str = "genresCacheTime";
/// How long a cached genre list stays fresh
pub const DEFAULT_GENRE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default store location (`$XDG_CACHE_HOME/poster-stormer/local_state.json`)
#[must_use]
pub fn default_store_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("poster-stormer").join("local_state.json"))
}

/// JSON key/value file
#[derive(Clone, Debug)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all entries; a missing or corrupt file reads as empty
    pub async fn load(&self) -> Map<String, Value> {
        let Ok(content) = tokio::fs::read_to_string(&self.path).await else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable local state");
                Map::new()
            }
        }
    }

    /// Read one entry
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.load().await.remove(key)
    }

    /// Write several entries at once
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn set_many(&self, entries: Vec<(&str, Value)>) -> anyhow::Result<()> {
        let mut map = self.load().await;
        for (key, value) in entries {
            map.insert(key.to_string(), value);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }

    /// Write one entry
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.set_many(vec![(key, value)]).await
    }
}

/// Time-boxed cache of the genre catalog
#[derive(Clone, Debug)]
pub struct GenreCache {
    store: LocalStore,
    ttl: Duration,
}

impl GenreCache {
    /// Cache in `store` with the given freshness window
    #[must_use]
    pub fn new(store: LocalStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Cached list and its timestamp, if both are present
    pub async fn cached(&self) -> Option<(Vec<String>, i64)> {
        let mut map = self.store.load().await;
        let genres = serde_json::from_value(map.remove(GENRES_KEY)?).ok()?;
        let time = map.remove(GENRES_TIME_KEY)?.as_i64()?;
        Some((genres, time))
    }

    /// Whether a list fetched at `fetched_ms` is still fresh at `now_ms`
    #[must_use]
    pub fn is_fresh(&self, fetched_ms: i64, now_ms: i64) -> bool {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(fetched_ms) < ttl_ms
    }

    /// Fresh cached list, else fetch and persist
    ///
    /// If fetching fails and a stale list exists, the stale list is returned.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when there is nothing cached to fall back on.
    pub async fn load_or_fetch(&self, catalog: &dyn GenreCatalog) -> anyhow::Result<Vec<String>> {
        self.load_or_fetch_at(catalog, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// [`Self::load_or_fetch`] with an explicit clock
    ///
    /// # Errors
    ///
    /// Returns the fetch error when there is nothing cached to fall back on.
    pub async fn load_or_fetch_at(
        &self,
        catalog: &dyn GenreCatalog,
        now_ms: i64,
    ) -> anyhow::Result<Vec<String>> {
        let cached = self.cached().await;
        if let Some((genres, fetched)) = &cached {
            if self.is_fresh(*fetched, now_ms) {
                tracing::debug!(count = genres.len(), "Using cached genres");
                return Ok(genres.clone());
            }
        }

        match catalog.fetch_genres().await {
            Ok(genres) => {
                let stored = self
                    .store
                    .set_many(vec![
                        (GENRES_KEY, Value::from(genres.clone())),
                        (GENRES_TIME_KEY, Value::from(now_ms)),
                    ])
                    .await;
                if let Err(e) = stored {
                    tracing::warn!(error = %e, "Failed to persist genre cache");
                }
                Ok(genres)
            }
            Err(e) => match cached {
                Some((genres, _)) => {
                    tracing::warn!(error = %e, "Genre fetch failed, using stale cache");
                    Ok(genres)
                }
                None => Err(e),
            },
        }
    }
}

/// First genre in the list, used as the form default
#[must_use]
pub fn default_genre(genres: &[String]) -> Option<&str> {
    genres.first().map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCatalog {
        genres: Option<Vec<String>>,
        calls: AtomicUsize,
    }

    impl CountingCatalog {
        fn ok(genres: &[&str]) -> Self {
            Self {
                genres: Some(genres.iter().map(ToString::to_string).collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                genres: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenreCatalog for CountingCatalog {
        async fn fetch_genres(&self) -> anyhow::Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.genres
                .clone()
                .ok_or_else(|| anyhow::anyhow!("catalog offline"))
        }
    }

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn cache_in(dir: &tempfile::TempDir) -> GenreCache {
        GenreCache::new(
            LocalStore::new(dir.path().join("nested").join("state.json")),
            DEFAULT_GENRE_TTL,
        )
    }

    #[tokio::test]
    async fn test_store_missing_or_corrupt_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("state.json"));
        assert!(store.load().await.is_empty());

        tokio::fs::write(store.path(), "not json").await.unwrap();
        assert!(store.load().await.is_empty());

        store.set("k", Value::from(1)).await.unwrap();
        assert_eq!(store.get("k").await, Some(Value::from(1)));
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        let catalog = CountingCatalog::ok(&["Action", "Drama"]);

        let first = cache.load_or_fetch_at(&catalog, 0).await.unwrap();
        let second = cache.load_or_fetch_at(&catalog, 23 * HOUR_MS).await.unwrap();

        assert_eq!(first, vec!["Action", "Drama"]);
        assert_eq!(second, first);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
        assert_eq!(default_genre(&second), Some("Action"));
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);

        cache
            .load_or_fetch_at(&CountingCatalog::ok(&["Old"]), 0)
            .await
            .unwrap();

        let catalog = CountingCatalog::ok(&["New"]);
        let genres = cache.load_or_fetch_at(&catalog, 24 * HOUR_MS).await.unwrap();
        assert_eq!(genres, vec!["New"]);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached().await, Some((vec!["New".to_string()], 24 * HOUR_MS)));
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);

        let err = cache
            .load_or_fetch_at(&CountingCatalog::failing(), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("catalog offline"));

        cache
            .load_or_fetch_at(&CountingCatalog::ok(&["Horror"]), 0)
            .await
            .unwrap();
        let genres = cache
            .load_or_fetch_at(&CountingCatalog::failing(), 48 * HOUR_MS)
            .await
            .unwrap();
        assert_eq!(genres, vec!["Horror"]);
    }
}
