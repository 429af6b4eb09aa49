use std::path::{Path, PathBuf};
use std::time::Duration;

use jikan::SearchFilters;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::models::UserPreferences;
use crate::StoreError;

const PREFERENCES_FILE: &str = "preferences.json";
const FILTERS_FILE: &str = "filters.json";

/// Trailing quiet period before the last-used filters are flushed.
const FILTER_FLUSH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Maximum number of remembered search queries.
const RECENT_SEARCH_LIMIT: usize = 10;

/// Per-user preference persistence.
///
/// Two JSON documents live under the data directory: the preferences
/// (favorites, watchlist, recent searches, preferred genres) and the
/// last-used search filters. Preference mutations flush immediately;
/// filter changes flush on a trailing debounce since they arrive once
/// per keystroke. Stored documents that fail to parse are discarded and
/// replaced by defaults.
pub struct PreferenceStore {
    preferences_path: PathBuf,
    preferences: watch::Sender<UserPreferences>,
    filters: watch::Sender<SearchFilters>,
}

impl PreferenceStore {
    /// Open the store, loading both documents from `data_dir`.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;

        let preferences_path = data_dir.join(PREFERENCES_FILE);
        let filters_path = data_dir.join(FILTERS_FILE);

        let preferences: UserPreferences = load_or_default(&preferences_path).await;
        let filters: SearchFilters = load_or_default(&filters_path).await;

        let (preferences, _) = watch::channel(preferences);
        let (filters, filter_watcher) = watch::channel(filters);

        spawn_filter_flush(filters_path, filter_watcher);

        Ok(Self {
            preferences_path,
            preferences,
            filters,
        })
    }

    /// Current preferences (fast, no I/O).
    pub fn get(&self) -> UserPreferences {
        self.preferences.borrow().clone()
    }

    /// Subscribe to preference changes.
    pub fn subscribe(&self) -> watch::Receiver<UserPreferences> {
        self.preferences.subscribe()
    }

    pub fn is_favorite(&self, id: i64) -> bool {
        self.preferences.borrow().favorites.contains(&id)
    }

    pub fn is_in_watchlist(&self, id: i64) -> bool {
        self.preferences.borrow().watchlist.contains(&id)
    }

    pub async fn add_favorite(&self, id: i64) -> Result<(), StoreError> {
        self.update(|p| {
            p.favorites.retain(|&existing| existing != id);
            p.favorites.push(id);
        })
        .await
    }

    pub async fn remove_favorite(&self, id: i64) -> Result<(), StoreError> {
        self.update(|p| p.favorites.retain(|&existing| existing != id))
            .await
    }

    pub async fn add_to_watchlist(&self, id: i64) -> Result<(), StoreError> {
        self.update(|p| {
            p.watchlist.retain(|&existing| existing != id);
            p.watchlist.push(id);
        })
        .await
    }

    pub async fn remove_from_watchlist(&self, id: i64) -> Result<(), StoreError> {
        self.update(|p| p.watchlist.retain(|&existing| existing != id))
            .await
    }

    /// Remember a search query: most recent first, deduplicated, capped.
    /// Blank queries are ignored.
    pub async fn add_recent_search(&self, query: &str) -> Result<(), StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        self.update(|p| {
            p.recent_searches.retain(|existing| existing != query);
            p.recent_searches.insert(0, query.to_string());
            p.recent_searches.truncate(RECENT_SEARCH_LIMIT);
        })
        .await
    }

    pub async fn clear_recent_searches(&self) -> Result<(), StoreError> {
        self.update(|p| p.recent_searches.clear()).await
    }

    pub async fn set_preferred_genres(&self, genres: Vec<i64>) -> Result<(), StoreError> {
        self.update(|p| p.preferred_genres = genres).await
    }

    /// Apply a mutation, flush to disk, then broadcast.
    async fn update<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut UserPreferences),
    {
        let mut updated = self.preferences.borrow().clone();
        apply(&mut updated);

        write_json(&self.preferences_path, &updated).await?;
        self.preferences.send_replace(updated);
        Ok(())
    }

    /// Current in-memory filters.
    pub fn filters(&self) -> SearchFilters {
        self.filters.borrow().clone()
    }

    /// Subscribe to filter changes.
    pub fn subscribe_filters(&self) -> watch::Receiver<SearchFilters> {
        self.filters.subscribe()
    }

    /// Record the last-used filters. The flush to disk happens after the
    /// debounce window; the in-memory value is visible immediately.
    pub fn set_filters(&self, filters: SearchFilters) {
        self.filters.send_replace(filters);
    }
}

/// Load a stored JSON document, falling back to defaults on any failure.
async fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Discarding malformed {}: {}", path.display(), e);
                T::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Save a JSON document atomically via write-to-temp-then-rename.
async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await?;
    tokio::fs::rename(&tmp_path, path).await?;

    tracing::debug!("Saved {}", path.display());
    Ok(())
}

/// Flush filter changes to disk after a trailing debounce.
///
/// The timer restarts while changes keep arriving; when the store is
/// dropped mid-window, the pending value is flushed before the task
/// exits.
fn spawn_filter_flush(path: PathBuf, mut watcher: watch::Receiver<SearchFilters>) {
    tokio::spawn(async move {
        loop {
            if watcher.changed().await.is_err() {
                break;
            }

            let mut closed = false;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(FILTER_FLUSH_DEBOUNCE) => break,
                    changed = watcher.changed() => {
                        if changed.is_err() {
                            closed = true;
                            break;
                        }
                    }
                }
            }

            let snapshot = watcher.borrow_and_update().clone();
            if let Err(e) = write_json(&path, &snapshot).await {
                tracing::warn!("Failed to flush filters to {}: {}", path.display(), e);
            }

            if closed {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use jikan::OrderBy;

    use super::*;

    #[tokio::test]
    async fn preferences_round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = PreferenceStore::open(dir.path()).await.unwrap();
        store.add_favorite(1).await.unwrap();
        store.add_favorite(2).await.unwrap();
        store.add_to_watchlist(3).await.unwrap();
        store.add_recent_search("frieren").await.unwrap();
        store.set_preferred_genres(vec![4, 22]).await.unwrap();
        let before = store.get();
        drop(store);

        let reopened = PreferenceStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.get(), before);
        assert!(reopened.is_favorite(1));
        assert!(reopened.is_in_watchlist(3));
        assert!(!reopened.is_favorite(3));
    }

    #[tokio::test]
    async fn corrupted_documents_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(PREFERENCES_FILE), "{not json")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join(FILTERS_FILE), "[1, 2")
            .await
            .unwrap();

        let store = PreferenceStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get(), UserPreferences::default());
        assert_eq!(store.filters(), SearchFilters::default());
    }

    #[tokio::test]
    async fn favorites_do_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path()).await.unwrap();

        store.add_favorite(1).await.unwrap();
        store.add_favorite(2).await.unwrap();
        store.add_favorite(1).await.unwrap();

        // Re-adding moves the id to the end instead of duplicating it.
        assert_eq!(store.get().favorites, vec![2, 1]);

        store.remove_favorite(2).await.unwrap();
        assert_eq!(store.get().favorites, vec![1]);
    }

    #[tokio::test]
    async fn recent_searches_dedupe_and_cap() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path()).await.unwrap();

        for i in 0..12 {
            store
                .add_recent_search(&format!("query {}", i))
                .await
                .unwrap();
        }
        let searches = store.get().recent_searches;
        assert_eq!(searches.len(), RECENT_SEARCH_LIMIT);
        assert_eq!(searches[0], "query 11");

        store.add_recent_search("query 11").await.unwrap();
        let searches = store.get().recent_searches;
        assert_eq!(searches.len(), RECENT_SEARCH_LIMIT);
        assert_eq!(searches[0], "query 11");

        store.add_recent_search("   ").await.unwrap();
        assert_eq!(store.get().recent_searches.len(), RECENT_SEARCH_LIMIT);

        store.clear_recent_searches().await.unwrap();
        assert!(store.get().recent_searches.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rapid_filter_updates_flush_once_after_the_debounce() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path()).await.unwrap();

        let mut first = SearchFilters::default();
        first.query = "first".to_string();
        let mut second = SearchFilters::default();
        second.query = "second".to_string();
        second.order_by = OrderBy::Rank;

        store.set_filters(first);
        store.set_filters(second.clone());
        assert_eq!(store.filters(), second);

        tokio::time::sleep(FILTER_FLUSH_DEBOUNCE + Duration::from_millis(300)).await;

        let content = tokio::fs::read_to_string(dir.path().join(FILTERS_FILE))
            .await
            .unwrap();
        let stored: SearchFilters = serde_json::from_str(&content).unwrap();
        assert_eq!(stored, second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_filters_flush_when_the_store_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path()).await.unwrap();

        let mut filters = SearchFilters::default();
        filters.query = "parting shot".to_string();
        store.set_filters(filters.clone());
        drop(store);

        // The flush task notices the closed channel and writes without
        // waiting out the debounce.
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if dir.path().join(FILTERS_FILE).exists() {
                break;
            }
        }

        let content = tokio::fs::read_to_string(dir.path().join(FILTERS_FILE))
            .await
            .unwrap();
        let stored: SearchFilters = serde_json::from_str(&content).unwrap();
        assert_eq!(stored, filters);
    }
}
