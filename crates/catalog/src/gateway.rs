use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use jikan::{Anime, Genre, SearchFilters};
use rand::seq::SliceRandom;

use crate::source::MediaSource;
use crate::CatalogError;

/// Number of id lookups started concurrently within one batch of
/// [`Catalog::anime_by_ids`].
pub const ID_BATCH_SIZE: usize = 5;

/// Maximum length of the mixed recommendation list.
const RECOMMENDATION_LIMIT: usize = 20;

/// Token identifying one search invocation.
///
/// Dispatched requests cannot be cancelled, so a superseded search keeps
/// running; the caller captures a generation before issuing the search
/// and applies the response only while [`Catalog::is_current`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchGeneration(u64);

/// Request gateway consumed by UI collaborators.
///
/// List operations degrade any source failure to an empty list and
/// single-entity operations to `None`, logging the condition; zero
/// results and failure are indistinguishable here. Callers that need the
/// distinction use the [`MediaSource`] directly.
pub struct Catalog {
    source: Arc<dyn MediaSource>,
    search_generation: AtomicU64,
}

impl Catalog {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self {
            source,
            search_generation: AtomicU64::new(0),
        }
    }

    fn list_or_empty<T>(&self, operation: &str, result: Result<Vec<T>, CatalogError>) -> Vec<T> {
        match result {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("{} failed on {}: {}", operation, self.source.name(), e);
                Vec::new()
            }
        }
    }

    fn entry_or_none(&self, operation: &str, result: Result<Anime, CatalogError>) -> Option<Anime> {
        match result {
            Ok(anime) => Some(anime),
            Err(e) => {
                tracing::warn!("{} failed on {}: {}", operation, self.source.name(), e);
                None
            }
        }
    }

    pub async fn top_ranked(&self, limit: u32) -> Vec<Anime> {
        let result = self.source.top_ranked(limit).await;
        self.list_or_empty("top_ranked", result)
    }

    pub async fn currently_airing(&self, limit: u32) -> Vec<Anime> {
        let result = self.source.currently_airing(limit).await;
        self.list_or_empty("currently_airing", result)
    }

    pub async fn upcoming(&self, limit: u32) -> Vec<Anime> {
        let result = self.source.upcoming(limit).await;
        self.list_or_empty("upcoming", result)
    }

    pub async fn trending(&self, limit: u32) -> Vec<Anime> {
        let result = self.source.trending(limit).await;
        self.list_or_empty("trending", result)
    }

    pub async fn search_text(&self, query: &str, limit: u32) -> Vec<Anime> {
        let result = self.source.search_text(query, limit).await;
        self.list_or_empty("search_text", result)
    }

    pub async fn anime_by_id(&self, id: i64) -> Option<Anime> {
        let result = self.source.by_id(id).await;
        self.entry_or_none("anime_by_id", result)
    }

    pub async fn random_anime(&self) -> Option<Anime> {
        let result = self.source.random().await;
        self.entry_or_none("random_anime", result)
    }

    pub async fn anime_by_genre(&self, genre_id: i64, limit: u32) -> Vec<Anime> {
        let result = self.source.by_genre(genre_id, limit).await;
        self.list_or_empty("anime_by_genre", result)
    }

    pub async fn genres(&self) -> Vec<Genre> {
        let result = self.source.genres().await;
        self.list_or_empty("genres", result)
    }

    pub async fn recommendations_for(&self, id: i64, limit: u32) -> Vec<Anime> {
        let result = self.source.recommendations_for(id, limit).await;
        self.list_or_empty("recommendations_for", result)
    }

    pub async fn search(&self, filters: &SearchFilters, page: u32, limit: u32) -> Vec<Anime> {
        let result = self.source.search(filters, page, limit).await;
        self.list_or_empty("search", result)
    }

    /// Look up many entries by id, batched for rate-limit friendliness.
    ///
    /// Lookups within one batch start concurrently; the next batch starts
    /// only after the previous one fully completes, bounding in-flight
    /// requests to [`ID_BATCH_SIZE`]. Output preserves input order, with
    /// failed ids dropped. Input is not deduplicated.
    pub async fn anime_by_ids(&self, ids: &[i64]) -> Vec<Anime> {
        if ids.is_empty() {
            return Vec::new();
        }

        let mut all = Vec::with_capacity(ids.len());
        for batch in ids.chunks(ID_BATCH_SIZE) {
            let fetches = batch.iter().map(|&id| self.source.by_id(id));
            for (id, result) in batch.iter().zip(join_all(fetches).await) {
                match result {
                    Ok(anime) => all.push(anime),
                    Err(e) => tracing::warn!("Skipping id {}: {}", id, e),
                }
            }
        }
        all
    }

    /// Mixed recommendation feed for the landing view.
    ///
    /// The upstream has no direct recommendations feed, so top-ranked and
    /// currently-airing entries are fetched concurrently, shuffled
    /// together and truncated. The output order is not deterministic.
    pub async fn recent_recommendations(&self) -> Vec<Anime> {
        let (top, airing) = tokio::join!(
            self.source.top_ranked(10),
            self.source.currently_airing(10)
        );

        let mut mixed = self.list_or_empty("top_ranked", top);
        mixed.extend(self.list_or_empty("currently_airing", airing));
        mixed.shuffle(&mut rand::thread_rng());
        mixed.truncate(RECOMMENDATION_LIMIT);
        mixed
    }

    /// Claim a new search generation, superseding all earlier ones.
    pub fn begin_search(&self) -> SearchGeneration {
        SearchGeneration(self.search_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether a generation is still the latest issued.
    pub fn is_current(&self, generation: SearchGeneration) -> bool {
        self.search_generation.load(Ordering::SeqCst) == generation.0
    }
}
