use std::sync::Arc;

use async_trait::async_trait;
use jikan::{Anime, Genre, JikanClient, SearchFilters};

use crate::CatalogError;

/// Unified source of catalog data.
///
/// Abstracts the upstream metadata API so the gateway and its tests do
/// not depend on a live transport. Operations mirror the upstream
/// endpoints one to one; errors are typed, and the gateway decides how
/// to degrade them.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn top_ranked(&self, limit: u32) -> Result<Vec<Anime>, CatalogError>;

    async fn currently_airing(&self, limit: u32) -> Result<Vec<Anime>, CatalogError>;

    async fn upcoming(&self, limit: u32) -> Result<Vec<Anime>, CatalogError>;

    async fn trending(&self, limit: u32) -> Result<Vec<Anime>, CatalogError>;

    async fn search_text(&self, query: &str, limit: u32) -> Result<Vec<Anime>, CatalogError>;

    async fn by_id(&self, id: i64) -> Result<Anime, CatalogError>;

    async fn random(&self) -> Result<Anime, CatalogError>;

    async fn by_genre(&self, genre_id: i64, limit: u32) -> Result<Vec<Anime>, CatalogError>;

    async fn genres(&self) -> Result<Vec<Genre>, CatalogError>;

    async fn recommendations_for(&self, id: i64, limit: u32)
        -> Result<Vec<Anime>, CatalogError>;

    async fn search(
        &self,
        filters: &SearchFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Anime>, CatalogError>;

    /// Source name for logging and debugging.
    fn name(&self) -> &'static str;
}

/// Jikan-backed media source.
pub struct JikanSource {
    client: Arc<JikanClient>,
}

impl JikanSource {
    pub fn new(client: Arc<JikanClient>) -> Self {
        Self { client }
    }

    /// Create a source from a plain reqwest client.
    pub fn with_http_client(http_client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(JikanClient::new(http_client)),
        }
    }
}

#[async_trait]
impl MediaSource for JikanSource {
    async fn top_ranked(&self, limit: u32) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.top_anime(limit).await?)
    }

    async fn currently_airing(&self, limit: u32) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.currently_airing(limit).await?)
    }

    async fn upcoming(&self, limit: u32) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.upcoming(limit).await?)
    }

    async fn trending(&self, limit: u32) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.trending(limit).await?)
    }

    async fn search_text(&self, query: &str, limit: u32) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.search_anime(query, limit).await?)
    }

    async fn by_id(&self, id: i64) -> Result<Anime, CatalogError> {
        Ok(self.client.anime_by_id(id).await?)
    }

    async fn random(&self) -> Result<Anime, CatalogError> {
        Ok(self.client.random_anime().await?)
    }

    async fn by_genre(&self, genre_id: i64, limit: u32) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.anime_by_genre(genre_id, limit).await?)
    }

    async fn genres(&self) -> Result<Vec<Genre>, CatalogError> {
        Ok(self.client.genres().await?)
    }

    async fn recommendations_for(
        &self,
        id: i64,
        limit: u32,
    ) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.recommendations_for(id, limit).await?)
    }

    async fn search(
        &self,
        filters: &SearchFilters,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Anime>, CatalogError> {
        Ok(self.client.search(filters, page, limit).await?)
    }

    fn name(&self) -> &'static str {
        "jikan"
    }
}
