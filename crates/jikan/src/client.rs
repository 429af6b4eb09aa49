use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::gate::RequestGate;
use crate::models::{Anime, Genre, Recommendation, Response};
use crate::search::SearchFilters;
use crate::JikanError;

const BASE_URL: &str = "https://api.jikan.moe/v4";

/// Typed client for the Jikan v4 anime metadata API.
///
/// All outbound calls pass through a single [`RequestGate`], so no two
/// requests from one client are dispatched closer together than the
/// minimum spacing the upstream rate limit requires. Every operation
/// returns a typed error; callers wanting empty-result fallbacks layer
/// them on top.
pub struct JikanClient {
    client: Client,
    base_url: String,
    gate: RequestGate,
}

impl JikanClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            gate: RequestGate::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Dispatch one gated GET request and decode the response envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> crate::Result<T> {
        self.gate.wait().await;

        let mut request = self.client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> crate::Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::debug!("Upstream returned status {}", status);
            return Err(JikanError::Api {
                status_code: status.as_u16(),
                message: body,
            });
        }
        decode(&body)
    }

    /// Top ranked entries (`GET /top/anime`).
    pub async fn top_anime(&self, limit: u32) -> crate::Result<Vec<Anime>> {
        let response: Response<Vec<Anime>> = self
            .get("/top/anime", &[("limit", limit.to_string())])
            .await?;
        Ok(response.data)
    }

    /// Entries airing this season (`GET /seasons/now`).
    pub async fn currently_airing(&self, limit: u32) -> crate::Result<Vec<Anime>> {
        let response: Response<Vec<Anime>> = self
            .get("/seasons/now", &[("limit", limit.to_string())])
            .await?;
        Ok(response.data)
    }

    /// Announced entries for upcoming seasons (`GET /seasons/upcoming`).
    pub async fn upcoming(&self, limit: u32) -> crate::Result<Vec<Anime>> {
        let response: Response<Vec<Anime>> = self
            .get("/seasons/upcoming", &[("limit", limit.to_string())])
            .await?;
        Ok(response.data)
    }

    /// Trending entries.
    ///
    /// The upstream has no trending feed; the current season ordered by
    /// popularity stands in for one.
    pub async fn trending(&self, limit: u32) -> crate::Result<Vec<Anime>> {
        let response: Response<Vec<Anime>> = self
            .get(
                "/seasons/now",
                &[
                    ("order_by", "popularity".to_string()),
                    ("sort", "asc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(response.data)
    }

    /// Free-text search (`GET /anime?q=`).
    pub async fn search_anime(&self, query: &str, limit: u32) -> crate::Result<Vec<Anime>> {
        let response: Response<Vec<Anime>> = self
            .get(
                "/anime",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(response.data)
    }

    /// Single entry by MAL id (`GET /anime/{id}`).
    pub async fn anime_by_id(&self, id: i64) -> crate::Result<Anime> {
        let response: Response<Anime> = self.get(&format!("/anime/{}", id), &[]).await?;
        Ok(response.data)
    }

    /// One random entry (`GET /random/anime`).
    pub async fn random_anime(&self) -> crate::Result<Anime> {
        let response: Response<Anime> = self.get("/random/anime", &[]).await?;
        Ok(response.data)
    }

    /// Entries tagged with a genre (`GET /anime?genres=`).
    pub async fn anime_by_genre(&self, genre_id: i64, limit: u32) -> crate::Result<Vec<Anime>> {
        let response: Response<Vec<Anime>> = self
            .get(
                "/anime",
                &[
                    ("genres", genre_id.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(response.data)
    }

    /// Full genre list (`GET /genres/anime`).
    pub async fn genres(&self) -> crate::Result<Vec<Genre>> {
        let response: Response<Vec<Genre>> = self.get("/genres/anime", &[]).await?;
        Ok(response.data)
    }

    /// Recommendations for an entry (`GET /anime/{id}/recommendations`),
    /// unwrapped and truncated to `limit`.
    pub async fn recommendations_for(&self, id: i64, limit: u32) -> crate::Result<Vec<Anime>> {
        let response: Response<Vec<Recommendation>> = self
            .get(&format!("/anime/{}/recommendations", id), &[])
            .await?;
        Ok(response
            .data
            .into_iter()
            .take(limit as usize)
            .map(|r| r.entry)
            .collect())
    }

    /// Filtered search (`GET /anime` with compiled filter parameters).
    pub async fn search(
        &self,
        filters: &SearchFilters,
        page: u32,
        limit: u32,
    ) -> crate::Result<Vec<Anime>> {
        let params = filters.query_params(page, limit);
        let response: Response<Vec<Anime>> = self.get("/anime", &params).await?;
        Ok(response.data)
    }
}

/// Decode a successful response body, reporting the failing path.
fn decode<T: DeserializeOwned>(body: &str) -> crate::Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(deserializer).map_err(|e| {
        let path = e.path().to_string();
        tracing::debug!("Failed to decode upstream payload at {}", path);
        JikanError::Json {
            path,
            source: e.into_inner(),
        }
    })
}
