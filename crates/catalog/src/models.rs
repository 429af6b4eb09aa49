use serde::{Deserialize, Serialize};

/// Per-user catalog preferences, persisted as one JSON document.
///
/// Identifier lists keep insertion order; `recent_searches` is most
/// recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub favorites: Vec<i64>,
    pub watchlist: Vec<i64>,
    pub recent_searches: Vec<String>,
    pub preferred_genres: Vec<i64>,
}
