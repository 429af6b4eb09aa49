use serde::{Deserialize, Serialize};

/// Response envelope used by every Jikan v4 endpoint.
///
/// `pagination` is decoded but not consulted anywhere: the upstream API does
/// not report totals reliably, so callers page until a short page comes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: Option<i64>,
    #[serde(default)]
    pub has_next_page: Option<bool>,
    #[serde(default)]
    pub current_page: Option<i64>,
}

/// Broadcast format of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "TV")]
    Tv,
    #[serde(rename = "Movie")]
    Movie,
    #[serde(rename = "OVA")]
    Ova,
    #[serde(rename = "Special")]
    Special,
    #[serde(rename = "ONA")]
    Ona,
    #[serde(rename = "Music")]
    Music,
    #[serde(other)]
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiringStatus {
    #[serde(rename = "Finished Airing")]
    Finished,
    #[serde(rename = "Currently Airing")]
    Airing,
    #[serde(rename = "Not yet aired")]
    NotYetAired,
    #[serde(other)]
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub small_image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: ImageSet,
}

/// One alternative title with its kind ("Default", "English", "Synonym", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Title {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aired {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Reference to a named MAL entity (genre, theme, demographic, studio).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalEntity {
    pub mal_id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// One catalog entry as returned by the upstream service.
///
/// Pass-through DTO: nothing in this workspace mutates it after decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anime {
    pub mal_id: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub images: Images,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub titles: Vec<Title>,
    #[serde(rename = "type", default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub episodes: Option<i32>,
    #[serde(default)]
    pub status: AiringStatus,
    #[serde(default)]
    pub airing: bool,
    #[serde(default)]
    pub aired: Option<Aired>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub scored_by: Option<i64>,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub members: Option<i64>,
    #[serde(default)]
    pub favorites: Option<i64>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<MalEntity>,
    #[serde(default)]
    pub themes: Vec<MalEntity>,
    #[serde(default)]
    pub demographics: Vec<MalEntity>,
    #[serde(default)]
    pub studios: Vec<MalEntity>,
}

/// Genre entry from `GET /genres/anime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub mal_id: i64,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub count: i64,
}

/// Recommendation item from `GET /anime/{id}/recommendations`.
///
/// The upstream nests the recommended entry one level down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub entry: Anime,
}
