mod client;
mod error;
mod gate;
pub mod models;
mod search;

pub use client::JikanClient;
pub use error::JikanError;
pub use gate::{RequestGate, MIN_REQUEST_INTERVAL};
pub use models::{Anime, Genre, Pagination, Recommendation, Response};
pub use search::{OrderBy, SearchFilters, SortDirection};

pub type Result<T> = std::result::Result<T, JikanError>;
