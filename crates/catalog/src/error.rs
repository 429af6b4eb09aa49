use thiserror::Error;

/// Errors surfaced by [`crate::MediaSource`] implementations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Jikan API error: {0}")]
    Jikan(#[from] jikan::JikanError),

    #[error("Source {0} is not available")]
    SourceUnavailable(&'static str),
}

/// Errors surfaced when persisting preferences.
///
/// Reading never fails: malformed or missing stored documents fall back
/// to defaults.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write preference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}
