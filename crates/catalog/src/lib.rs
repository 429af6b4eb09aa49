//! Catalog service layer over the Jikan metadata API.
//!
//! UI collaborators consume two pieces:
//!
//! - [`Catalog`], the request gateway: empty-on-failure list operations,
//!   id-batched lookups and the recommendation mix, all behind the
//!   [`MediaSource`] seam so tests can substitute the transport.
//! - [`PreferenceStore`], the per-user persistence for favorites,
//!   watchlist, recent searches and the last-used search filters.

mod error;
mod gateway;
mod models;
mod source;
mod store;

pub use error::{CatalogError, StoreError};
pub use gateway::{Catalog, SearchGeneration, ID_BATCH_SIZE};
pub use models::UserPreferences;
pub use source::{JikanSource, MediaSource};
pub use store::PreferenceStore;

pub type Result<T> = std::result::Result<T, CatalogError>;
