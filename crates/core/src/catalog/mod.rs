//! Game catalog access.

/// Concurrent category and detail fetching.
pub mod fetcher;
/// In-memory sample catalog.
pub mod fixture;
/// HTTP implementation against the public catalog API.
pub mod live;
/// Capability trait shared by every catalog implementation.
pub mod source;

pub use fetcher::{dedupe_against, CatalogFetcher, CategoryMap, CategoryQuery, TRENDING};
pub use fixture::FixtureCatalog;
pub use live::LiveCatalog;
pub use source::{CatalogSource, GameQuery};
