//! Wiring of the catalog, store and user-facing services.

use std::{sync::Arc, time::Duration};

use tracing::{info, warn};

use crate::{
    account::{AccountService, LocalMediaUploader, MediaUploader, Session},
    catalog::{CatalogFetcher, CatalogSource, FixtureCatalog, LiveCatalog},
    config::AppConfig,
    favorites::FavoritesService,
    moderation::{ContentModerator, DenyList},
    reviews::ReviewService,
    search::SearchDebouncer,
    store::{DocumentStore, JsonFileStore},
};

/// Every service the frontend talks to, sharing one session and one store.
#[derive(Clone)]
pub struct Services {
    /// Catalog requests.
    pub catalog: CatalogFetcher,
    /// Sign-in and profile edits.
    pub accounts: AccountService,
    /// Favorites of the signed-in user.
    pub favorites: FavoritesService,
    /// Reviews of games.
    pub reviews: ReviewService,
    /// Genres shown as home rails.
    pub home_genres: Vec<String>,
    /// Debounce delay for search input.
    pub search_delay: Duration,
}

impl Services {
    /// Build services from configuration.
    ///
    /// An empty API key (or `storage.use_fixtures`) selects the sample catalog.
    pub fn from_config(config: &AppConfig) -> Self {
        let source: Arc<dyn CatalogSource> = if config.use_fixtures() {
            warn!("no API key configured; browsing the sample catalog");
            Arc::new(FixtureCatalog::new())
        } else {
            info!(base_url = %config.api.base_url, "using live catalog");
            Arc::new(LiveCatalog::new(&config.api))
        };
        let store: Arc<dyn DocumentStore> =
            Arc::new(JsonFileStore::new(config.storage.data_dir.join("store")));
        let uploader = Arc::new(LocalMediaUploader::new(config.storage.data_dir.join("media")));
        Self::assemble(source, store, uploader, config)
    }

    /// Build services over explicit collaborators.
    pub fn assemble(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn DocumentStore>,
        uploader: Arc<dyn MediaUploader>,
        config: &AppConfig,
    ) -> Self {
        let session = Session::new();
        let moderator = ContentModerator::new(DenyList::standard());
        Self {
            catalog: CatalogFetcher::new(source, config.api.page_size, config.browse.rail_limit),
            accounts: AccountService::new(store.clone(), uploader, session.clone()),
            favorites: FavoritesService::new(store.clone(), session.clone()),
            reviews: ReviewService::new(store, session, moderator),
            home_genres: config.browse.home_genres.clone(),
            search_delay: Duration::from_millis(config.browse.search_debounce_ms),
        }
    }

    /// A debouncer configured with the search delay.
    pub fn search_debouncer(&self) -> SearchDebouncer {
        SearchDebouncer::new(self.search_delay)
    }
}
