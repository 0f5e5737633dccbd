use async_trait::async_trait;

use crate::{
    error::FetchError,
    models::{Game, Screenshot},
};

/// Parameters of a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameQuery {
    /// Genre slug filter.
    pub genre: Option<String>,
    /// Ordering key such as `-rating` or `-added`.
    pub ordering: Option<String>,
    /// Number of results requested.
    pub page_size: u32,
    /// Free-text search term.
    pub search: Option<String>,
}

impl GameQuery {
    /// Query filtered by genre.
    pub fn genre(slug: impl Into<String>, page_size: u32) -> Self {
        Self {
            genre: Some(slug.into()),
            page_size,
            ..Self::default()
        }
    }

    /// Query sorted by an ordering key.
    pub fn ordered(ordering: impl Into<String>, page_size: u32) -> Self {
        Self {
            ordering: Some(ordering.into()),
            page_size,
            ..Self::default()
        }
    }

    /// Free-text search query.
    pub fn search(term: impl Into<String>, page_size: u32) -> Self {
        Self {
            search: Some(term.into()),
            page_size,
            ..Self::default()
        }
    }
}

/// Something that can answer catalog requests.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List games matching `query`.
    async fn list_games(&self, query: &GameQuery) -> Result<Vec<Game>, FetchError>;

    /// Full details of one game, without screenshots.
    async fn game_details(&self, id: i64) -> Result<Game, FetchError>;

    /// Screenshots of one game.
    async fn screenshots(&self, id: i64) -> Result<Vec<Screenshot>, FetchError>;
}
