use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::{
    error::FetchError,
    models::{genre_by_slug, Game},
};

use super::source::{CatalogSource, GameQuery};

/// Name of the rail that other rails are de-duplicated against.
pub const TRENDING: &str = "Trending";
/// Ordering key used for the trending rail.
pub const TRENDING_ORDERING: &str = "-added";

/// Results per category name.
pub type CategoryMap = HashMap<String, Vec<Game>>;

/// What a category filters on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Ordering key such as `-added`.
    Ordering(String),
    /// Genre slug.
    Genre(String),
}

/// One named category request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryQuery {
    /// Display name and key in the resulting map.
    pub name: String,
    /// Filter applied to the request.
    pub filter: CategoryFilter,
}

impl CategoryQuery {
    /// The trending category.
    pub fn trending() -> Self {
        Self {
            name: TRENDING.to_string(),
            filter: CategoryFilter::Ordering(TRENDING_ORDERING.to_string()),
        }
    }

    /// Category for a genre slug, named after the genre when it is known.
    pub fn genre(slug: &str) -> Self {
        let name = genre_by_slug(slug)
            .map(|genre| genre.name.to_string())
            .unwrap_or_else(|| slug.to_string());
        Self {
            name,
            filter: CategoryFilter::Genre(slug.to_string()),
        }
    }

    fn to_query(&self, page_size: u32) -> GameQuery {
        match &self.filter {
            CategoryFilter::Ordering(ordering) => GameQuery::ordered(ordering.clone(), page_size),
            CategoryFilter::Genre(slug) => GameQuery::genre(slug.clone(), page_size),
        }
    }
}

/// Remove every game of `list` already present in `trending`, then keep at most `max`.
pub fn dedupe_against(trending: &[Game], list: Vec<Game>, max: usize) -> Vec<Game> {
    let seen: HashSet<i64> = trending.iter().map(|game| game.id).collect();
    list.into_iter()
        .filter(|game| !seen.contains(&game.id))
        .take(max)
        .collect()
}

/// Issues catalog requests on behalf of the UI.
#[derive(Clone)]
pub struct CatalogFetcher {
    source: Arc<dyn CatalogSource>,
    page_size: u32,
    rail_limit: usize,
}

impl CatalogFetcher {
    /// Create a fetcher over `source`.
    pub fn new(source: Arc<dyn CatalogSource>, page_size: u32, rail_limit: usize) -> Self {
        Self {
            source,
            page_size,
            rail_limit,
        }
    }

    /// Maximum games kept in a de-duplicated rail.
    pub fn rail_limit(&self) -> usize {
        self.rail_limit
    }

    /// Fetch every category concurrently.
    ///
    /// Any failing category fails the whole call; no partial map is returned.
    pub async fn fetch_categories(
        &self,
        queries: &[CategoryQuery],
    ) -> Result<CategoryMap, FetchError> {
        let page_size = self.page_size;
        let requests = queries.iter().map(|category| async move {
            let games = self.source.list_games(&category.to_query(page_size)).await?;
            debug!(category = %category.name, count = games.len(), "category fetched");
            Ok::<_, FetchError>((category.name.clone(), games))
        });
        let results = try_join_all(requests).await?;
        Ok(results.into_iter().collect())
    }

    /// Trending rail followed by one rail per genre slug, in that order.
    ///
    /// Genre rails drop games already shown in Trending and are capped at the
    /// rail limit. A genre listed twice gets one rail, at its first position.
    pub async fn home_rails(&self, genres: &[String]) -> Result<Vec<(String, Vec<Game>)>, FetchError> {
        let mut queries = vec![CategoryQuery::trending()];
        let mut names: HashSet<String> = HashSet::from([TRENDING.to_string()]);
        for slug in genres {
            let query = CategoryQuery::genre(slug);
            if names.insert(query.name.clone()) {
                queries.push(query);
            } else {
                debug!(%slug, "duplicate home genre skipped");
            }
        }

        let mut map = self.fetch_categories(&queries).await?;
        let trending = map.remove(TRENDING).unwrap_or_default();

        let mut rails = Vec::with_capacity(queries.len());
        for query in queries.iter().skip(1) {
            let list = map.remove(&query.name).unwrap_or_default();
            rails.push((
                query.name.clone(),
                dedupe_against(&trending, list, self.rail_limit),
            ));
        }
        rails.insert(0, (TRENDING.to_string(), trending));
        info!(rails = rails.len(), "home rails loaded");
        Ok(rails)
    }

    /// Details of one game with its screenshots merged in.
    ///
    /// Both requests run concurrently; if either fails nothing is returned.
    pub async fn fetch_details(&self, id: i64) -> Result<Game, FetchError> {
        let (mut game, screenshots) =
            tokio::try_join!(self.source.game_details(id), self.source.screenshots(id))?;
        game.screenshots
            .get_or_insert_with(Vec::new)
            .extend(screenshots);
        Ok(game)
    }

    /// Games of one genre.
    pub async fn fetch_genre(&self, slug: &str) -> Result<Vec<Game>, FetchError> {
        self.source
            .list_games(&GameQuery::genre(slug, self.page_size))
            .await
    }

    /// Free-text search.
    pub async fn search(&self, term: &str) -> Result<Vec<Game>, FetchError> {
        self.source
            .list_games(&GameQuery::search(term.trim(), self.page_size))
            .await
    }

    /// Games sharing the first genre of `game`, excluding `game` itself.
    pub async fn fetch_related(&self, game: &Game) -> Result<Vec<Game>, FetchError> {
        let Some(slug) = game.primary_genre() else {
            return Ok(Vec::new());
        };
        let games = self.fetch_genre(slug).await?;
        Ok(games
            .into_iter()
            .filter(|candidate| candidate.id != game.id)
            .take(self.rail_limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        catalog::fixture::FixtureCatalog,
        models::Screenshot,
    };

    #[derive(Default)]
    struct Failures {
        genre: Option<String>,
        details: bool,
        screenshots: bool,
    }

    struct ScriptedCatalog {
        inner: FixtureCatalog,
        fail: Failures,
    }

    #[async_trait]
    impl CatalogSource for ScriptedCatalog {
        async fn list_games(&self, query: &GameQuery) -> Result<Vec<Game>, FetchError> {
            if query.genre.is_some() && query.genre == self.fail.genre {
                return Err(FetchError::Http {
                    status: 503,
                    body: String::new(),
                });
            }
            self.inner.list_games(query).await
        }

        async fn game_details(&self, id: i64) -> Result<Game, FetchError> {
            if self.fail.details {
                return Err(FetchError::Timeout);
            }
            self.inner.game_details(id).await
        }

        async fn screenshots(&self, id: i64) -> Result<Vec<Screenshot>, FetchError> {
            if self.fail.screenshots {
                return Err(FetchError::Timeout);
            }
            self.inner.screenshots(id).await
        }
    }

    fn fetcher(fail: Failures) -> CatalogFetcher {
        let source = ScriptedCatalog {
            inner: FixtureCatalog::new(),
            fail,
        };
        CatalogFetcher::new(Arc::new(source), 20, 10)
    }

    fn games(ids: impl IntoIterator<Item = i64>) -> Vec<Game> {
        ids.into_iter()
            .map(|id| Game::new(id, format!("game {id}")))
            .collect()
    }

    #[test]
    fn dedupe_removes_trending_ids_and_caps() {
        let trending = games([1, 2]);
        let action = games([2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
        let rail = dedupe_against(&trending, action, 10);
        assert_eq!(rail.len(), 10);
        assert!(rail.iter().all(|game| game.id != 2));
        assert_eq!(rail[0].id, 3);
    }

    #[tokio::test]
    async fn fetches_all_categories() {
        let fetcher = fetcher(Failures::default());
        let map = fetcher
            .fetch_categories(&[CategoryQuery::trending(), CategoryQuery::genre("shooter")])
            .await
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["Shooter"].len(), 4);
        assert!(!map[TRENDING].is_empty());
    }

    #[tokio::test]
    async fn one_failing_category_fails_the_aggregate() {
        let fetcher = fetcher(Failures {
            genre: Some("puzzle".to_string()),
            ..Failures::default()
        });
        let err = fetcher
            .fetch_categories(&[CategoryQuery::trending(), CategoryQuery::genre("puzzle")])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn home_rails_put_trending_first_and_dedupe_the_rest() {
        let fetcher = CatalogFetcher::new(Arc::new(FixtureCatalog::new()), 5, 3);
        let rails = fetcher
            .home_rails(&["action".to_string(), "indie".to_string()])
            .await
            .unwrap();
        let names: Vec<_> = rails.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec![TRENDING, "Action", "Indie"]);

        let trending_ids: HashSet<i64> = rails[0].1.iter().map(|game| game.id).collect();
        assert_eq!(trending_ids.len(), 5);
        for (_, rail) in &rails[1..] {
            assert!(rail.len() <= 3);
            assert!(rail.iter().all(|game| !trending_ids.contains(&game.id)));
        }
    }

    #[tokio::test]
    async fn duplicate_home_genres_yield_one_rail() {
        let fetcher = CatalogFetcher::new(Arc::new(FixtureCatalog::new()), 5, 3);
        let rails = fetcher
            .home_rails(&[
                "action".to_string(),
                "indie".to_string(),
                "action".to_string(),
            ])
            .await
            .unwrap();
        let names: Vec<_> = rails.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec![TRENDING, "Action", "Indie"]);
        assert!(!rails[1].1.is_empty());
    }

    #[tokio::test]
    async fn default_fixture_home_has_no_empty_genre_rails() {
        let config = crate::AppConfig::default();
        let fetcher = CatalogFetcher::new(
            Arc::new(FixtureCatalog::new()),
            config.api.page_size,
            config.browse.rail_limit,
        );
        let rails = fetcher.home_rails(&config.browse.home_genres).await.unwrap();
        assert_eq!(rails.len(), config.browse.home_genres.len() + 1);
        for (name, games) in &rails {
            assert!(!games.is_empty(), "{name} rail is empty");
        }
    }

    #[tokio::test]
    async fn details_merge_screenshots() {
        let fetcher = fetcher(Failures::default());
        let game = fetcher.fetch_details(3498).await.unwrap();
        assert!(game.description.is_some());
        assert_eq!(game.screenshots.map(|shots| shots.len()), Some(3));
    }

    #[tokio::test]
    async fn failed_screenshots_fail_the_details() {
        let fetcher = fetcher(Failures {
            screenshots: true,
            ..Failures::default()
        });
        assert!(matches!(
            fetcher.fetch_details(3498).await,
            Err(FetchError::Timeout)
        ));
    }

    #[tokio::test]
    async fn failed_details_fail_the_merge() {
        let fetcher = fetcher(Failures {
            details: true,
            ..Failures::default()
        });
        assert!(fetcher.fetch_details(3498).await.is_err());
    }

    #[tokio::test]
    async fn related_games_exclude_the_game_itself() {
        let fetcher = fetcher(Failures::default());
        let game = fetcher.fetch_details(4200).await.unwrap();
        let related = fetcher.fetch_related(&game).await.unwrap();
        assert!(!related.is_empty());
        assert!(related.iter().all(|candidate| candidate.id != 4200));

        let bare = Game::new(1, "No genres");
        assert!(fetcher.fetch_related(&bare).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_trims_the_term() {
        let fetcher = fetcher(Failures::default());
        let found = fetcher.search("  hollow ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Hollow Knight");
    }
}
