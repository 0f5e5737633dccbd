use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::FetchError,
    models::{Game, GenreTag, Platform, PlatformEntry, Requirements, Screenshot},
};

use super::source::{CatalogSource, GameQuery};

/// Games counted as recently added for the `-added` ordering.
const RECENTLY_ADDED: usize = 6;

/// Catalog answering from fixed in-memory data.
#[derive(Debug, Clone)]
pub struct FixtureCatalog {
    games: Vec<Game>,
    screenshots: HashMap<i64, Vec<Screenshot>>,
}

impl FixtureCatalog {
    /// Catalog over the built-in sample games.
    pub fn new() -> Self {
        let games = sample_games();
        let screenshots = games
            .iter()
            .map(|game| {
                let shots = (1..=3)
                    .map(|n| Screenshot {
                        id: game.id * 10 + n,
                        image: format!("https://media.example.com/screenshots/{}-{n}.jpg", game.id),
                    })
                    .collect();
                (game.id, shots)
            })
            .collect();
        Self::from_parts(games, screenshots)
    }

    /// Catalog over caller-provided data.
    pub fn from_parts(games: Vec<Game>, screenshots: HashMap<i64, Vec<Screenshot>>) -> Self {
        Self { games, screenshots }
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogSource for FixtureCatalog {
    async fn list_games(&self, query: &GameQuery) -> Result<Vec<Game>, FetchError> {
        let needle = query
            .search
            .as_deref()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty());
        let mut matches: Vec<Game> = self
            .games
            .iter()
            .filter(|game| match &query.genre {
                Some(slug) => game
                    .genres
                    .iter()
                    .flatten()
                    .any(|genre| &genre.slug == slug),
                None => true,
            })
            .filter(|game| match &needle {
                Some(needle) => game.name.to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .map(|mut game| {
                // List endpoints never carry descriptions.
                game.description = None;
                game
            })
            .collect();

        match query.ordering.as_deref() {
            Some("-rating") => matches.sort_by(|a, b| {
                b.rating
                    .unwrap_or_default()
                    .total_cmp(&a.rating.unwrap_or_default())
            }),
            Some("name") => matches.sort_by(|a, b| a.name.cmp(&b.name)),
            Some("-name") => matches.sort_by(|a, b| b.name.cmp(&a.name)),
            // Insertion order doubles as release order; only the newest few count.
            Some("-added") => {
                matches.reverse();
                matches.truncate(RECENTLY_ADDED);
            }
            _ => {}
        }

        if query.page_size > 0 {
            matches.truncate(query.page_size as usize);
        }
        Ok(matches)
    }

    async fn game_details(&self, id: i64) -> Result<Game, FetchError> {
        self.games
            .iter()
            .find(|game| game.id == id)
            .cloned()
            .ok_or_else(|| FetchError::http(404, &format!("game {id} not found")))
    }

    async fn screenshots(&self, id: i64) -> Result<Vec<Screenshot>, FetchError> {
        Ok(self.screenshots.get(&id).cloned().unwrap_or_default())
    }
}

fn sample_games() -> Vec<Game> {
    let pc_requirements = |minimum: &str, recommended: &str| PlatformEntry {
        platform: Platform {
            name: "PC".to_string(),
            slug: "pc".to_string(),
        },
        requirements: Some(Requirements {
            minimum: Some(minimum.to_string()),
            recommended: Some(recommended.to_string()),
        }),
        requirements_en: None,
    };
    let console = |name: &str, slug: &str| PlatformEntry {
        platform: Platform {
            name: name.to_string(),
            slug: slug.to_string(),
        },
        requirements: None,
        requirements_en: None,
    };

    vec![
        sample(
            3498,
            "Grand Theft Auto V",
            4.47,
            &[("Action", "action"), ("Adventure", "adventure")],
            "<p>Rockstar's open world crime epic follows three very different criminals.</p>",
            vec![
                pc_requirements("OS: Windows 10, 8GB RAM", "OS: Windows 10, 16GB RAM"),
                console("PlayStation 5", "playstation5"),
            ],
        ),
        sample(
            3328,
            "The Witcher 3: Wild Hunt",
            4.65,
            &[("Action", "action"), ("RPG", "role-playing-games-rpg")],
            "<p>Geralt hunts monsters across a war-torn continent.</p>",
            vec![pc_requirements("GTX 660, 6GB RAM", "GTX 770, 8GB RAM")],
        ),
        sample(
            4200,
            "Portal 2",
            4.61,
            &[("Shooter", "shooter"), ("Puzzle", "puzzle")],
            "<p>Portal 2 draws from the award-winning formula of innovative gameplay.</p>",
            vec![pc_requirements("Dual core 2.0GHz, 2GB RAM", "Quad core, 4GB RAM")],
        ),
        sample(
            5286,
            "Tomb Raider",
            4.05,
            &[("Action", "action"), ("Adventure", "adventure")],
            "<p>A young Lara Croft is shipwrecked on a hostile island.</p>",
            vec![pc_requirements("Dual core, 2GB RAM", "Quad core, 4GB RAM")],
        ),
        sample(
            4291,
            "Counter-Strike: Global Offensive",
            3.57,
            &[("Action", "action"), ("Shooter", "shooter")],
            "<p>Team-based tactical shooter.</p>",
            vec![pc_requirements("2GB RAM, DirectX 9", "4GB RAM, DirectX 11")],
        ),
        sample(
            5679,
            "The Elder Scrolls V: Skyrim",
            4.42,
            &[("Action", "action"), ("RPG", "role-playing-games-rpg")],
            "<p>An open world fantasy where dragons have returned.</p>",
            vec![pc_requirements("Dual core 2.0GHz, 2GB RAM", "Quad core, 4GB RAM")],
        ),
        sample(
            12020,
            "Left 4 Dead 2",
            4.09,
            &[("Action", "action"), ("Shooter", "shooter")],
            "<p>Cooperative zombie survival across the Deep South.</p>",
            vec![pc_requirements("Pentium 4 3.0GHz", "Core 2 Duo 2.4GHz")],
        ),
        sample(
            28,
            "Red Dead Redemption 2",
            4.59,
            &[("Action", "action"), ("Adventure", "adventure")],
            "<p>An epic tale of life in America at the dawn of the modern age.</p>",
            vec![console("PlayStation 4", "playstation4"), console("Xbox One", "xbox-one")],
        ),
        sample(
            3439,
            "Life is Strange",
            4.11,
            &[("Adventure", "adventure")],
            "<p>A story-driven adventure about rewinding time.</p>",
            vec![pc_requirements("Dual core 2.0GHz, 2GB RAM", "Quad core, 4GB RAM")],
        ),
        sample(
            9767,
            "Hollow Knight",
            4.42,
            &[("Action", "action"), ("Indie", "indie"), ("Platformer", "platformer")],
            "<p>Forge your own path through a vast ruined kingdom of insects.</p>",
            vec![pc_requirements("Intel Core 2 Duo E5200, 4GB RAM", "Intel Core i5, 8GB RAM")],
        ),
        sample(
            58175,
            "God of War",
            4.56,
            &[("Action", "action"), ("Adventure", "adventure")],
            "<p>Kratos lives as a man in the realm of Norse gods.</p>",
            vec![console("PlayStation 4", "playstation4")],
        ),
        sample(
            22511,
            "The Legend of Zelda: Breath of the Wild",
            4.5,
            &[("Action", "action"), ("Adventure", "adventure"), ("RPG", "role-playing-games-rpg")],
            "<p>Step into a world of discovery and exploration.</p>",
            vec![console("Nintendo Switch", "nintendo-switch")],
        ),
        sample(
            1030,
            "Limbo",
            4.13,
            &[("Indie", "indie"), ("Puzzle", "puzzle"), ("Platformer", "platformer")],
            "<p>Uncertain of his sister's fate, a boy enters Limbo.</p>",
            vec![pc_requirements("2GHz, 512MB RAM", "2GHz, 1GB RAM")],
        ),
        sample(
            3272,
            "Rocket League",
            3.93,
            &[("Sports", "sports"), ("Racing", "racing"), ("Indie", "indie")],
            "<p>Soccer meets driving.</p>",
            vec![pc_requirements("2.5GHz Dual core, 4GB RAM", "3.0GHz Quad core, 8GB RAM")],
        ),
        sample(
            13537,
            "Half-Life 2",
            4.48,
            &[("Action", "action"), ("Shooter", "shooter")],
            "<p>Gordon Freeman wakes up in a dystopian City 17.</p>",
            vec![pc_requirements("1.7GHz, 512MB RAM", "3.0GHz, 1GB RAM")],
        ),
        sample(
            41494,
            "Cyberpunk 2077",
            4.2,
            &[("Action", "action"), ("RPG", "role-playing-games-rpg")],
            "<p>An open-world adventure set in Night City.</p>",
            vec![pc_requirements("Core i7-6700, 12GB RAM", "Core i7-12700, 16GB RAM")],
        ),
    ]
}

fn sample(
    id: i64,
    name: &str,
    rating: f64,
    genres: &[(&str, &str)],
    description: &str,
    platforms: Vec<PlatformEntry>,
) -> Game {
    Game {
        id,
        name: name.to_string(),
        image: Some(format!("https://media.example.com/games/{id}.jpg")),
        description: Some(description.to_string()),
        rating: Some(rating),
        platforms: Some(platforms),
        genres: Some(
            genres
                .iter()
                .map(|(name, slug)| GenreTag {
                    name: name.to_string(),
                    slug: slug.to_string(),
                })
                .collect(),
        ),
        screenshots: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_by_genre_and_page_size() {
        let catalog = FixtureCatalog::new();
        let games = catalog
            .list_games(&GameQuery::genre("shooter", 3))
            .await
            .unwrap();
        assert_eq!(games.len(), 3);
        assert!(games.iter().all(|game| game
            .genres
            .iter()
            .flatten()
            .any(|genre| genre.slug == "shooter")));
        assert!(games.iter().all(|game| game.description.is_none()));
    }

    #[tokio::test]
    async fn orders_by_rating() {
        let catalog = FixtureCatalog::new();
        let games = catalog
            .list_games(&GameQuery::ordered("-rating", 2))
            .await
            .unwrap();
        assert_eq!(games[0].name, "The Witcher 3: Wild Hunt");
        assert!(games[0].rating >= games[1].rating);
    }

    #[tokio::test]
    async fn searches_case_insensitively() {
        let catalog = FixtureCatalog::new();
        let games = catalog
            .list_games(&GameQuery::search("PORTAL", 20))
            .await
            .unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].id, 4200);
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let catalog = FixtureCatalog::new();
        let err = catalog.game_details(-1).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 404, .. }));
        assert_eq!(catalog.screenshots(3498).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn recently_added_is_a_short_newest_first_window() {
        let catalog = FixtureCatalog::new();
        let games = catalog
            .list_games(&GameQuery::ordered("-added", 20))
            .await
            .unwrap();
        assert_eq!(games.len(), RECENTLY_ADDED);
        assert_eq!(games[0].name, "Cyberpunk 2077");
    }
}
