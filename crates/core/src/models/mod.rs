//! Shared domain models.

mod genre;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use genre::{genre_by_slug, Genre, GENRES};

/// A game as returned by the catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Catalog identifier.
    pub id: i64,
    /// Human-readable title.
    pub name: String,
    /// Cover image URL.
    #[serde(default, rename = "background_image")]
    pub image: Option<String>,
    /// HTML description, only present on the detail endpoint.
    #[serde(default)]
    pub description: Option<String>,
    /// Average rating (0-5).
    #[serde(default)]
    pub rating: Option<f64>,
    /// Platforms with their system requirements.
    #[serde(default)]
    pub platforms: Option<Vec<PlatformEntry>>,
    /// Genre tags.
    #[serde(default)]
    pub genres: Option<Vec<GenreTag>>,
    /// Screenshots, merged in from the screenshot endpoint.
    #[serde(default)]
    pub screenshots: Option<Vec<Screenshot>>,
}

impl Game {
    /// Minimal game with only an id and a name.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image: None,
            description: None,
            rating: None,
            platforms: None,
            genres: None,
            screenshots: None,
        }
    }

    /// Description with HTML tags removed and common entities decoded.
    pub fn plain_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(strip_html)
            .filter(|text| !text.is_empty())
    }

    /// Slug of the first genre tag, used to look up related games.
    pub fn primary_genre(&self) -> Option<&str> {
        self.genres
            .as_ref()
            .and_then(|genres| genres.first())
            .map(|genre| genre.slug.as_str())
    }

    /// Comma separated genre names.
    pub fn genre_names(&self) -> String {
        self.genres
            .as_ref()
            .map(|genres| {
                genres
                    .iter()
                    .map(|genre| genre.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
    }

    /// Platforms that publish at least one requirement block.
    pub fn requirements(&self) -> Vec<&PlatformEntry> {
        self.platforms
            .iter()
            .flatten()
            .filter(|entry| entry.requirement_block().is_some())
            .collect()
    }

    /// Favorites stub for this game.
    pub fn stub(&self) -> FavoriteGame {
        FavoriteGame {
            id: self.id,
            name: self.name.clone(),
            image: self.image.clone(),
            rating: self.rating,
        }
    }
}

/// Platform entry on a game detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntry {
    /// Platform descriptor.
    pub platform: Platform,
    /// System requirements. The API sends `{}` or `null` when unknown.
    #[serde(default)]
    pub requirements: Option<Requirements>,
    /// English requirements as sent by the list endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements_en: Option<Requirements>,
}

impl PlatformEntry {
    /// Whichever requirement block carries data.
    pub fn requirement_block(&self) -> Option<&Requirements> {
        [self.requirements.as_ref(), self.requirements_en.as_ref()]
            .into_iter()
            .flatten()
            .find(|req| req.minimum.is_some() || req.recommended.is_some())
    }
}

/// Platform descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    /// Display name (e.g. `PC`).
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
}

/// Minimum and recommended system requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    /// Minimum configuration.
    #[serde(default)]
    pub minimum: Option<String>,
    /// Recommended configuration.
    #[serde(default)]
    pub recommended: Option<String>,
}

/// Genre tag attached to a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreTag {
    /// Display name.
    pub name: String,
    /// API slug.
    pub slug: String,
}

/// Screenshot record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    /// Screenshot identifier.
    pub id: i64,
    /// Hosted image URL.
    pub image: String,
}

/// List envelope used by every paginated endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub results: Vec<T>,
}

/// Rating labels offered when writing a review.
pub const RATING_LABELS: [&str; 4] = ["Exceptional", "Recommended", "Meh", "Skip"];

/// A review written by a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Author's user id; also the document key.
    pub reviewer_id: String,
    /// Author's username at the time of writing.
    pub reviewer_name: String,
    /// Free-text body.
    pub body: String,
    /// One of [`RATING_LABELS`].
    pub rating: String,
    /// Author's profile picture.
    #[serde(default)]
    pub profile_picture: Option<String>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

/// Profile document of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Hosted picture URL.
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// Entry in a user's favorites collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteGame {
    /// Game id; also the document key.
    pub id: i64,
    /// Game title.
    pub name: String,
    /// Cover image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Average rating when favorited.
    #[serde(default)]
    pub rating: Option<f64>,
}

impl From<FavoriteGame> for Game {
    fn from(stub: FavoriteGame) -> Self {
        let mut game = Game::new(stub.id, stub.name);
        game.image = stub.image;
        game.rating = stub.rating;
        game
    }
}

fn strip_html(html: &str) -> String {
    static BREAK_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</p>").expect("invalid break regex"));
    static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("invalid tag regex"));

    let with_breaks = BREAK_RE.replace_all(html, "\n");
    let text = TAG_RE.replace_all(&with_breaks, "");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detail_payload() {
        let payload = r#"{
            "id": 3498,
            "name": "Grand Theft Auto V",
            "background_image": "https://media.example/gta.jpg",
            "description": "<p>Rockstar&#39;s open world.</p><p>Three heroes.</p>",
            "rating": 4.47,
            "platforms": [
                {"platform": {"id": 4, "name": "PC", "slug": "pc"},
                 "requirements": {"minimum": "4GB RAM", "recommended": "8GB RAM"}},
                {"platform": {"id": 187, "name": "PlayStation 5", "slug": "playstation5"},
                 "requirements": {}}
            ],
            "genres": [{"id": 4, "name": "Action", "slug": "action"}]
        }"#;
        let game: Game = serde_json::from_str(payload).unwrap();
        assert_eq!(game.id, 3498);
        assert_eq!(game.image.as_deref(), Some("https://media.example/gta.jpg"));
        assert_eq!(
            game.plain_description().as_deref(),
            Some("Rockstar's open world.\nThree heroes.")
        );
        assert_eq!(game.primary_genre(), Some("action"));
        let requirements = game.requirements();
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].platform.name, "PC");
        assert!(game.screenshots.is_none());
    }

    #[test]
    fn list_items_tolerate_missing_fields() {
        let page: Page<Game> =
            serde_json::from_str(r#"{"count": 1, "results": [{"id": 1, "name": "Bare"}]}"#)
                .unwrap();
        assert_eq!(page.results[0], Game::new(1, "Bare"));
    }

    #[test]
    fn stub_round_trips_into_game() {
        let mut game = Game::new(7, "Celeste");
        game.rating = Some(4.4);
        let back: Game = game.stub().into();
        assert_eq!(back.id, 7);
        assert_eq!(back.rating, Some(4.4));
    }
}
