use once_cell::sync::Lazy;

/// Catalog genre with the slug used by the `genres` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Genre {
    /// Display name.
    pub name: &'static str,
    /// API slug.
    pub slug: &'static str,
}

/// Every genre the catalog exposes, in display order.
pub static GENRES: Lazy<Vec<Genre>> = Lazy::new(|| {
    [
        ("Action", "action"),
        ("Indie", "indie"),
        ("Adventure", "adventure"),
        ("RPG", "role-playing-games-rpg"),
        ("Strategy", "strategy"),
        ("Shooter", "shooter"),
        ("Casual", "casual"),
        ("Simulation", "simulation"),
        ("Puzzle", "puzzle"),
        ("Arcade", "arcade"),
        ("Platformer", "platformer"),
        ("Massively Multiplayer", "massively-multiplayer"),
        ("Racing", "racing"),
        ("Sports", "sports"),
        ("Fighting", "fighting"),
        ("Family", "family"),
        ("Board Games", "board-games"),
        ("Educational", "educational"),
        ("Card", "card"),
    ]
    .into_iter()
    .map(|(name, slug)| Genre { name, slug })
    .collect()
});

/// Look up a genre by slug.
pub fn genre_by_slug(slug: &str) -> Option<Genre> {
    GENRES.iter().copied().find(|genre| genre.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_unique() {
        let mut slugs: Vec<_> = GENRES.iter().map(|genre| genre.slug).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), GENRES.len());
    }

    #[test]
    fn finds_rpg_by_slug() {
        assert_eq!(genre_by_slug("role-playing-games-rpg").map(|g| g.name), Some("RPG"));
        assert!(genre_by_slug("unknown").is_none());
    }
}
