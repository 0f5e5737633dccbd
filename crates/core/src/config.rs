//! Application configuration.
//!
//! Values come from `~/.config/ludex/config.toml`, overridden by
//! `LUDEX__<SECTION>__<KEY>` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = r#"# Ludex configuration

[api]
base_url = "https://api.rawg.io/api"
# Leave empty to browse the built-in sample catalog.
key = ""
page_size = 20

[browse]
rail_limit = 10
search_debounce_ms = 400
home_genres = ["action", "adventure", "role-playing-games-rpg", "indie"]

[storage]
use_fixtures = false
"#;

/// Catalog API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// API key sent as the `key` query parameter.
    pub key: String,
    /// Page size sent with every list request.
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rawg.io/api".to_string(),
            key: String::new(),
            page_size: 20,
        }
    }
}

/// Browsing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    /// Maximum games shown in a non-trending home rail.
    pub rail_limit: usize,
    /// Delay before a typed search query is sent.
    pub search_debounce_ms: u64,
    /// Genre slugs shown as rails on the home screen.
    pub home_genres: Vec<String>,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            rail_limit: 10,
            search_debounce_ms: 400,
            home_genres: vec![
                "action".to_string(),
                "adventure".to_string(),
                "role-playing-games-rpg".to_string(),
                "indie".to_string(),
            ],
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for the document store and uploaded media.
    pub data_dir: PathBuf,
    /// Force the sample catalog even when an API key is present.
    pub use_fixtures: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ludex"),
            use_fixtures: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `[api]` section.
    pub api: ApiConfig,
    /// `[browse]` section.
    pub browse: BrowseConfig,
    /// `[storage]` section.
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` (optional) plus environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("LUDEX").separator("__"))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Whether the sample catalog should be used instead of the live API.
    pub fn use_fixtures(&self) -> bool {
        self.storage.use_fixtures || self.api.key.trim().is_empty()
    }
}

/// Path of the user configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ludex")
        .join("config.toml")
}

/// Write the default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_matches_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ludex/config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        let defaults = AppConfig::default();
        assert_eq!(config.api.base_url, defaults.api.base_url);
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.browse.rail_limit, 10);
        assert_eq!(config.browse.home_genres, defaults.browse.home_genres);
        assert!(config.use_fixtures());
        Ok(())
    }

    #[test]
    fn existing_file_is_not_overwritten() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[api]\nkey = \"secret\"\npage_size = 5\n[storage]\ndata_dir = \"/tmp/ludex-test\"\n",
        )?;
        write_default_config(&path)?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.api.key, "secret");
        assert_eq!(config.api.page_size, 5);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/ludex-test"));
        assert_eq!(config.browse.search_debounce_ms, 400);
        assert!(!config.use_fixtures());
        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.api.page_size, 20);
        Ok(())
    }
}
