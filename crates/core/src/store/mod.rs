//! Document storage for profiles, favorites and reviews.

mod file;
mod memory;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::FetchError;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Location of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    /// Slash separated collection path, e.g. `users/abc/favorites`.
    pub collection: String,
    /// Document key within the collection.
    pub id: String,
}

impl DocumentPath {
    /// Build a path from a collection and a key.
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// `users/{uid}`.
    pub fn user(uid: &str) -> Self {
        Self::new(USERS, uid)
    }

    /// `users/{uid}/favorites/{game_id}`.
    pub fn favorite(uid: &str, game_id: i64) -> Self {
        Self::new(favorites_collection(uid), game_id.to_string())
    }

    /// `games/{game_id}/reviews/{uid}`.
    pub fn review(game_id: i64, uid: &str) -> Self {
        Self::new(reviews_collection(game_id), uid)
    }
}

/// Collection holding one profile per user.
pub const USERS: &str = "users";

/// Favorites collection of a user.
pub fn favorites_collection(uid: &str) -> String {
    format!("{USERS}/{uid}/favorites")
}

/// Reviews collection of a game.
pub fn reviews_collection(game_id: i64) -> String {
    format!("games/{game_id}/reviews")
}

/// One-shot document reads and writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, FetchError>;

    /// Create or replace one document.
    async fn set(&self, path: &DocumentPath, value: Value) -> Result<(), FetchError>;

    /// Delete one document; deleting a missing document succeeds.
    async fn delete(&self, path: &DocumentPath) -> Result<(), FetchError>;

    /// Every document of a collection as `(id, value)` pairs, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, FetchError>;
}

/// Read a document and decode it.
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &DocumentPath,
) -> Result<Option<T>, FetchError> {
    match store.get(path).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode a value and write it.
pub async fn set_as<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    path: &DocumentPath,
    value: &T,
) -> Result<(), FetchError> {
    store.set(path, serde_json::to_value(value)?).await
}

/// Decode every document of a collection, skipping malformed entries.
pub async fn list_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
) -> Result<Vec<T>, FetchError> {
    let documents = store.list(collection).await?;
    let mut decoded = Vec::with_capacity(documents.len());
    for (id, value) in documents {
        match serde_json::from_value(value) {
            Ok(item) => decoded.push(item),
            Err(err) => tracing::warn!(collection, id = %id, "skipping malformed document: {err}"),
        }
    }
    Ok(decoded)
}
