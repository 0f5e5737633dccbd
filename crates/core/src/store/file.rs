use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::warn;

use crate::error::FetchError;

use super::{DocumentPath, DocumentStore};

/// Document store persisting one pretty-printed JSON file per document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at `root`; directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        collection
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| {
                path.join(sanitize_component(segment))
            })
    }

    fn document_file(&self, path: &DocumentPath) -> PathBuf {
        self.collection_dir(&path.collection)
            .join(format!("{}.json", sanitize_component(&path.id)))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, FetchError> {
        let file = self.document_file(path);
        match fs::read(&file).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&file, err)),
        }
    }

    async fn set(&self, path: &DocumentPath, value: Value) -> Result<(), FetchError> {
        let file = self.document_file(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| io_error(parent, err))?;
        }
        let serialised = serde_json::to_vec_pretty(&value)?;
        fs::write(&file, serialised)
            .await
            .map_err(|err| io_error(&file, err))
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), FetchError> {
        let file = self.document_file(path);
        match fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&file, err)),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, FetchError> {
        let dir = self.collection_dir(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&dir, err)),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error(&dir, err))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let id = id.to_string();
            match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(value) => documents.push((id, value)),
                    Err(err) => warn!("Failed to parse document {:?}: {err}", path),
                },
                Err(err) => warn!("Failed to read document {:?}: {err}", path),
            }
        }
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> FetchError {
    FetchError::Other(format!("{}: {err}", path.display()))
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '@') {
            result.push(ch);
        } else {
            result.push('_');
        }
    }
    let trimmed = result.trim_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn documents_survive_a_new_store_instance() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = DocumentPath::favorite("user_1", 3498);
        store
            .set(&path, json!({"id": 3498, "name": "Grand Theft Auto V"}))
            .await
            .unwrap();
        assert!(dir.path().join("users/user_1/favorites/3498.json").exists());

        let reopened = JsonFileStore::new(dir.path());
        let listed = reopened.list("users/user_1/favorites").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "3498");
        assert_eq!(listed[0].1["name"], json!("Grand Theft Auto V"));

        reopened.delete(&path).await.unwrap();
        assert_eq!(reopened.get(&path).await.unwrap(), None);
        reopened.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_collection_lists_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.list("games/1/reviews").await.unwrap().is_empty());
    }

    #[test]
    fn sanitize_blocks_path_traversal() {
        assert_eq!(sanitize_component(".."), "_");
        assert_eq!(sanitize_component("a/b c"), "a_b_c");
        assert_eq!(sanitize_component("player@example.com"), "player@example.com");
    }
}
