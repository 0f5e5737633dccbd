use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::FetchError;

use super::{DocumentPath, DocumentStore};

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// Thread-safe in-memory document store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing the backend; every call fails with [`FetchError::Offline`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), FetchError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(FetchError::Offline)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, FetchError> {
        self.ensure_online()?;
        let collections = self.collections.read();
        Ok(collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .cloned())
    }

    async fn set(&self, path: &DocumentPath, value: Value) -> Result<(), FetchError> {
        self.ensure_online()?;
        self.collections
            .write()
            .entry(path.collection.clone())
            .or_default()
            .insert(path.id.clone(), value);
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), FetchError> {
        self.ensure_online()?;
        let mut collections = self.collections.write();
        if let Some(docs) = collections.get_mut(&path.collection) {
            docs.remove(&path.id);
            if docs.is_empty() {
                collections.remove(&path.collection);
            }
        }
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, FetchError> {
        self.ensure_online()?;
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, value)| (id.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn set_get_list_delete() {
        let store = MemoryStore::new();
        let path = DocumentPath::new("games/1/reviews", "u1");
        store.set(&path, json!({"body": "hi"})).await.unwrap();
        store
            .set(&DocumentPath::new("games/1/reviews", "u0"), json!({"body": "yo"}))
            .await
            .unwrap();

        assert_eq!(store.get(&path).await.unwrap(), Some(json!({"body": "hi"})));
        let ids: Vec<_> = store
            .list("games/1/reviews")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["u0", "u1"]);

        store.delete(&path).await.unwrap();
        store.delete(&path).await.unwrap();
        assert_eq!(store.get(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn offline_store_rejects_calls() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let err = store.list("users").await.unwrap_err();
        assert!(matches!(err, FetchError::Offline));
        store.set_offline(false);
        assert!(store.list("users").await.unwrap().is_empty());
    }
}
