//! Per-user favorite games.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tracing::info;

use crate::{
    account::Session,
    error::FetchError,
    models::{FavoriteGame, Game},
    store::{favorites_collection, list_as, set_as, DocumentPath, DocumentStore},
};

type UserLocks = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Favorites of the signed-in user. Every call is a no-op without a user.
///
/// Clones share one lock per user, so toggles through any clone are
/// serialised and never interleave their read and write.
#[derive(Clone)]
pub struct FavoritesService {
    store: Arc<dyn DocumentStore>,
    session: Session,
    locks: UserLocks,
}

impl FavoritesService {
    /// Service over `store` scoped to `session`.
    pub fn new(store: Arc<dyn DocumentStore>, session: Session) -> Self {
        Self {
            store,
            session,
            locks: Arc::default(),
        }
    }

    fn user_lock(&self, uid: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(uid.to_string()).or_default().clone()
    }

    /// Whether `game_id` is in the favorites collection.
    pub async fn is_favorite(&self, game_id: i64) -> Result<bool, FetchError> {
        let Some(uid) = self.session.user_id() else {
            return Ok(false);
        };
        Ok(self
            .store
            .get(&DocumentPath::favorite(&uid, game_id))
            .await?
            .is_some())
    }

    /// Flip membership of `game`; returns the new membership, `None` when signed out.
    pub async fn toggle(&self, game: &Game) -> Result<Option<bool>, FetchError> {
        let Some(uid) = self.session.user_id() else {
            return Ok(None);
        };
        let lock = self.user_lock(&uid);
        let _guard = lock.lock().await;
        let path = DocumentPath::favorite(&uid, game.id);
        if self.store.get(&path).await?.is_some() {
            self.store.delete(&path).await?;
            info!(user = %uid, game_id = game.id, "favorite removed");
            Ok(Some(false))
        } else {
            set_as(self.store.as_ref(), &path, &game.stub()).await?;
            info!(user = %uid, game_id = game.id, "favorite added");
            Ok(Some(true))
        }
    }

    /// Every favorite of the signed-in user, ordered by name.
    pub async fn list(&self) -> Result<Vec<FavoriteGame>, FetchError> {
        let Some(uid) = self.session.user_id() else {
            return Ok(Vec::new());
        };
        let mut favorites: Vec<FavoriteGame> =
            list_as(self.store.as_ref(), &favorites_collection(&uid)).await?;
        favorites.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(favorites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::AuthUser,
        store::{JsonFileStore, MemoryStore},
    };

    fn signed_in(store: Arc<dyn DocumentStore>, uid: &str) -> FavoritesService {
        let session = Session::new();
        session.sign_in(AuthUser {
            id: uid.to_string(),
            email: format!("{uid}@example.com"),
        });
        FavoritesService::new(store, session)
    }

    #[tokio::test]
    async fn toggling_twice_restores_membership() {
        let favorites = signed_in(Arc::new(MemoryStore::new()), "u1");
        let game = Game::new(9767, "Hollow Knight");

        assert!(!favorites.is_favorite(game.id).await.unwrap());
        assert_eq!(favorites.toggle(&game).await.unwrap(), Some(true));
        assert!(favorites.is_favorite(game.id).await.unwrap());
        assert_eq!(favorites.list().await.unwrap(), vec![game.stub()]);

        assert_eq!(favorites.toggle(&game).await.unwrap(), Some(false));
        assert!(!favorites.is_favorite(game.id).await.unwrap());
        assert!(favorites.list().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let favorites = signed_in(Arc::new(JsonFileStore::new(dir.path())), "u1");
        let game = Game::new(3328, "The Witcher 3: Wild Hunt");

        for _ in 0..50 {
            let (first, second) = tokio::join!(
                tokio::spawn({
                    let favorites = favorites.clone();
                    let game = game.clone();
                    async move { favorites.toggle(&game).await }
                }),
                tokio::spawn({
                    let favorites = favorites.clone();
                    let game = game.clone();
                    async move { favorites.toggle(&game).await }
                }),
            );
            let mut outcomes = [
                first.unwrap().unwrap().unwrap(),
                second.unwrap().unwrap().unwrap(),
            ];
            outcomes.sort();
            assert_eq!(outcomes, [false, true]);
            assert!(!favorites.is_favorite(game.id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn favorites_are_scoped_per_user() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let alice = signed_in(store.clone(), "alice");
        let bob = signed_in(store, "bob");
        alice.toggle(&Game::new(1, "Limbo")).await.unwrap();
        assert!(alice.is_favorite(1).await.unwrap());
        assert!(!bob.is_favorite(1).await.unwrap());
    }

    #[tokio::test]
    async fn signed_out_calls_are_no_ops() {
        let store = MemoryStore::new();
        let favorites = FavoritesService::new(Arc::new(store.clone()), Session::new());
        assert_eq!(favorites.toggle(&Game::new(1, "Limbo")).await.unwrap(), None);
        assert!(favorites.list().await.unwrap().is_empty());
        assert!(store.list("users").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_store_surfaces_offline() {
        let store = MemoryStore::new();
        let favorites = signed_in(Arc::new(store.clone()), "u1");
        store.set_offline(true);
        let err = favorites.toggle(&Game::new(1, "Limbo")).await.unwrap_err();
        assert!(matches!(err, FetchError::Offline));
    }
}
