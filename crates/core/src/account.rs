//! Signed-in identity, profiles and profile pictures.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::{
    error::FetchError,
    models::UserProfile,
    store::{get_as, set_as, DocumentPath, DocumentStore},
};

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Stable user id.
    pub id: String,
    /// Email used to sign in.
    pub email: String,
}

/// Shared cell holding the current user, if any.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<RwLock<Option<AuthUser>>>,
}

impl Session {
    /// Session with nobody signed in.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current user.
    pub fn current(&self) -> Option<AuthUser> {
        self.current.read().clone()
    }

    /// Current user id.
    pub fn user_id(&self) -> Option<String> {
        self.current.read().as_ref().map(|user| user.id.clone())
    }

    /// Replace the current user.
    pub fn sign_in(&self, user: AuthUser) {
        *self.current.write() = Some(user);
    }

    /// Forget the current user.
    pub fn sign_out(&self) {
        *self.current.write() = None;
    }
}

/// Stable user id derived from an email address.
///
/// The address is trimmed and lowercased. Bytes outside `[a-z0-9.@-]` become
/// `_` plus two hex digits, so distinct addresses never share an id. Dots at
/// either end are escaped as well because the file store trims them.
pub fn user_id_for(email: &str) -> String {
    let normalised = email.trim().to_lowercase();
    let last = normalised.len().saturating_sub(1);
    let mut id = String::with_capacity(normalised.len());
    for (idx, byte) in normalised.bytes().enumerate() {
        let keep = byte.is_ascii_lowercase()
            || byte.is_ascii_digit()
            || matches!(byte, b'-' | b'@')
            || (byte == b'.' && idx != 0 && idx != last);
        if keep {
            id.push(char::from(byte));
        } else {
            id.push_str(&format!("_{byte:02x}"));
        }
    }
    id
}

/// Hosts a local picture and returns its URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Upload the file at `path`.
    async fn upload(&self, path: &Path) -> Result<String, FetchError>;
}

/// Uploader that copies files into a local media directory.
#[derive(Debug, Clone)]
pub struct LocalMediaUploader {
    root: PathBuf,
}

impl LocalMediaUploader {
    /// Uploader writing under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MediaUploader for LocalMediaUploader {
    async fn upload(&self, path: &Path) -> Result<String, FetchError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FetchError::other(format!("not a file: {}", path.display())))?;
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let target = self.root.join(format!("{stamp}_{name}"));
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| FetchError::other(format!("{}: {err}", self.root.display())))?;
        tokio::fs::copy(path, &target)
            .await
            .map_err(|err| FetchError::other(format!("{}: {err}", path.display())))?;
        Ok(format!("file://{}", target.display()))
    }
}

/// Sign-up, sign-in and profile edits.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    uploader: Arc<dyn MediaUploader>,
    session: Session,
}

impl AccountService {
    /// Service over `store`, uploading pictures through `uploader`.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        uploader: Arc<dyn MediaUploader>,
        session: Session,
    ) -> Self {
        Self {
            store,
            uploader,
            session,
        }
    }

    /// The shared session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Create a profile and sign in.
    pub async fn sign_up(&self, email: &str, username: &str) -> Result<UserProfile, FetchError> {
        let email = email.trim();
        let username = username.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(FetchError::other("Please enter a valid email address."));
        }
        if username.is_empty() {
            return Err(FetchError::other("Please choose a username."));
        }

        let id = user_id_for(email);
        let path = DocumentPath::user(&id);
        if self.store.get(&path).await?.is_some() {
            return Err(FetchError::other("An account with this email already exists."));
        }

        let profile = UserProfile {
            id: id.clone(),
            username: username.to_string(),
            profile_picture: None,
        };
        set_as(self.store.as_ref(), &path, &profile).await?;
        self.session.sign_in(AuthUser {
            id,
            email: email.to_string(),
        });
        info!(user = %profile.id, "account created");
        Ok(profile)
    }

    /// Sign in to an existing profile.
    pub async fn sign_in(&self, email: &str) -> Result<UserProfile, FetchError> {
        let email = email.trim();
        let id = user_id_for(email);
        let profile: UserProfile = get_as(self.store.as_ref(), &DocumentPath::user(&id))
            .await?
            .ok_or_else(|| FetchError::other("No account found for this email."))?;
        self.session.sign_in(AuthUser {
            id,
            email: email.to_string(),
        });
        info!(user = %profile.id, "signed in");
        Ok(profile)
    }

    /// Sign out.
    pub fn sign_out(&self) {
        if let Some(user) = self.session.current() {
            info!(user = %user.id, "signed out");
        }
        self.session.sign_out();
    }

    /// Profile of the signed-in user.
    pub async fn current_profile(&self) -> Result<Option<UserProfile>, FetchError> {
        let Some(uid) = self.session.user_id() else {
            return Ok(None);
        };
        get_as(self.store.as_ref(), &DocumentPath::user(&uid)).await
    }

    /// Change the username of the signed-in user.
    pub async fn update_username(&self, username: &str) -> Result<Option<UserProfile>, FetchError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(FetchError::other("Please choose a username."));
        }
        self.update_profile(|profile| profile.username = username.to_string())
            .await
    }

    /// Upload a picture and attach it to the signed-in user's profile.
    pub async fn update_picture(&self, path: &Path) -> Result<Option<UserProfile>, FetchError> {
        if self.session.user_id().is_none() {
            return Ok(None);
        }
        let url = self.uploader.upload(path).await?;
        self.update_profile(|profile| profile.profile_picture = Some(url))
            .await
    }

    async fn update_profile(
        &self,
        edit: impl FnOnce(&mut UserProfile),
    ) -> Result<Option<UserProfile>, FetchError> {
        let Some(mut profile) = self.current_profile().await? else {
            return Ok(None);
        };
        edit(&mut profile);
        set_as(
            self.store.as_ref(),
            &DocumentPath::user(&profile.id),
            &profile,
        )
        .await?;
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::store::MemoryStore;

    fn service(media_root: &Path) -> AccountService {
        AccountService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(LocalMediaUploader::new(media_root)),
            Session::new(),
        )
    }

    #[test]
    fn user_ids_are_normalised() {
        assert_eq!(user_id_for("  Player One@Example.com "), "player_20one@example.com");
        assert_eq!(user_id_for("p1@example.com"), "p1@example.com");
        assert_eq!(user_id_for("Zoë@example.com"), "zo_c3_ab@example.com");
    }

    #[test]
    fn user_ids_never_collide() {
        let ids: Vec<String> = [
            "a+b@example.com",
            "a_b@example.com",
            "a b@example.com",
            "a_2bb@example.com",
            ".a@example.com",
            "a@example.com",
        ]
        .into_iter()
        .map(user_id_for)
        .collect();
        let unique: std::collections::HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len(), "{ids:?}");
    }

    #[tokio::test]
    async fn similar_addresses_get_separate_accounts() {
        let dir = tempdir().unwrap();
        let accounts = service(dir.path());
        accounts.sign_up("a+b@example.com", "plus").await.unwrap();
        accounts.sign_up("a_b@example.com", "underscore").await.unwrap();

        assert_eq!(accounts.sign_in("a+b@example.com").await.unwrap().username, "plus");
        assert_eq!(
            accounts.sign_in("a_b@example.com").await.unwrap().username,
            "underscore"
        );
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let dir = tempdir().unwrap();
        let accounts = service(dir.path());
        let profile = accounts.sign_up("p1@example.com", "player").await.unwrap();
        assert_eq!(profile.username, "player");
        assert_eq!(accounts.session().user_id().as_deref(), Some("p1@example.com"));

        let duplicate = accounts.sign_up("P1@example.com", "again").await;
        assert!(duplicate.is_err());

        accounts.sign_out();
        assert!(accounts.current_profile().await.unwrap().is_none());
        let again = accounts.sign_in("p1@example.com").await.unwrap();
        assert_eq!(again, profile);
        assert!(accounts.sign_in("nobody@example.com").await.is_err());
    }

    #[tokio::test]
    async fn profile_edits_require_a_user() {
        let dir = tempdir().unwrap();
        let accounts = service(dir.path());
        assert_eq!(accounts.update_username("ghost").await.unwrap(), None);

        accounts.sign_up("p2@example.com", "before").await.unwrap();
        let updated = accounts.update_username("after").await.unwrap().unwrap();
        assert_eq!(updated.username, "after");
        assert_eq!(
            accounts.current_profile().await.unwrap().unwrap().username,
            "after"
        );
    }

    #[tokio::test]
    async fn picture_upload_is_stored_on_the_profile() {
        let dir = tempdir().unwrap();
        let picture = dir.path().join("me.png");
        std::fs::write(&picture, b"png").unwrap();
        let accounts = service(&dir.path().join("media"));
        accounts.sign_up("p3@example.com", "pic").await.unwrap();

        let profile = accounts.update_picture(&picture).await.unwrap().unwrap();
        let url = profile.profile_picture.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("_me.png"));
    }
}
