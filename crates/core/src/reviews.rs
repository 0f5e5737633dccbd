//! Game reviews: raw text is stored, moderated copies are read back.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::{
    account::Session,
    error::FetchError,
    moderation::ContentModerator,
    models::{Review, UserProfile, RATING_LABELS},
    store::{get_as, list_as, reviews_collection, set_as, DocumentPath, DocumentStore},
};

/// Reads and writes reviews of games.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn DocumentStore>,
    session: Session,
    moderator: ContentModerator,
}

impl ReviewService {
    /// Service over `store`, filtering reads through `moderator`.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: Session,
        moderator: ContentModerator,
    ) -> Self {
        Self {
            store,
            session,
            moderator,
        }
    }

    /// Write the signed-in user's review of `game_id`, replacing any earlier one.
    ///
    /// Returns `None` when nobody is signed in.
    pub async fn submit(
        &self,
        game_id: i64,
        body: &str,
        rating: &str,
    ) -> Result<Option<Review>, FetchError> {
        let Some(uid) = self.session.user_id() else {
            return Ok(None);
        };
        let body = body.trim();
        if body.is_empty() {
            return Err(FetchError::other("Review text cannot be empty."));
        }
        if !RATING_LABELS.contains(&rating) {
            return Err(FetchError::other(format!("Unknown rating \"{rating}\".")));
        }

        let profile: Option<UserProfile> =
            get_as(self.store.as_ref(), &DocumentPath::user(&uid)).await?;
        let review = Review {
            reviewer_id: uid.clone(),
            reviewer_name: profile
                .as_ref()
                .map(|profile| profile.username.clone())
                .unwrap_or_else(|| uid.clone()),
            body: body.to_string(),
            rating: rating.to_string(),
            profile_picture: profile.and_then(|profile| profile.profile_picture),
            updated_at: Utc::now(),
        };
        set_as(
            self.store.as_ref(),
            &DocumentPath::review(game_id, &uid),
            &review,
        )
        .await?;
        info!(user = %uid, game_id, "review saved");
        Ok(Some(review))
    }

    /// Reviews of `game_id` as shown to readers, newest first.
    pub async fn reviews_for(&self, game_id: i64) -> Result<Vec<Review>, FetchError> {
        let mut reviews: Vec<Review> =
            list_as(self.store.as_ref(), &reviews_collection(game_id)).await?;
        reviews.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(reviews
            .iter()
            .map(|review| self.moderator.moderate(review))
            .collect())
    }

    /// The signed-in user's own stored review of `game_id`, unmoderated.
    pub async fn own_review(&self, game_id: i64) -> Result<Option<Review>, FetchError> {
        let Some(uid) = self.session.user_id() else {
            return Ok(None);
        };
        get_as(self.store.as_ref(), &DocumentPath::review(game_id, &uid)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::AuthUser,
        moderation::REDACTED_PLACEHOLDER,
        store::MemoryStore,
    };

    async fn service_for(store: &MemoryStore, uid: &str) -> ReviewService {
        store
            .set(
                &DocumentPath::user(uid),
                serde_json::json!({"id": uid, "username": format!("{uid}-name")}),
            )
            .await
            .unwrap();
        let session = Session::new();
        session.sign_in(AuthUser {
            id: uid.to_string(),
            email: format!("{uid}@example.com"),
        });
        ReviewService::new(Arc::new(store.clone()), session, ContentModerator::default())
    }

    #[tokio::test]
    async fn one_review_per_user_last_write_wins() {
        let store = MemoryStore::new();
        let reviews = service_for(&store, "u1").await;
        reviews.submit(28, "Slow start", "Meh").await.unwrap();
        let latest = reviews
            .submit(28, "Grew on me", "Recommended")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.reviewer_name, "u1-name");

        let shown = reviews.reviews_for(28).await.unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].body, "Grew on me");
        assert_eq!(shown[0].rating, "Recommended");
    }

    #[tokio::test]
    async fn flagged_reviews_are_redacted_on_read_only() {
        let store = MemoryStore::new();
        let reviews = service_for(&store, "u1").await;
        reviews
            .submit(28, "This GaMe is FUCKING great", "Exceptional")
            .await
            .unwrap();

        let shown = reviews.reviews_for(28).await.unwrap();
        assert_eq!(shown[0].body, REDACTED_PLACEHOLDER);

        let stored = reviews.own_review(28).await.unwrap().unwrap();
        assert_eq!(stored.body, "This GaMe is FUCKING great");
    }

    #[tokio::test]
    async fn rejects_empty_bodies_and_unknown_ratings() {
        let store = MemoryStore::new();
        let reviews = service_for(&store, "u1").await;
        assert!(reviews.submit(28, "   ", "Meh").await.is_err());
        assert!(reviews.submit(28, "Fine", "Amazing").await.is_err());
        assert!(reviews.reviews_for(28).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn signed_out_submit_is_a_no_op() {
        let store = MemoryStore::new();
        let reviews = ReviewService::new(
            Arc::new(store.clone()),
            Session::new(),
            ContentModerator::default(),
        );
        assert_eq!(reviews.submit(28, "Great", "Exceptional").await.unwrap(), None);
        assert!(reviews.reviews_for(28).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reviews_from_several_users_are_listed() {
        let store = MemoryStore::new();
        service_for(&store, "a")
            .await
            .submit(1, "Lovely art", "Exceptional")
            .await
            .unwrap();
        service_for(&store, "b")
            .await
            .submit(1, "Too short", "Skip")
            .await
            .unwrap();
        let shown = service_for(&store, "c").await.reviews_for(1).await.unwrap();
        let mut authors: Vec<_> = shown.iter().map(|review| review.reviewer_id.as_str()).collect();
        authors.sort_unstable();
        assert_eq!(authors, vec!["a", "b"]);
    }
}
