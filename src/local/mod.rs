// SPDX-License-Identifier: MPL-2.0

//! SQLite implementation of the remote store.
//!
//! Backs the headless client and the test suite. Every mutation is pushed
//! to subscribers the way a hosted store would push row changes.

mod db;
mod engagement;
mod posts;
mod profiles;
mod schema;

pub use db::LocalStore;
pub use engagement::{Engagement, StoredNotification};
pub use posts::PostRows;
pub use profiles::ProfileRows;

use crate::remote::{
    ChangeKind, Comment, NewPost, NotificationRequest, Post, PostEdit, PostId, RemoteStore,
    StoreError, StoreResult, Subscription, Table, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::ErrorCode;
use thiserror::Error;
use uuid::Uuid;

/// URL scheme for uploads served from the local store.
pub const UPLOAD_URL_PREFIX: &str = "local://uploads/";

#[derive(Error, Debug)]
pub enum LocalError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found")]
    NotFound,
    #[error("database path error: {0}")]
    Path(String),
}

impl From<LocalError> for StoreError {
    fn from(e: LocalError) -> Self {
        match e {
            LocalError::Database(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(msg.unwrap_or_else(|| err.to_string()))
            }
            LocalError::NotFound => StoreError::NotFound,
            other => StoreError::Rejected(other.to_string()),
        }
    }
}

impl LocalStore {
    pub fn profiles(&self) -> ProfileRows<'_> {
        ProfileRows::new(self)
    }

    pub fn posts(&self) -> PostRows<'_> {
        PostRows::new(self)
    }

    pub fn engagement(&self) -> Engagement<'_> {
        Engagement::new(self)
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn fetch_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.posts().fetch_all()?)
    }

    async fn insert_post(
        &self,
        author: UserId,
        post: NewPost,
        image_url: Option<String>,
    ) -> StoreResult<PostId> {
        let row = post.into_row(Uuid::new_v4(), author, Utc::now(), image_url);
        self.posts().insert(&row)?;

        let payload = serde_json::to_value(&row).map_err(LocalError::from)?;
        self.publish(Table::Posts, ChangeKind::Insert, payload);
        tracing::debug!(post_id = %row.id, kind = %row.kind, "post inserted");
        Ok(row.id)
    }

    async fn update_post(&self, id: PostId, owner: UserId, edit: &PostEdit) -> StoreResult<()> {
        let row = self.posts().update(id, owner, edit)?.ok_or(StoreError::NotFound)?;

        let payload = serde_json::to_value(&row).map_err(LocalError::from)?;
        self.publish(Table::Posts, ChangeKind::Update, payload);
        Ok(())
    }

    async fn delete_post(&self, id: PostId, owner: UserId) -> StoreResult<()> {
        if !self.posts().delete(id, owner)? {
            return Err(StoreError::NotFound);
        }

        self.publish(
            Table::Posts,
            ChangeKind::Delete,
            serde_json::json!({ "id": id }),
        );
        Ok(())
    }

    async fn insert_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<()> {
        let like = self.engagement().insert_like(post_id, user_id)?;

        let payload = serde_json::to_value(&like).map_err(LocalError::from)?;
        self.publish(Table::Likes, ChangeKind::Insert, payload);
        Ok(())
    }

    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<()> {
        if !self.engagement().delete_like(post_id, user_id)? {
            return Err(StoreError::NotFound);
        }

        self.publish(
            Table::Likes,
            ChangeKind::Delete,
            serde_json::json!({ "post_id": post_id, "user_id": user_id }),
        );
        Ok(())
    }

    async fn insert_comment(
        &self,
        post_id: PostId,
        author: UserId,
        content: &str,
    ) -> StoreResult<Comment> {
        let comment = self.engagement().insert_comment(post_id, author, content)?;

        let bare = Comment {
            author: None,
            ..comment.clone()
        };
        let payload = serde_json::to_value(&bare).map_err(LocalError::from)?;
        self.publish(Table::Comments, ChangeKind::Insert, payload);
        Ok(comment)
    }

    async fn create_notification(&self, request: &NotificationRequest) -> StoreResult<()> {
        Ok(self.engagement().insert_notification(request)?)
    }

    async fn upload_image(
        &self,
        uploader: UserId,
        bytes: &[u8],
        extension: &str,
    ) -> StoreResult<String> {
        let path = self.engagement().store_upload(uploader, bytes, extension)?;
        Ok(format!("{UPLOAD_URL_PREFIX}{path}"))
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events().subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{
        Category, Delivery, NotificationKind, PostKind, Profile, Role, Verification,
    };

    fn profile(username: &str, role: Role) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            username: username.to_string(),
            avatar_url: None,
            role,
            verification: Verification::Verified,
        }
    }

    fn wisdom(text: &str) -> NewPost {
        NewPost::Wisdom {
            content: text.to_string(),
            link: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_joins_author_likes_and_comments() {
        let store = LocalStore::open_in_memory().unwrap();
        let ana = profile("ana", Role::Student);
        let ben = profile("ben", Role::Donor);
        store.profiles().upsert(&ana).unwrap();
        store.profiles().upsert(&ben).unwrap();

        let id = store.insert_post(ana.id, wisdom("be kind"), None).await.unwrap();
        store.insert_like(id, ben.id).await.unwrap();
        store.insert_comment(id, ben.id, "agreed").await.unwrap();

        let posts = store.fetch_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.author_username(), Some("ana"));
        assert!(post.is_liked_by(ben.id));
        assert_eq!(post.comments[0].content, "agreed");
        assert_eq!(
            post.comments[0].author.as_ref().map(|a| a.username.as_str()),
            Some("ben")
        );
    }

    #[tokio::test]
    async fn test_fetch_orders_newest_first() {
        let store = LocalStore::open_in_memory().unwrap();
        let ana = profile("ana", Role::Student);
        let first = store.insert_post(ana.id, wisdom("one"), None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.insert_post(ana.id, wisdom("two"), None).await.unwrap();

        let ids: Vec<_> = store.fetch_posts().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_duplicate_like_is_a_conflict() {
        let store = LocalStore::open_in_memory().unwrap();
        let ana = profile("ana", Role::Student);
        let id = store.insert_post(ana.id, wisdom("x"), None).await.unwrap();

        store.insert_like(id, ana.id).await.unwrap();
        let err = store.insert_like(id, ana.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_scoped_to_owner() {
        let store = LocalStore::open_in_memory().unwrap();
        let ana = profile("ana", Role::Student);
        let ben = profile("ben", Role::Donor);
        let id = store.insert_post(ana.id, wisdom("mine"), None).await.unwrap();
        let edit = PostEdit {
            content: "hijacked".into(),
            link: None,
        };

        assert_eq!(
            store.update_post(id, ben.id, &edit).await,
            Err(StoreError::NotFound)
        );
        assert_eq!(store.delete_post(id, ben.id).await, Err(StoreError::NotFound));

        store.update_post(id, ana.id, &edit).await.unwrap();
        assert_eq!(
            store.posts().get(id).unwrap().unwrap().content.as_deref(),
            Some("hijacked")
        );
        store.delete_post(id, ana.id).await.unwrap();
        assert!(store.fetch_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_are_pushed_to_subscribers() {
        let store = LocalStore::open_in_memory().unwrap();
        let ana = profile("ana", Role::Donor);
        let mut sub = store.subscribe();

        let new = NewPost::Donation {
            title: "Desk lamp".into(),
            category: Category::Furniture,
            contact: "ana@example.com".into(),
            details: None,
        };
        let id = store.insert_post(ana.id, new, None).await.unwrap();
        store.insert_like(id, ana.id).await.unwrap();

        let Some(Delivery::Event(event)) = sub.try_recv() else {
            panic!("expected post insert event");
        };
        assert_eq!((event.table, event.kind), (Table::Posts, ChangeKind::Insert));
        assert_eq!(event.row["kind"], PostKind::Donation.as_str());

        let Some(Delivery::Event(event)) = sub.try_recv() else {
            panic!("expected like insert event");
        };
        assert_eq!(event.table, Table::Likes);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_subscription_count_tracks_drops() {
        let store = LocalStore::open_in_memory().unwrap();
        assert_eq!(store.live_subscriptions(), 0);
        let sub = store.subscribe();
        assert_eq!(store.live_subscriptions(), 1);
        drop(sub);
        assert_eq!(store.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_upload_path_is_keyed_by_uploader() {
        let store = LocalStore::open_in_memory().unwrap();
        let ana = profile("ana", Role::Donor);
        let url = store.upload_image(ana.id, b"\x89PNG", "png").await.unwrap();

        let path = url.strip_prefix(UPLOAD_URL_PREFIX).unwrap();
        assert!(path.starts_with(&format!("{}/", ana.id)));
        assert!(path.ends_with(".png"));
        assert_eq!(store.engagement().upload(path).unwrap(), b"\x89PNG".to_vec());
    }

    #[tokio::test]
    async fn test_notifications_are_recorded() {
        let store = LocalStore::open_in_memory().unwrap();
        let ana = profile("ana", Role::Donor);
        let ben = profile("ben", Role::Student);
        let id = store.insert_post(ana.id, wisdom("x"), None).await.unwrap();

        store
            .create_notification(&NotificationRequest {
                recipient: ana.id,
                kind: NotificationKind::Like,
                actor: ben.id,
                post_id: id,
            })
            .await
            .unwrap();

        let stored = store.engagement().notifications_for(ana.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, NotificationKind::Like);
        assert!(!stored[0].is_read);
    }
}
