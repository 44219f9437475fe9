// SPDX-License-Identifier: MPL-2.0

use crate::local::{LocalError, LocalStore, ProfileRows};
use crate::remote::{Comment, Like, NotificationKind, NotificationRequest, PostId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

/// A stored notification, as the notification workflow would read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub actor: UserId,
    pub post_id: PostId,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// Likes, comments, notifications, and uploads
pub struct Engagement<'a> {
    store: &'a LocalStore,
}

impl<'a> Engagement<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    pub fn insert_like(&self, post_id: PostId, user_id: UserId) -> Result<Like, LocalError> {
        let like = Like {
            post_id,
            user_id,
            created_at: Utc::now(),
        };

        self.store.conn().execute(
            "INSERT INTO likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![like.post_id, like.user_id, like.created_at],
        )?;

        Ok(like)
    }

    /// Delete scoped by (post, user). Returns whether a row went away.
    pub fn delete_like(&self, post_id: PostId, user_id: UserId) -> Result<bool, LocalError> {
        let changed = self.store.conn().execute(
            "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        Ok(changed > 0)
    }

    /// Insert a comment and return the canonical row with its author joined.
    pub fn insert_comment(
        &self,
        post_id: PostId,
        author: UserId,
        content: &str,
    ) -> Result<Comment, LocalError> {
        let mut comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id: author,
            content: content.to_string(),
            created_at: Utc::now(),
            author: None,
        };

        self.store.conn().execute(
            r#"
            INSERT INTO comments (id, post_id, user_id, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                comment.id,
                comment.post_id,
                comment.user_id,
                comment.content,
                comment.created_at
            ],
        )?;

        comment.author = ProfileRows::new(self.store).get(author)?;
        Ok(comment)
    }

    pub fn insert_notification(&self, request: &NotificationRequest) -> Result<(), LocalError> {
        self.store.conn().execute(
            r#"
            INSERT INTO notifications (recipient, kind, actor, post_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                request.recipient,
                request.kind,
                request.actor,
                request.post_id,
                Utc::now()
            ],
        )?;
        Ok(())
    }

    /// Notifications for one recipient, newest first
    pub fn notifications_for(
        &self,
        recipient: UserId,
    ) -> Result<Vec<StoredNotification>, LocalError> {
        let conn = self.store.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT recipient, kind, actor, post_id, created_at, is_read
            FROM notifications
            WHERE recipient = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )?;

        let notifications = stmt
            .query_map([recipient], |row| {
                Ok(StoredNotification {
                    recipient: row.get(0)?,
                    kind: row.get(1)?,
                    actor: row.get(2)?,
                    post_id: row.get(3)?,
                    created_at: row.get(4)?,
                    is_read: row.get::<_, i32>(5)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notifications)
    }

    /// Store an uploaded image and return its path key.
    pub fn store_upload(
        &self,
        uploader: UserId,
        bytes: &[u8],
        extension: &str,
    ) -> Result<String, LocalError> {
        let now = Utc::now();
        let path = format!("{}/{}.{}", uploader, now.timestamp_millis(), extension);

        self.store.conn().execute(
            "INSERT INTO uploads (path, uploader, bytes, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![path, uploader, bytes, now],
        )?;

        Ok(path)
    }

    /// Raw bytes of an upload by path key
    pub fn upload(&self, path: &str) -> Result<Vec<u8>, LocalError> {
        self.store
            .conn()
            .query_row("SELECT bytes FROM uploads WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => LocalError::NotFound,
                other => LocalError::Database(other),
            })
    }
}
