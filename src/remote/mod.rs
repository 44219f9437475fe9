// SPDX-License-Identifier: MPL-2.0

//! Data-access boundary to the remote relational store.
//!
//! The feed only ever talks to the store through [`RemoteStore`]: one
//! query, the scoped mutations, a fire-and-forget notification call, image
//! upload, and a single multiplexed change channel.

pub mod links;
mod types;

pub use types::{
    Category, Comment, CommentId, Like, LinkPreview, NewPost, NotificationKind,
    NotificationRequest, Post, PostEdit, PostId, PostKind, PostPatch, PostRow, Profile, Role,
    UnknownVariant, UserId, Verification,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store rejected the operation and said why.
    #[error("{0}")]
    Rejected(String),
    #[error("no matching row")]
    NotFound,
    #[error("duplicate row: {0}")]
    Conflict(String),
    #[error("store unavailable")]
    Unavailable,
}

impl StoreError {
    /// The store's own message, when it supplied a usable one.
    pub fn message(&self) -> Option<&str> {
        match self {
            StoreError::Rejected(msg) | StoreError::Conflict(msg) if !msg.trim().is_empty() => {
                Some(msg.as_str())
            }
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Posts,
    Likes,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change pushed by the store. `row` is the new row for
/// inserts and updates and the old row (at least its key) for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row: serde_json::Value,
}

/// What a subscriber sees when it polls the change channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(ChangeEvent),
    /// The receiver fell behind and `n` events were dropped.
    Lagged(u64),
}

/// Live handle on the store's change channel. Dropping it releases the
/// channel.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next delivery. `None` once the store has shut down.
    pub async fn recv(&mut self) -> Option<Delivery> {
        match self.rx.recv().await {
            Ok(event) => Some(Delivery::Event(event)),
            Err(broadcast::error::RecvError::Lagged(n)) => Some(Delivery::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Non-blocking poll, used by tests and by callers that drain between
    /// user actions.
    pub fn try_recv(&mut self) -> Option<Delivery> {
        match self.rx.try_recv() {
            Ok(event) => Some(Delivery::Event(event)),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Some(Delivery::Lagged(n)),
            Err(_) => None,
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All posts with author profile, likes, and comments (with comment
    /// author), newest first.
    async fn fetch_posts(&self) -> StoreResult<Vec<Post>>;

    async fn insert_post(
        &self,
        author: UserId,
        post: NewPost,
        image_url: Option<String>,
    ) -> StoreResult<PostId>;

    /// Update scoped by (id, owner).
    async fn update_post(&self, id: PostId, owner: UserId, edit: &PostEdit) -> StoreResult<()>;

    /// Delete scoped by (id, owner).
    async fn delete_post(&self, id: PostId, owner: UserId) -> StoreResult<()>;

    async fn insert_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<()>;

    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<()>;

    async fn insert_comment(
        &self,
        post_id: PostId,
        author: UserId,
        content: &str,
    ) -> StoreResult<Comment>;

    async fn create_notification(&self, request: &NotificationRequest) -> StoreResult<()>;

    /// Store an image under `{uploader}/{timestamp}.{extension}` and return
    /// its public reference.
    async fn upload_image(
        &self,
        uploader: UserId,
        bytes: &[u8],
        extension: &str,
    ) -> StoreResult<String>;

    fn subscribe(&self) -> Subscription;
}
