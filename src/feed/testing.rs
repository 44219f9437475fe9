// SPDX-License-Identifier: MPL-2.0

//! Test doubles for the feed handlers.

use crate::local::LocalStore;
use crate::remote::{
    Comment, NewPost, NotificationRequest, Post, PostEdit, PostId, Profile, RemoteStore, Role,
    StoreError, StoreResult, Subscription, UserId, Verification,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FetchPosts,
    InsertPost,
    UpdatePost,
    DeletePost,
    InsertLike,
    DeleteLike,
    InsertComment,
    Notify,
    Upload,
}

/// `LocalStore` that can be told to reject chosen operations.
pub struct FlakyStore {
    pub inner: LocalStore,
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<Vec<Op>>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: LocalStore::open_in_memory().unwrap(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    fn check(&self, op: Op) -> StoreResult<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Rejected(format!("{op:?} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn fetch_posts(&self) -> StoreResult<Vec<Post>> {
        self.check(Op::FetchPosts)?;
        self.inner.fetch_posts().await
    }

    async fn insert_post(
        &self,
        author: UserId,
        post: NewPost,
        image_url: Option<String>,
    ) -> StoreResult<PostId> {
        self.check(Op::InsertPost)?;
        self.inner.insert_post(author, post, image_url).await
    }

    async fn update_post(&self, id: PostId, owner: UserId, edit: &PostEdit) -> StoreResult<()> {
        self.check(Op::UpdatePost)?;
        self.inner.update_post(id, owner, edit).await
    }

    async fn delete_post(&self, id: PostId, owner: UserId) -> StoreResult<()> {
        self.check(Op::DeletePost)?;
        self.inner.delete_post(id, owner).await
    }

    async fn insert_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<()> {
        self.check(Op::InsertLike)?;
        self.inner.insert_like(post_id, user_id).await
    }

    async fn delete_like(&self, post_id: PostId, user_id: UserId) -> StoreResult<()> {
        self.check(Op::DeleteLike)?;
        self.inner.delete_like(post_id, user_id).await
    }

    async fn insert_comment(
        &self,
        post_id: PostId,
        author: UserId,
        content: &str,
    ) -> StoreResult<Comment> {
        self.check(Op::InsertComment)?;
        self.inner.insert_comment(post_id, author, content).await
    }

    async fn create_notification(&self, request: &NotificationRequest) -> StoreResult<()> {
        self.check(Op::Notify)?;
        self.inner.create_notification(request).await
    }

    async fn upload_image(
        &self,
        uploader: UserId,
        bytes: &[u8],
        extension: &str,
    ) -> StoreResult<String> {
        self.check(Op::Upload)?;
        self.inner.upload_image(uploader, bytes, extension).await
    }

    fn subscribe(&self) -> Subscription {
        self.inner.subscribe()
    }
}

pub fn profile(username: &str, role: Role, verification: Verification) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        username: username.to_string(),
        avatar_url: None,
        role,
        verification,
    }
}

/// Register a profile with the store and return it.
pub fn member(
    store: &FlakyStore,
    username: &str,
    role: Role,
    verification: Verification,
) -> Profile {
    let p = profile(username, role, verification);
    store.inner.profiles().upsert(&p).unwrap();
    p
}

pub fn wisdom(text: &str) -> NewPost {
    NewPost::Wisdom {
        content: text.to_string(),
        link: None,
    }
}
