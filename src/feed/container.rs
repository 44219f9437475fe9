// SPDX-License-Identifier: MPL-2.0

use crate::remote::{Comment, CommentId, Like, Post, PostId, PostPatch, PostRow, UserId};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// The posts currently visible, in no particular order.
///
/// Every mutation is synchronous and visible to the next read. Absent ids
/// are a no-op, never an error. `revision` bumps on every effective change
/// and every container, clones included, gets its own instance id, so a
/// projection can tell when to recompute.
#[derive(Debug)]
pub struct FeedState {
    posts: Vec<Post>,
    instance: u64,
    revision: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::with_posts(Vec::new())
    }
}

impl Clone for FeedState {
    fn clone(&self) -> Self {
        Self::with_posts(self.posts.clone())
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            revision: 0,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Equal stamps mean equal posts, across instances too.
    pub(crate) fn stamp(&self) -> (u64, u64) {
        (self.instance, self.revision)
    }

    fn get_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == id)
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Full refresh from the store.
    pub fn replace_all(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.bump();
    }

    /// Insert at the front if unknown, else merge the row's fields into the
    /// existing post. Nested likes, comments, and author are kept.
    pub fn upsert(&mut self, row: PostRow) {
        match self.get_mut(row.id) {
            Some(existing) => existing.apply_patch(PostPatch::from(row)),
            None => self.posts.insert(0, Post::from_row(row)),
        }
        self.bump();
    }

    /// Shallow-merge into the matching post. Returns whether it was found.
    pub fn patch(&mut self, id: PostId, patch: PostPatch) -> bool {
        let Some(post) = self.get_mut(id) else {
            return false;
        };
        post.apply_patch(patch);
        self.bump();
        true
    }

    pub fn remove(&mut self, id: PostId) -> Option<Post> {
        let index = self.posts.iter().position(|p| p.id == id)?;
        let removed = self.posts.remove(index);
        self.bump();
        Some(removed)
    }

    pub fn push_like(&mut self, like: Like) -> bool {
        let Some(post) = self.get_mut(like.post_id) else {
            return false;
        };
        post.likes.push(like);
        self.bump();
        true
    }

    /// Drop `user_id`'s like from the post, returning it.
    pub fn remove_like(&mut self, post_id: PostId, user_id: UserId) -> Option<Like> {
        let post = self.get_mut(post_id)?;
        let index = post.likes.iter().position(|l| l.user_id == user_id)?;
        let removed = post.likes.remove(index);
        self.bump();
        Some(removed)
    }

    pub fn push_comment(&mut self, comment: Comment) -> bool {
        let Some(post) = self.get_mut(comment.post_id) else {
            return false;
        };
        post.comments.push(comment);
        self.bump();
        true
    }

    /// Remove exactly the comment with `comment_id`.
    pub fn remove_comment(&mut self, post_id: PostId, comment_id: CommentId) -> Option<Comment> {
        let post = self.get_mut(post_id)?;
        let index = post.comments.iter().position(|c| c.id == comment_id)?;
        let removed = post.comments.remove(index);
        self.bump();
        Some(removed)
    }
}
