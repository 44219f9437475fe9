// SPDX-License-Identifier: MPL-2.0

//! Like, comment, edit, and delete.

use crate::feed::{CapabilityError, Compensation, Feed, FeedError, ValidationError};
use crate::remote::links::{LinkPreviewResolver, extract_first_url};
use crate::remote::{
    Comment, Like, LinkPreview, NotificationKind, NotificationRequest, PostEdit, PostId, PostKind,
    PostPatch,
};
use chrono::Utc;
use uuid::Uuid;

/// An open edit of one of the viewer's posts. Saving consumes it, which is
/// what leaving edit mode means.
#[derive(Debug, Clone, PartialEq)]
pub struct PostEditor {
    post_id: PostId,
    kind: PostKind,
    draft: String,
    preview: Option<LinkPreview>,
}

impl PostEditor {
    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn preview(&self) -> Option<&LinkPreview> {
        self.preview.as_ref()
    }

    /// Replace the draft text. A preview whose URL is no longer the first
    /// link in the text is dropped.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        let first = extract_first_url(&self.draft);
        if self.preview.as_ref().map(|p| p.url.as_str()) != first {
            self.preview = None;
        }
    }

    /// Resolve the preview for the draft's first link now.
    pub async fn resolve_preview(&mut self, resolver: &dyn LinkPreviewResolver) {
        self.preview = match extract_first_url(&self.draft) {
            Some(url) => resolver.resolve(url).await,
            None => None,
        };
    }

    fn into_edit(self) -> PostEdit {
        let content = self.draft.trim().to_string();
        let first = extract_first_url(&content);
        let link = self.preview.filter(|p| Some(p.url.as_str()) == first);
        PostEdit { content, link }
    }
}

impl Feed {
    /// Like the post, or unlike it if the viewer already does. Returns
    /// whether the viewer likes it afterwards.
    pub async fn toggle_like(&mut self, post_id: PostId) -> Result<bool, FeedError> {
        let user_id = self.viewer.require_user()?;
        let post = self
            .state
            .get(post_id)
            .ok_or(ValidationError::UnknownPost)?;
        let author = post.user_id;
        let was_liked = post.is_liked_by(user_id);

        if was_liked {
            self.state.remove_like(post_id, user_id);
        } else {
            self.state.push_like(Like {
                post_id,
                user_id,
                created_at: Utc::now(),
            });
        }
        tracing::debug!(%post_id, liked = !was_liked, "like applied locally");

        let outcome = if was_liked {
            self.store.delete_like(post_id, user_id).await
        } else {
            self.store.insert_like(post_id, user_id).await
        };
        self.commit_or_compensate(outcome, Compensation::Refetch).await?;

        if !was_liked && author != user_id {
            self.notify(NotificationRequest {
                recipient: author,
                kind: NotificationKind::Like,
                actor: user_id,
                post_id,
            })
            .await;
        }

        Ok(!was_liked)
    }

    /// Post the text in `input` as a comment. The input is cleared as soon
    /// as it validates and is not restored if the store rejects it.
    pub async fn add_comment(
        &mut self,
        post_id: PostId,
        input: &mut String,
    ) -> Result<Comment, FeedError> {
        let user_id = self.viewer.require_user()?;
        let text = input.trim().to_string();
        if text.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }
        let author = self
            .state
            .get(post_id)
            .ok_or(ValidationError::UnknownPost)?
            .user_id;

        let synthesized = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            content: text.clone(),
            created_at: Utc::now(),
            author: self.viewer.profile().cloned(),
        };
        let temp_id = synthesized.id;
        self.state.push_comment(synthesized);
        input.clear();
        tracing::debug!(%post_id, %temp_id, "comment applied locally");

        let outcome = self.store.insert_comment(post_id, user_id, &text).await;
        let comment = self
            .commit_or_compensate(
                outcome,
                Compensation::DropComment {
                    post_id,
                    comment_id: temp_id,
                },
            )
            .await?;

        if author != user_id {
            self.notify(NotificationRequest {
                recipient: author,
                kind: NotificationKind::Comment,
                actor: user_id,
                post_id,
            })
            .await;
        }

        // Swap the synthesized comment for the canonical row.
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, %post_id, "could not reconcile new comment");
        }

        Ok(comment)
    }

    /// Delete one of the viewer's posts.
    pub async fn delete_post(&mut self, post_id: PostId) -> Result<(), FeedError> {
        let user_id = self.viewer.require_user()?;
        let post = self
            .state
            .get(post_id)
            .ok_or(ValidationError::UnknownPost)?;
        if post.user_id != user_id {
            return Err(CapabilityError::NotOwner.into());
        }

        self.state.remove(post_id);
        tracing::debug!(%post_id, "post removed locally");

        let outcome = self.store.delete_post(post_id, user_id).await;
        self.commit_or_compensate(outcome, Compensation::Refetch).await
    }

    /// Open an edit of one of the viewer's posts.
    pub fn begin_edit(&self, post_id: PostId) -> Result<PostEditor, FeedError> {
        let user_id = self.viewer.require_user()?;
        let post = self
            .state
            .get(post_id)
            .ok_or(ValidationError::UnknownPost)?;
        if post.user_id != user_id {
            return Err(CapabilityError::NotOwner.into());
        }

        Ok(PostEditor {
            post_id,
            kind: post.kind,
            draft: post.content.clone().unwrap_or_default(),
            preview: post.link.clone(),
        })
    }

    /// Save an edit. Ownership is enforced by the store's (id, owner)
    /// predicate.
    pub async fn save_edit(&mut self, editor: PostEditor) -> Result<(), FeedError> {
        let user_id = self.viewer.require_user()?;
        let post_id = editor.post_id;
        if editor.kind == PostKind::Wisdom && editor.draft.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let edit = editor.into_edit();

        self.state.patch(post_id, PostPatch::from(edit.clone()));
        tracing::debug!(%post_id, "edit applied locally");

        let outcome = self.store.update_post(post_id, user_id, &edit).await;
        self.commit_or_compensate(outcome, Compensation::Refetch).await
    }
}
