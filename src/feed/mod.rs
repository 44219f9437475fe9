// SPDX-License-Identifier: MPL-2.0

//! The feed: local state, its projection, and the handlers that mutate it.
//!
//! Every user action runs the same protocol: check preconditions, apply the
//! change to [`FeedState`] right away, send the mutation to the store, then
//! either keep the change or compensate for it. Compensation is either a
//! targeted rollback or a full refetch, chosen per action.

mod actions;
mod claim;
mod composer;
mod container;
mod error;
mod projection;
mod realtime;
pub mod share;

#[cfg(test)]
mod testing;

pub use actions::PostEditor;
pub use claim::{ClaimedContact, check_claim};
pub use composer::{Composer, ImageAttachment, PreviewDebouncer};
pub use container::FeedState;
pub use error::{CapabilityError, FeedError, ValidationError};
pub use projection::{FeedQuery, FeedView, SortKey, TypeFilter, project};
pub use realtime::{RealtimeAdapter, Reaction};

use crate::remote::{CommentId, NotificationRequest, PostId, RemoteStore, StoreResult};
use crate::state::Viewer;
use std::sync::Arc;

/// How to undo an optimistic change whose remote mutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compensation {
    /// Replace local state with the store's.
    Refetch,
    /// Remove exactly one synthesized comment.
    DropComment {
        post_id: PostId,
        comment_id: CommentId,
    },
}

/// One viewer's feed session against a store.
pub struct Feed {
    store: Arc<dyn RemoteStore>,
    state: FeedState,
    viewer: Viewer,
}

impl Feed {
    pub fn new(store: Arc<dyn RemoteStore>, viewer: Viewer) -> Self {
        Self {
            store,
            state: FeedState::new(),
            viewer,
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn set_viewer(&mut self, viewer: Viewer) {
        self.viewer = viewer;
    }

    /// Replace local state with the store's view.
    pub async fn refresh(&mut self) -> Result<(), FeedError> {
        let posts = self.store.fetch_posts().await?;
        tracing::debug!(count = posts.len(), "feed refreshed");
        self.state.replace_all(posts);
        Ok(())
    }

    /// Second half of the optimistic protocol: pass a success through, or
    /// compensate and surface the failure.
    async fn commit_or_compensate<T>(
        &mut self,
        outcome: StoreResult<T>,
        compensation: Compensation,
    ) -> Result<T, FeedError> {
        match outcome {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(error = %e, ?compensation, "remote mutation failed, compensating");
                self.compensate(compensation).await;
                Err(e.into())
            }
        }
    }

    async fn compensate(&mut self, compensation: Compensation) {
        match compensation {
            Compensation::Refetch => {
                if let Err(e) = self.refresh().await {
                    // Local state stays stale until the next successful fetch.
                    tracing::warn!(error = %e, "refetch after failed mutation also failed");
                }
            }
            Compensation::DropComment {
                post_id,
                comment_id,
            } => {
                self.state.remove_comment(post_id, comment_id);
            }
        }
    }

    /// Best effort; failures are logged and never reach the caller.
    async fn notify(&self, request: NotificationRequest) {
        if let Err(e) = self.store.create_notification(&request).await {
            tracing::warn!(
                error = %e,
                kind = %request.kind,
                post_id = %request.post_id,
                "notification request failed"
            );
        }
    }
}
