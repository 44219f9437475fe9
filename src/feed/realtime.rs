// SPDX-License-Identifier: MPL-2.0

//! Applies store change events to the feed.

use crate::feed::{Feed, FeedError};
use crate::remote::{
    ChangeEvent, ChangeKind, Delivery, PostId, PostPatch, PostRow, Subscription, Table,
};
use serde::Deserialize;

/// What a change did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Upserted(PostId),
    Patched(PostId),
    Removed(PostId),
    Refetched,
    /// Nothing local matched.
    Ignored,
}

#[derive(Deserialize)]
struct DeletedRow {
    id: PostId,
}

impl Feed {
    pub async fn apply_delivery(&mut self, delivery: Delivery) -> Result<Reaction, FeedError> {
        match delivery {
            Delivery::Event(event) => self.apply_change(event).await,
            Delivery::Lagged(missed) => {
                tracing::warn!(missed, "change stream lagged, refetching");
                self.refresh().await?;
                Ok(Reaction::Refetched)
            }
        }
    }

    /// Posts are merged in place. Likes and comments only say that
    /// something changed, so the whole feed is refetched.
    pub async fn apply_change(&mut self, event: ChangeEvent) -> Result<Reaction, FeedError> {
        tracing::debug!(table = ?event.table, kind = ?event.kind, "change received");

        if event.table != Table::Posts {
            self.refresh().await?;
            return Ok(Reaction::Refetched);
        }

        let kind = event.kind;
        let reaction = match kind {
            ChangeKind::Insert | ChangeKind::Update => {
                serde_json::from_value::<PostRow>(event.row).map(|row| {
                    let id = row.id;
                    if kind == ChangeKind::Insert {
                        self.state.upsert(row);
                        Reaction::Upserted(id)
                    } else if self.state.patch(id, PostPatch::from(row)) {
                        Reaction::Patched(id)
                    } else {
                        Reaction::Ignored
                    }
                })
            }
            ChangeKind::Delete => serde_json::from_value::<DeletedRow>(event.row).map(|row| {
                match self.state.remove(row.id) {
                    Some(_) => Reaction::Removed(row.id),
                    None => Reaction::Ignored,
                }
            }),
        };

        match reaction {
            Ok(reaction) => Ok(reaction),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable post change, refetching");
                self.refresh().await?;
                Ok(Reaction::Refetched)
            }
        }
    }
}

/// Owns the feed's subscription to store changes. Unmounting, or dropping
/// the adapter, releases it.
#[derive(Debug, Default)]
pub struct RealtimeAdapter {
    subscription: Option<Subscription>,
}

impl RealtimeAdapter {
    /// Subscribe on behalf of a signed-in viewer. Anonymous viewers get an
    /// inert adapter.
    pub fn mount(feed: &Feed) -> Self {
        if !feed.viewer().is_authenticated() {
            tracing::info!("no signed-in viewer, realtime updates off");
            return Self::default();
        }
        tracing::info!("realtime subscription opened");
        Self {
            subscription: Some(feed.store().subscribe()),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for the next delivery. Pends forever when not mounted, so it
    /// can sit in a `select!` next to other sources. `None` once the store
    /// has closed the channel.
    pub async fn next(&mut self) -> Option<Delivery> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => std::future::pending().await,
        }
    }

    pub fn try_next(&mut self) -> Option<Delivery> {
        self.subscription.as_mut()?.try_recv()
    }

    /// Apply one pending delivery, if any.
    pub async fn pump(&mut self, feed: &mut Feed) -> Result<Option<Reaction>, FeedError> {
        match self.try_next() {
            Some(delivery) => feed.apply_delivery(delivery).await.map(Some),
            None => Ok(None),
        }
    }

    /// Apply everything pending.
    pub async fn drain(&mut self, feed: &mut Feed) -> Result<Vec<Reaction>, FeedError> {
        let mut reactions = Vec::new();
        while let Some(reaction) = self.pump(feed).await? {
            reactions.push(reaction);
        }
        Ok(reactions)
    }

    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.subscription.take().is_some() {
            tracing::info!("realtime subscription closed");
        }
    }
}

impl Drop for RealtimeAdapter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::testing::{FlakyStore, Op, member, wisdom};
    use crate::remote::{PostEdit, RemoteStore, Role, Verification};
    use crate::state::Viewer;
    use std::sync::Arc;

    async fn mounted() -> (Arc<FlakyStore>, Feed, RealtimeAdapter, crate::remote::Profile) {
        let store = FlakyStore::new();
        let ana = member(&store, "ana", Role::Student, Verification::Verified);
        let mut feed = Feed::new(store.clone(), Viewer::with_profile(ana.clone()));
        feed.refresh().await.unwrap();
        let adapter = RealtimeAdapter::mount(&feed);
        (store, feed, adapter, ana)
    }

    #[tokio::test]
    async fn test_insert_echo_lands_at_front() {
        let (store, mut feed, mut adapter, ana) = mounted().await;
        let first = store.inner.insert_post(ana.id, wisdom("one"), None).await.unwrap();
        let second = store.inner.insert_post(ana.id, wisdom("two"), None).await.unwrap();

        let reactions = adapter.drain(&mut feed).await.unwrap();
        assert_eq!(
            reactions,
            vec![Reaction::Upserted(first), Reaction::Upserted(second)]
        );
        let ids: Vec<_> = feed.state().posts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_update_and_delete_are_applied_in_place() {
        let (store, mut feed, mut adapter, ana) = mounted().await;
        let id = store.inner.insert_post(ana.id, wisdom("draft"), None).await.unwrap();
        adapter.drain(&mut feed).await.unwrap();

        let edit = PostEdit {
            content: "final".into(),
            link: None,
        };
        store.inner.update_post(id, ana.id, &edit).await.unwrap();
        assert_eq!(adapter.pump(&mut feed).await.unwrap(), Some(Reaction::Patched(id)));
        assert_eq!(feed.state().get(id).unwrap().content.as_deref(), Some("final"));

        store.inner.delete_post(id, ana.id).await.unwrap();
        assert_eq!(adapter.pump(&mut feed).await.unwrap(), Some(Reaction::Removed(id)));
        assert!(feed.state().is_empty());
    }

    #[tokio::test]
    async fn test_like_event_triggers_refetch() {
        let (store, mut feed, mut adapter, ana) = mounted().await;
        let id = store.inner.insert_post(ana.id, wisdom("hi"), None).await.unwrap();
        adapter.drain(&mut feed).await.unwrap();
        let fetches = store.count(Op::FetchPosts);

        store.inner.insert_like(id, ana.id).await.unwrap();
        assert_eq!(adapter.pump(&mut feed).await.unwrap(), Some(Reaction::Refetched));
        assert_eq!(store.count(Op::FetchPosts), fetches + 1);
        assert_eq!(feed.state().get(id).unwrap().like_count(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_refetches() {
        let (store, mut feed, _adapter, _) = mounted().await;
        let fetches = store.count(Op::FetchPosts);

        let event = ChangeEvent {
            table: Table::Posts,
            kind: ChangeKind::Update,
            row: serde_json::json!({ "id": "not-a-uuid" }),
        };
        assert_eq!(feed.apply_change(event).await.unwrap(), Reaction::Refetched);
        assert_eq!(store.count(Op::FetchPosts), fetches + 1);
    }

    #[tokio::test]
    async fn test_unknown_delete_is_ignored() {
        let (_store, mut feed, _adapter, _) = mounted().await;
        let event = ChangeEvent {
            table: Table::Posts,
            kind: ChangeKind::Delete,
            row: serde_json::json!({ "id": uuid::Uuid::new_v4() }),
        };
        assert_eq!(feed.apply_change(event).await.unwrap(), Reaction::Ignored);
    }

    #[tokio::test]
    async fn test_lag_triggers_refetch() {
        let (store, mut feed, _adapter, _) = mounted().await;
        let fetches = store.count(Op::FetchPosts);

        let reaction = feed.apply_delivery(Delivery::Lagged(3)).await.unwrap();
        assert_eq!(reaction, Reaction::Refetched);
        assert_eq!(store.count(Op::FetchPosts), fetches + 1);
    }

    #[tokio::test]
    async fn test_subscription_released_on_unmount_and_drop() {
        let (store, feed, adapter, _) = mounted().await;
        assert!(adapter.is_mounted());
        assert_eq!(store.inner.live_subscriptions(), 1);

        adapter.unmount();
        assert_eq!(store.inner.live_subscriptions(), 0);

        {
            let _again = RealtimeAdapter::mount(&feed);
            assert_eq!(store.inner.live_subscriptions(), 1);
        }
        assert_eq!(store.inner.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_viewer_does_not_subscribe() {
        let store = FlakyStore::new();
        let feed = Feed::new(store.clone(), Viewer::anonymous());

        let mut adapter = RealtimeAdapter::mount(&feed);
        assert!(!adapter.is_mounted());
        assert!(adapter.try_next().is_none());
        assert_eq!(store.inner.live_subscriptions(), 0);
    }
}
