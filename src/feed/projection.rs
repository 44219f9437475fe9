// SPDX-License-Identifier: MPL-2.0

//! Filter and sort of the feed for display.

use crate::feed::FeedState;
use crate::remote::{Post, PostKind, UnknownVariant};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Recent,
    Likes,
    Comments,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Recent => "recent",
            SortKey::Likes => "likes",
            SortKey::Comments => "comments",
        }
    }
}

impl FromStr for SortKey {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(SortKey::Recent),
            "likes" => Ok(SortKey::Likes),
            "comments" => Ok(SortKey::Comments),
            other => Err(UnknownVariant {
                kind: "sort key",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post kind filter; `All` passes everything through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(PostKind),
}

impl TypeFilter {
    pub fn matches(self, kind: PostKind) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(wanted) => wanted == kind,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(TypeFilter::All);
        }
        s.parse().map(TypeFilter::Only)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub search: String,
    pub filter: TypeFilter,
    pub sort: SortKey,
}

fn contains_folded(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn matches_search(post: &Post, needle: &str) -> bool {
    needle.is_empty()
        || contains_folded(post.content.as_deref(), needle)
        || contains_folded(post.resource_title.as_deref(), needle)
        || contains_folded(post.author_username(), needle)
}

fn compare(sort: SortKey, a: &Post, b: &Post) -> Ordering {
    let recency = b.created_at.cmp(&a.created_at);
    match sort {
        SortKey::Recent => recency,
        SortKey::Likes => b.like_count().cmp(&a.like_count()).then(recency),
        SortKey::Comments => b.comment_count().cmp(&a.comment_count()).then(recency),
    }
}

/// Indices into `posts` in display order.
fn project_indices(posts: &[Post], query: &FeedQuery) -> Vec<usize> {
    let needle = query.search.trim().to_lowercase();
    let mut indices: Vec<usize> = posts
        .iter()
        .enumerate()
        .filter(|(_, p)| query.filter.matches(p.kind) && matches_search(p, &needle))
        .map(|(i, _)| i)
        .collect();

    // sort_by is stable: exact ties keep their input order.
    indices.sort_by(|&a, &b| compare(query.sort, &posts[a], &posts[b]));
    indices
}

/// Filter, search, and sort `posts` for display.
pub fn project<'a>(posts: &'a [Post], query: &FeedQuery) -> Vec<&'a Post> {
    project_indices(posts, query)
        .into_iter()
        .map(|i| &posts[i])
        .collect()
}

/// Memoized projection, recomputed only when the query or the container
/// it renders changes.
#[derive(Debug, Default)]
pub struct FeedView {
    query: FeedQuery,
    cache: Option<((u64, u64), Vec<usize>)>,
}

impl FeedView {
    pub fn new(query: FeedQuery) -> Self {
        Self { query, cache: None }
    }

    pub fn query(&self) -> &FeedQuery {
        &self.query
    }

    pub fn set_query(&mut self, query: FeedQuery) {
        if query != self.query {
            self.query = query;
            self.cache = None;
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let query = FeedQuery {
            search: search.into(),
            ..self.query.clone()
        };
        self.set_query(query);
    }

    pub fn set_filter(&mut self, filter: TypeFilter) {
        let query = FeedQuery {
            filter,
            ..self.query.clone()
        };
        self.set_query(query);
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        let query = FeedQuery {
            sort,
            ..self.query.clone()
        };
        self.set_query(query);
    }

    pub fn render<'a>(&mut self, state: &'a FeedState) -> Vec<&'a Post> {
        let stamp = state.stamp();
        let stale = !matches!(&self.cache, Some((s, _)) if *s == stamp);
        if stale {
            let indices = project_indices(state.posts(), &self.query);
            self.cache = Some((stamp, indices));
        }

        let posts = state.posts();
        self.cache
            .as_ref()
            .map(|(_, indices)| indices.iter().filter_map(|&i| posts.get(i)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Comment, Like, PostRow, Profile, Role, Verification};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn post(kind: PostKind, created_at: DateTime<Utc>, content: &str) -> Post {
        Post::from_row(PostRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            created_at,
            kind,
            content: Some(content.to_string()),
            resource_title: None,
            resource_category: None,
            contact: None,
            image_url: None,
            link: None,
        })
    }

    fn with_likes(mut p: Post, n: usize) -> Post {
        for _ in 0..n {
            p.likes.push(Like {
                post_id: p.id,
                user_id: Uuid::new_v4(),
                created_at: p.created_at,
            });
        }
        p
    }

    fn with_comments(mut p: Post, n: usize) -> Post {
        for i in 0..n {
            p.comments.push(Comment {
                id: Uuid::new_v4(),
                post_id: p.id,
                user_id: Uuid::new_v4(),
                content: format!("c{i}"),
                created_at: p.created_at,
                author: None,
            });
        }
        p
    }

    fn contents<'a>(posts: &[&'a Post]) -> Vec<&'a str> {
        posts.iter().filter_map(|p| p.content.as_deref()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let posts = vec![
            post(PostKind::Wisdom, at(1), "t1"),
            post(PostKind::Wisdom, at(3), "t3"),
            post(PostKind::Wisdom, at(2), "t2"),
        ];
        let shown = project(&posts, &FeedQuery::default());
        assert_eq!(contents(&shown), vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn test_recent_order_follows_timestamps_pairwise() {
        let posts: Vec<Post> = [5, 1, 4, 2, 3]
            .iter()
            .map(|m| post(PostKind::Wisdom, at(*m), &m.to_string()))
            .collect();
        let shown = project(&posts, &FeedQuery::default());
        for pair in shown.windows(2) {
            assert!(pair[0].created_at > pair[1].created_at);
        }
    }

    #[test]
    fn test_like_ties_fall_back_to_recency() {
        let posts = vec![
            with_likes(post(PostKind::Wisdom, at(1), "older"), 2),
            with_likes(post(PostKind::Wisdom, at(2), "newer"), 2),
            with_likes(post(PostKind::Wisdom, at(0), "popular"), 5),
        ];
        let query = FeedQuery {
            sort: SortKey::Likes,
            ..FeedQuery::default()
        };
        assert_eq!(
            contents(&project(&posts, &query)),
            vec!["popular", "newer", "older"]
        );
    }

    #[test]
    fn test_comment_sort_with_recency_tie_break() {
        let posts = vec![
            with_comments(post(PostKind::Wisdom, at(1), "a"), 1),
            with_comments(post(PostKind::Wisdom, at(2), "b"), 1),
            with_comments(post(PostKind::Wisdom, at(3), "c"), 0),
        ];
        let query = FeedQuery {
            sort: SortKey::Comments,
            ..FeedQuery::default()
        };
        assert_eq!(contents(&project(&posts, &query)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_exact_ties_keep_input_order() {
        let posts = vec![
            post(PostKind::Wisdom, at(1), "first"),
            post(PostKind::Wisdom, at(1), "second"),
        ];
        assert_eq!(
            contents(&project(&posts, &FeedQuery::default())),
            vec!["first", "second"]
        );
    }

    #[test]
    fn test_empty_search_equals_filter_and_sort_alone() {
        let posts = vec![
            post(PostKind::Donation, at(1), "lamp"),
            post(PostKind::Wisdom, at(2), "patience"),
            post(PostKind::Donation, at(3), "books"),
        ];
        let filtered = FeedQuery {
            filter: TypeFilter::Only(PostKind::Donation),
            ..FeedQuery::default()
        };
        let searched = FeedQuery {
            search: String::new(),
            ..filtered.clone()
        };
        assert_eq!(project(&posts, &searched), project(&posts, &filtered));
        assert_eq!(contents(&project(&posts, &filtered)), vec!["books", "lamp"]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let mut by_title = post(PostKind::Donation, at(1), "details");
        by_title.resource_title = Some("Graphing Calculator".into());
        let mut by_author = post(PostKind::Wisdom, at(2), "unrelated");
        by_author.author = Some(Profile {
            id: by_author.user_id,
            username: "CalcFan".into(),
            avatar_url: None,
            role: Role::Other,
            verification: Verification::Unverified,
        });
        let by_content = post(PostKind::Wisdom, at(3), "I love CALCULUS");
        let miss = post(PostKind::Wisdom, at(4), "nothing here");

        let posts = vec![by_title, by_author, by_content, miss];
        let query = FeedQuery {
            search: "calc".into(),
            ..FeedQuery::default()
        };
        assert_eq!(project(&posts, &query).len(), 3);
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("all".parse::<TypeFilter>().unwrap(), TypeFilter::All);
        assert_eq!(
            "seeking".parse::<TypeFilter>().unwrap(),
            TypeFilter::Only(PostKind::Seeking)
        );
        assert!("memes".parse::<TypeFilter>().is_err());
    }

    #[test]
    fn test_view_recomputes_on_revision_change() {
        let mut state = FeedState::new();
        let mut view = FeedView::new(FeedQuery::default());
        assert!(view.render(&state).is_empty());

        let p = post(PostKind::Wisdom, at(1), "hello");
        state.replace_all(vec![p.clone()]);
        assert_eq!(view.render(&state), vec![&p]);

        view.set_filter(TypeFilter::Only(PostKind::Seeking));
        assert!(view.render(&state).is_empty());
    }

    #[test]
    fn test_view_does_not_reuse_results_across_containers() {
        let mut first = FeedState::new();
        first.replace_all(vec![
            post(PostKind::Wisdom, at(1), "a1"),
            post(PostKind::Wisdom, at(2), "a2"),
        ]);
        let mut second = FeedState::new();
        second.replace_all(vec![post(PostKind::Wisdom, at(3), "b1")]);
        assert_eq!(first.revision(), second.revision());

        let mut view = FeedView::new(FeedQuery {
            search: "a".into(),
            ..FeedQuery::default()
        });
        assert_eq!(contents(&view.render(&first)), vec!["a2", "a1"]);
        assert!(view.render(&second).is_empty());
    }
}
