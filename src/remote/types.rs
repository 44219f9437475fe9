// SPDX-License-Identifier: MPL-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub type UserId = Uuid;
pub type PostId = Uuid;
pub type CommentId = Uuid;

/// Returned when a stored or user-supplied label names no known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Wisdom,
    Donation,
    Seeking,
}

text_enum!(PostKind, "post kind", {
    Wisdom => "wisdom",
    Donation => "donation",
    Seeking => "seeking",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Books,
    Electronics,
    Clothing,
    Stationery,
    Furniture,
    Other,
}

text_enum!(Category, "category", {
    Books => "books",
    Electronics => "electronics",
    Clothing => "clothing",
    Stationery => "stationery",
    Furniture => "furniture",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Donor,
    Other,
}

text_enum!(Role, "role", {
    Student => "student",
    Donor => "donor",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    #[default]
    Unverified,
    Pending,
    Verified,
}

text_enum!(Verification, "verification status", {
    Unverified => "unverified",
    Pending => "pending",
    Verified => "verified",
});

/// Read-only view of a member's profile. Owned by the profile workflow,
/// consumed here for gating and badges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub verification: Verification,
}

impl Profile {
    pub fn is_verified(&self) -> bool {
        self.verification == Verification::Verified
    }

    /// Badge label rendered next to the username, if any.
    pub fn badge(&self) -> Option<&'static str> {
        match (self.role, self.verification) {
            (Role::Student, Verification::Verified) => Some("Verified Student"),
            (Role::Student, _) => Some("Student"),
            (Role::Donor, _) => Some("Donor"),
            (Role::Other, _) => None,
        }
    }
}

/// Link metadata derived from post text. Never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub post_id: PostId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Joined by the feed query; absent on realtime payloads and
    /// locally synthesized comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Profile>,
}

/// Flat `posts` row as the store pushes it over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub id: PostId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub kind: PostKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub resource_title: Option<String>,
    #[serde(default)]
    pub resource_category: Option<Category>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<LinkPreview>,
}

/// A post with its joined author profile and nested engagement.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub kind: PostKind,
    pub content: Option<String>,
    pub resource_title: Option<String>,
    pub resource_category: Option<Category>,
    pub contact: Option<String>,
    pub image_url: Option<String>,
    pub link: Option<LinkPreview>,
    pub author: Option<Profile>,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
}

impl Post {
    /// Build a post from a bare row; nested collections start empty.
    pub fn from_row(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            kind: row.kind,
            content: row.content,
            resource_title: row.resource_title,
            resource_category: row.resource_category,
            contact: row.contact,
            image_url: row.image_url,
            link: row.link,
            author: None,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Shallow merge: only fields set on the patch are overwritten.
    pub fn apply_patch(&mut self, patch: PostPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(title) = patch.resource_title {
            self.resource_title = title;
        }
        if let Some(category) = patch.resource_category {
            self.resource_category = category;
        }
        if let Some(contact) = patch.contact {
            self.contact = contact;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if let Some(link) = patch.link {
            self.link = link;
        }
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn is_liked_by(&self, user_id: UserId) -> bool {
        self.likes.iter().any(|l| l.user_id == user_id)
    }

    pub fn author_username(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.username.as_str())
    }
}

/// Field-level update for a post. `None` leaves a field untouched,
/// `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub kind: Option<PostKind>,
    pub content: Option<Option<String>>,
    pub resource_title: Option<Option<String>>,
    pub resource_category: Option<Option<Category>>,
    pub contact: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub link: Option<Option<LinkPreview>>,
}

impl From<PostRow> for PostPatch {
    fn from(row: PostRow) -> Self {
        Self {
            kind: Some(row.kind),
            content: Some(row.content),
            resource_title: Some(row.resource_title),
            resource_category: Some(row.resource_category),
            contact: Some(row.contact),
            image_url: Some(row.image_url),
            link: Some(row.link),
        }
    }
}

/// Author edit of an existing post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostEdit {
    pub content: String,
    pub link: Option<LinkPreview>,
}

impl From<PostEdit> for PostPatch {
    fn from(edit: PostEdit) -> Self {
        Self {
            content: Some(Some(edit.content)),
            link: Some(edit.link),
            ..Self::default()
        }
    }
}

/// Create request, one shape per post kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NewPost {
    Wisdom {
        content: String,
        link: Option<LinkPreview>,
    },
    Donation {
        title: String,
        category: Category,
        contact: String,
        details: Option<String>,
    },
    Seeking {
        title: String,
        category: Category,
        details: Option<String>,
    },
}

impl NewPost {
    pub fn kind(&self) -> PostKind {
        match self {
            NewPost::Wisdom { .. } => PostKind::Wisdom,
            NewPost::Donation { .. } => PostKind::Donation,
            NewPost::Seeking { .. } => PostKind::Seeking,
        }
    }

    /// Flatten into a row for the given author.
    pub fn into_row(
        self,
        id: PostId,
        user_id: UserId,
        created_at: DateTime<Utc>,
        image_url: Option<String>,
    ) -> PostRow {
        let kind = self.kind();
        let (content, resource_title, resource_category, contact, link) = match self {
            NewPost::Wisdom { content, link } => (Some(content), None, None, None, link),
            NewPost::Donation {
                title,
                category,
                contact,
                details,
            } => (details, Some(title), Some(category), Some(contact), None),
            NewPost::Seeking {
                title,
                category,
                details,
            } => (details, Some(title), Some(category), None, None),
        };

        PostRow {
            id,
            user_id,
            created_at,
            kind,
            content,
            resource_title,
            resource_category,
            contact,
            image_url,
            link,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
}

text_enum!(NotificationKind, "notification kind", {
    Like => "like",
    Comment => "comment",
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub actor: UserId,
    pub post_id: PostId,
}
