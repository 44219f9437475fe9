// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the local feed store
pub const SCHEMA: &str = r#"
PRAGMA user_version = 1;
PRAGMA foreign_keys = ON;

-- profiles: owned by the profile workflow, read-only to the feed
CREATE TABLE IF NOT EXISTS profiles (
    id BLOB PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    avatar_url TEXT,
    role TEXT NOT NULL,
    verification TEXT NOT NULL DEFAULT 'unverified'
);

-- posts: one row per wisdom/donation/seeking entry
CREATE TABLE IF NOT EXISTS posts (
    id BLOB PRIMARY KEY,
    user_id BLOB NOT NULL,
    created_at TEXT NOT NULL,
    kind TEXT NOT NULL,
    content TEXT,
    resource_title TEXT,
    resource_category TEXT,
    contact TEXT,
    image_url TEXT,
    link_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id);

-- likes: at most one per (post, user)
CREATE TABLE IF NOT EXISTS likes (
    post_id BLOB NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    user_id BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id BLOB PRIMARY KEY,
    post_id BLOB NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    user_id BLOB NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient BLOB NOT NULL,
    kind TEXT NOT NULL,
    actor BLOB NOT NULL,
    post_id BLOB NOT NULL,
    created_at TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient, created_at DESC);

CREATE TABLE IF NOT EXISTS uploads (
    path TEXT PRIMARY KEY,
    uploader BLOB NOT NULL,
    bytes BLOB NOT NULL,
    created_at TEXT NOT NULL
);
"#;
