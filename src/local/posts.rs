// SPDX-License-Identifier: MPL-2.0

use crate::local::{LocalError, LocalStore, ProfileRows};
use crate::remote::{Comment, Like, LinkPreview, Post, PostEdit, PostId, PostRow, UserId};
use rusqlite::{OptionalExtension, params};
use std::collections::HashMap;

const POST_COLUMNS: &str = r#"
    p.id, p.user_id, p.created_at, p.kind, p.content,
    p.resource_title, p.resource_category, p.contact, p.image_url, p.link_json
"#;

/// Store operations on the `posts` table
pub struct PostRows<'a> {
    store: &'a LocalStore,
}

impl<'a> PostRows<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    pub fn insert(&self, row: &PostRow) -> Result<(), LocalError> {
        let conn = self.store.conn();
        let link_json = row.link.as_ref().map(serde_json::to_string).transpose()?;

        conn.execute(
            r#"
            INSERT INTO posts (
                id, user_id, created_at, kind, content,
                resource_title, resource_category, contact, image_url, link_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                row.id,
                row.user_id,
                row.created_at,
                row.kind,
                row.content,
                row.resource_title,
                row.resource_category,
                row.contact,
                row.image_url,
                link_json,
            ],
        )?;

        Ok(())
    }

    /// Get a bare row by id
    pub fn get(&self, id: PostId) -> Result<Option<PostRow>, LocalError> {
        let conn = self.store.conn();
        let query = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1");

        let row = conn
            .query_row(&query, [id], Self::row_to_post_row)
            .optional()?;
        Ok(row)
    }

    /// Apply an author edit. Returns the updated row, or `None` when no
    /// row matched (id, owner).
    pub fn update(
        &self,
        id: PostId,
        owner: UserId,
        edit: &PostEdit,
    ) -> Result<Option<PostRow>, LocalError> {
        let link_json = edit.link.as_ref().map(serde_json::to_string).transpose()?;

        let changed = self.store.conn().execute(
            r#"
            UPDATE posts
            SET content = ?1, link_json = ?2
            WHERE id = ?3 AND user_id = ?4
            "#,
            params![edit.content, link_json, id, owner],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        self.get(id)
    }

    /// Delete by (id, owner). Likes and comments cascade.
    pub fn delete(&self, id: PostId, owner: UserId) -> Result<bool, LocalError> {
        let changed = self.store.conn().execute(
            "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
            params![id, owner],
        )?;
        Ok(changed > 0)
    }

    /// Full feed: posts newest first with author, likes, and comments.
    pub fn fetch_all(&self) -> Result<Vec<Post>, LocalError> {
        let mut likes = self.likes_by_post()?;
        let mut comments = self.comments_by_post()?;

        let conn = self.store.conn();
        let query = format!(
            r#"
            SELECT {POST_COLUMNS},
                pr.id, pr.username, pr.avatar_url, pr.role, pr.verification
            FROM posts p
            LEFT JOIN profiles pr ON pr.id = p.user_id
            ORDER BY p.created_at DESC
            "#
        );
        let mut stmt = conn.prepare(&query)?;
        let mut rows = stmt.query([])?;
        let mut posts = Vec::new();

        while let Some(row) = rows.next()? {
            let mut post = Post::from_row(Self::row_to_post_row(row)?);
            post.author = ProfileRows::profile_at(row, 10)?;
            post.likes = likes.remove(&post.id).unwrap_or_default();
            post.comments = comments.remove(&post.id).unwrap_or_default();
            posts.push(post);
        }

        Ok(posts)
    }

    fn likes_by_post(&self) -> Result<HashMap<PostId, Vec<Like>>, LocalError> {
        let conn = self.store.conn();
        let mut stmt =
            conn.prepare("SELECT post_id, user_id, created_at FROM likes ORDER BY created_at ASC")?;
        let mut rows = stmt.query([])?;
        let mut map: HashMap<PostId, Vec<Like>> = HashMap::new();

        while let Some(row) = rows.next()? {
            let like = Like {
                post_id: row.get(0)?,
                user_id: row.get(1)?,
                created_at: row.get(2)?,
            };
            map.entry(like.post_id).or_default().push(like);
        }

        Ok(map)
    }

    fn comments_by_post(&self) -> Result<HashMap<PostId, Vec<Comment>>, LocalError> {
        let conn = self.store.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.content, c.created_at,
                pr.id, pr.username, pr.avatar_url, pr.role, pr.verification
            FROM comments c
            LEFT JOIN profiles pr ON pr.id = c.user_id
            ORDER BY c.created_at ASC
            "#,
        )?;
        let mut rows = stmt.query([])?;
        let mut map: HashMap<PostId, Vec<Comment>> = HashMap::new();

        while let Some(row) = rows.next()? {
            let comment = Comment {
                id: row.get(0)?,
                post_id: row.get(1)?,
                user_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
                author: ProfileRows::profile_at(row, 5)?,
            };
            map.entry(comment.post_id).or_default().push(comment);
        }

        Ok(map)
    }

    /// Convert the leading POST_COLUMNS of a row into a PostRow
    fn row_to_post_row(row: &rusqlite::Row) -> Result<PostRow, rusqlite::Error> {
        let link_json: Option<String> = row.get(9)?;
        let link: Option<LinkPreview> = link_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok());

        Ok(PostRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            created_at: row.get(2)?,
            kind: row.get(3)?,
            content: row.get(4)?,
            resource_title: row.get(5)?,
            resource_category: row.get(6)?,
            contact: row.get(7)?,
            image_url: row.get(8)?,
            link,
        })
    }
}
