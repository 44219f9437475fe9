// SPDX-License-Identifier: MPL-2.0

use crate::local::{LocalError, LocalStore};
use crate::remote::{Profile, UserId};
use rusqlite::{OptionalExtension, params};

/// Store operations for profiles
pub struct ProfileRows<'a> {
    store: &'a LocalStore,
}

impl<'a> ProfileRows<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Insert or overwrite a profile
    pub fn upsert(&self, profile: &Profile) -> Result<(), LocalError> {
        let conn = self.store.conn();

        conn.execute(
            r#"
            INSERT INTO profiles (id, username, avatar_url, role, verification)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                avatar_url = excluded.avatar_url,
                role = excluded.role,
                verification = excluded.verification
            "#,
            params![
                profile.id,
                profile.username,
                profile.avatar_url,
                profile.role,
                profile.verification,
            ],
        )?;

        Ok(())
    }

    pub fn get(&self, id: UserId) -> Result<Option<Profile>, LocalError> {
        self.find("id = ?1", params![id])
    }

    pub fn by_username(&self, username: &str) -> Result<Option<Profile>, LocalError> {
        self.find("username = ?1", params![username])
    }

    fn find(
        &self,
        predicate: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Option<Profile>, LocalError> {
        let conn = self.store.conn();
        let query = format!(
            "SELECT id, username, avatar_url, role, verification FROM profiles WHERE {predicate}"
        );

        let profile = conn
            .query_row(&query, args, |row| Self::profile_at(row, 0))
            .optional()?
            .flatten();
        Ok(profile)
    }

    /// Read a profile from five consecutive columns starting at `offset`.
    /// A NULL id (from a LEFT JOIN miss) yields `None`.
    pub(crate) fn profile_at(
        row: &rusqlite::Row,
        offset: usize,
    ) -> Result<Option<Profile>, rusqlite::Error> {
        let Some(id) = row.get::<_, Option<UserId>>(offset)? else {
            return Ok(None);
        };

        Ok(Some(Profile {
            id,
            username: row.get(offset + 1)?,
            avatar_url: row.get(offset + 2)?,
            role: row.get(offset + 3)?,
            verification: row.get(offset + 4)?,
        }))
    }
}
