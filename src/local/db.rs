// SPDX-License-Identifier: MPL-2.0

use crate::config::CHANGE_CHANNEL_CAPACITY;
use crate::local::LocalError;
use crate::local::schema::SCHEMA;
use crate::remote::{
    Category, ChangeEvent, ChangeKind, NotificationKind, PostKind, Role, Table, Verification,
};
use rusqlite::Connection;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

// Enums are stored by their lowercase label.
macro_rules! sql_text_enum {
    ($($name:ty),+ $(,)?) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

sql_text_enum!(PostKind, Category, Role, Verification, NotificationKind);

/// SQLite-backed store with an in-process change channel.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl LocalStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self, LocalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LocalError::Path(format!("failed to create data dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Throwaway store, used by tests and demos.
    pub fn open_in_memory() -> Result<Self, LocalError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, LocalError> {
        Self::migrate(&conn)?;
        let (events, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            events,
        })
    }

    /// Run schema migrations
    fn migrate(conn: &Connection) -> Result<(), LocalError> {
        // All CREATE IF NOT EXISTS
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Default location: ~/.local/share/sharewell/feed.db
    pub fn default_path() -> Result<PathBuf, LocalError> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| LocalError::Path("could not find data directory".to_string()))?;

        Ok(data_dir.join("sharewell").join("feed.db"))
    }

    /// Access connection for operations
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        // Statements never panic mid-write, so a poisoned guard is still usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn events(&self) -> &broadcast::Sender<ChangeEvent> {
        &self.events
    }

    /// Push a change to every live subscriber.
    pub(crate) fn publish(&self, table: Table, kind: ChangeKind, row: serde_json::Value) {
        let event = ChangeEvent { table, kind, row };
        // No subscribers is not an error.
        if self.events.send(event).is_err() {
            tracing::trace!(?table, ?kind, "change dropped, no subscribers");
        }
    }

    /// Number of open change subscriptions.
    pub fn live_subscriptions(&self) -> usize {
        self.events.receiver_count()
    }
}
