use super::{KeyValueBackend, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory, BootstrapError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// SQLite-backed key/value storage.
///
/// All SQLite calls run on Tokio's blocking pool so the store's drain task
/// never stalls a runtime worker.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: Option<PathBuf>,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteBackend {
    /// Backend over a database file, opened lazily by `initialize`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Backend over a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Backend("sqlite connection lock poisoned".into()))?;
            let conn = guard.as_ref().ok_or(StorageError::NotInitialized)?;
            f(conn).map_err(|err| StorageError::Backend(err.to_string()))
        })
        .await
        .map_err(|err| StorageError::Backend(format!("blocking task failed: {err}")))?
    }
}

impl From<BootstrapError> for StorageError {
    fn from(value: BootstrapError) -> Self {
        Self::Init(value.to_string())
    }
}

#[async_trait]
impl KeyValueBackend for SqliteBackend {
    async fn initialize(&self) -> StorageResult<()> {
        let path = self.path.clone();
        let conn = tokio::task::spawn_blocking(move || match path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        })
        .await
        .map_err(|err| StorageError::Init(format!("blocking task failed: {err}")))??;

        let mut slot = self
            .conn
            .lock()
            .map_err(|_| StorageError::Init("sqlite connection lock poisoned".into()))?;
        *slot = Some(conn);
        Ok(())
    }

    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
    }

    async fn write(&self, key: &str, value: String) -> StorageResult<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now') * 1000)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at;",
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }
}
