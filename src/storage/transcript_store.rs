//! Append-only transcript store keyed by session.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use chrono::{TimeZone, Utc};
use tokio_rusqlite::Connection;

use crate::config::StorageConfig;
use crate::storage::errors::{StoreError, StoreResult};
use crate::storage::turn::{SessionId, Turn, TurnRole};

/// Boxed future type for transcript store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transcript store trait.
pub trait TranscriptStore: Send + Sync {
    /// Append one turn; each call is a single atomic insert.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append(
        &self,
        session_id: SessionId,
        role: TurnRole,
        content: String,
    ) -> StoreFuture<'_, StoreResult<Turn>>;

    /// Load every turn of a session in insertion order.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn read(&self, session_id: SessionId) -> StoreFuture<'_, StoreResult<Vec<Turn>>>;

    /// Load the last `limit` turns of a session, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn read_recent(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> StoreFuture<'_, StoreResult<Vec<Turn>>>;

    /// Delete every turn of a session and return how many were removed.
    /// Clearing an empty session succeeds with zero.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn clear(&self, session_id: SessionId) -> StoreFuture<'_, StoreResult<usize>>;
}

type TurnRow = (i64, String, String, i64);

/// `SQLite` implementation of transcript storage.
pub struct SqliteTranscriptStore {
    conn: Connection,
    table: String,
}

impl SqliteTranscriptStore {
    /// Open (or create) the transcript store at the configured path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(conn, config.messages_table.clone()).await
    }

    /// Create a private in-memory store.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub async fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn, StorageConfig::default().messages_table).await
    }

    async fn with_connection(conn: Connection, table: String) -> StoreResult<Self> {
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_session
                    ON {table_name} (session_id, id);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

fn rows_to_turns(session_id: &SessionId, rows: Vec<TurnRow>) -> StoreResult<Vec<Turn>> {
    let mut turns = Vec::with_capacity(rows.len());
    for (id, role, content, ts) in rows {
        let timestamp = Utc
            .timestamp_millis_opt(ts)
            .single()
            .ok_or_else(|| StoreError::InvalidTurn(format!("invalid timestamp on row {id}")))?;
        let role = TurnRole::from_str(&role)
            .map_err(|err| StoreError::InvalidTurn(format!("invalid role: {err}")))?;
        turns.push(Turn {
            id,
            session_id: session_id.clone(),
            role,
            content,
            timestamp,
        });
    }
    Ok(turns)
}

impl TranscriptStore for SqliteTranscriptStore {
    fn append(
        &self,
        session_id: SessionId,
        role: TurnRole,
        content: String,
    ) -> StoreFuture<'_, StoreResult<Turn>> {
        Box::pin(async move {
            let table = self.table.clone();
            let session = session_id.to_string();
            let timestamp = Utc::now();
            let millis = timestamp.timestamp_millis();
            let stored = content.clone();

            let id = self
                .conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (session_id, role, content, created_at)
                             VALUES (?1, ?2, ?3, ?4)"
                        ),
                        rusqlite::params![session, role.as_str(), stored, millis],
                    )?;
                    Ok(conn.last_insert_rowid())
                })
                .await?;

            Ok(Turn {
                id,
                session_id,
                role,
                content,
                timestamp,
            })
        })
    }

    fn read(&self, session_id: SessionId) -> StoreFuture<'_, StoreResult<Vec<Turn>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let session = session_id.to_string();
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT id, role, content, created_at
                         FROM {table}
                         WHERE session_id = ?1
                         ORDER BY id"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![session], |row| {
                            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                        })?
                        .collect::<Result<Vec<TurnRow>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows_to_turns(&session_id, rows)
        })
    }

    fn read_recent(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> StoreFuture<'_, StoreResult<Vec<Turn>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let session = session_id.to_string();
            let limit = i64::try_from(limit)
                .map_err(|_| StoreError::InvalidTurn("limit exceeds i64".to_string()))?;
            let mut rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT id, role, content, created_at
                         FROM {table}
                         WHERE session_id = ?1
                         ORDER BY id DESC
                         LIMIT ?2"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![session, limit], |row| {
                            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                        })?
                        .collect::<Result<Vec<TurnRow>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.reverse();
            rows_to_turns(&session_id, rows)
        })
    }

    fn clear(&self, session_id: SessionId) -> StoreFuture<'_, StoreResult<usize>> {
        Box::pin(async move {
            let table = self.table.clone();
            let session = session_id.to_string();

            let removed = self
                .conn
                .call(move |conn| {
                    let removed = conn.execute(
                        &format!("DELETE FROM {table} WHERE session_id = ?1"),
                        rusqlite::params![session],
                    )?;
                    Ok(removed)
                })
                .await?;

            Ok(removed)
        })
    }
}
