//! `SQLite`-backed transcript store.
//!
//! Each append runs inside one transaction, so an exchange lands whole or not at all; ordering within a session
//! follows the autoincrement row id. Session locks are held in-process.

use std::str::FromStr;

use chrono::{TimeZone, Utc};
use tokio_rusqlite::Connection;

use crate::coach::core::config::StorageConfig;
use crate::coach::core::errors::{StoreError, StoreResult};
use crate::coach::core::ids::SessionKey;
use crate::coach::store::locks::{SessionGuard, SessionLocks};
use crate::coach::store::turn::{Turn, TurnRole};
use crate::coach::store::{ConversationStore, StoreFuture};

type TurnRow = (i64, String, String);

/// `SQLite` implementation of transcript storage.
pub struct SqliteConversationStore {
    conn: Connection,
    table: String,
    locks: SessionLocks,
}

impl SqliteConversationStore {
    /// Open (or create) the transcript table at the configured path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(config: &StorageConfig) -> StoreResult<Self> {
        let conn = Connection::open(&config.sqlite_path).await?;
        Self::with_connection(conn, config.transcript_table.clone()).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub async fn open_in_memory(table: impl Into<String>) -> StoreResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn, table.into()).await
    }

    async fn with_connection(conn: Connection, table: String) -> StoreResult<Self> {
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    conversation_id TEXT NOT NULL,
                    ts INTEGER NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_session
                    ON {table_name} (user_id, conversation_id, id);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            table,
            locks: SessionLocks::new(),
        })
    }
}

impl ConversationStore for SqliteConversationStore {
    fn lock<'a>(&'a self, key: &'a SessionKey) -> StoreFuture<'a, SessionGuard> {
        Box::pin(self.locks.acquire(key))
    }

    fn load_recent<'a>(
        &'a self,
        key: &'a SessionKey,
        limit: usize,
    ) -> StoreFuture<'a, StoreResult<Vec<Turn>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let user = key.user_id.to_string();
            let conversation = key.conversation_id.to_string();
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let mut rows: Vec<TurnRow> = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT ts, role, content
                         FROM {table}
                         WHERE user_id = ?1 AND conversation_id = ?2
                         ORDER BY id DESC
                         LIMIT ?3"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![user, conversation, limit], |row| {
                            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.reverse();
            rows.into_iter().map(row_to_turn).collect()
        })
    }

    fn append<'a>(
        &'a self,
        session: &'a SessionGuard,
        turn: Turn,
    ) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(self.insert_turns(session, vec![turn]))
    }

    fn append_exchange<'a>(
        &'a self,
        session: &'a SessionGuard,
        user: Turn,
        assistant: Turn,
    ) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(self.insert_turns(session, vec![user, assistant]))
    }
}

impl SqliteConversationStore {
    async fn insert_turns(&self, session: &SessionGuard, turns: Vec<Turn>) -> StoreResult<()> {
        let table = self.table.clone();
        let user = session.key().user_id.to_string();
        let conversation = session.key().conversation_id.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(&format!(
                        "INSERT INTO {table} (user_id, conversation_id, ts, role, content)
                         VALUES (?1, ?2, ?3, ?4, ?5)"
                    ))?;
                    for turn in &turns {
                        stmt.execute(rusqlite::params![
                            user,
                            conversation,
                            turn.timestamp.timestamp_millis(),
                            turn.role.as_str(),
                            turn.content
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn row_to_turn((ts, role, content): TurnRow) -> StoreResult<Turn> {
    let timestamp = Utc
        .timestamp_millis_opt(ts)
        .single()
        .ok_or_else(|| StoreError::InvalidTurn(format!("invalid timestamp {ts}")))?;
    let role = TurnRole::from_str(&role)
        .map_err(|err| StoreError::InvalidTurn(format!("invalid role: {err}")))?;
    Ok(Turn {
        role,
        content,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_append_and_load_recent() {
        let store = SqliteConversationStore::open_in_memory("transcript_test")
            .await
            .unwrap();
        let key = SessionKey::resolve(Some("u"), Some("c"));
        let other = SessionKey::resolve(Some("u"), Some("other"));

        let session = store.lock(&key).await;
        store.append(&session, Turn::user("hello")).await.unwrap();
        store.append(&session, Turn::assistant("hi there")).await.unwrap();
        store.append(&session, Turn::user("dinner ideas?")).await.unwrap();
        drop(session);

        let all = store.load_recent(&key, 50).await.unwrap();
        let roles: Vec<TurnRole> = all.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::Assistant, TurnRole::User]
        );
        assert_eq!(all[2].content, "dinner ideas?");

        let recent = store.load_recent(&key, 1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].content, "dinner ideas?");

        assert!(store.load_recent(&other, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_append_exchange() {
        let store = SqliteConversationStore::open_in_memory("exchange_test")
            .await
            .unwrap();
        let key = SessionKey::resolve(Some("u"), Some("c"));

        let session = store.lock(&key).await;
        for i in 0..2 {
            store
                .append_exchange(
                    &session,
                    Turn::user(format!("q{i}")),
                    Turn::assistant(format!("a{i}")),
                )
                .await
                .unwrap();
        }
        drop(session);

        let turns = store.load_recent(&key, 50).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q0", "a0", "q1", "a1"]);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[3].role, TurnRole::Assistant);
    }

    #[test]
    fn test_row_to_turn_rejects_unknown_role() {
        assert!(row_to_turn((0, "tool".to_string(), "x".to_string())).is_err());
        let turn = row_to_turn((1_700_000_000_000, "user".to_string(), "x".to_string())).unwrap();
        assert_eq!(turn.role, TurnRole::User);
    }
}
