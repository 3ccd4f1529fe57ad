//! SQLite-backed store
//!
//! One row per turn in `conversation_turns`, ordered by the autoincrement
//! id. Every append runs in its own transaction, so an exchange's two
//! turns land together or not at all. `tool_calls` and `metadata` are stored as JSON text and left NULL
//! when empty; NULL, empty text and JSON `null` all decode to empty.

use super::{
    ConversationStore, ConversationTurn, Role, SessionId, SessionSummary, StoreError, StoreResult,
    SCHEMA,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Thread-safe database handle
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Raw row as read from the table, decoded after the statement is done
struct TurnRow {
    id: i64,
    role: String,
    content: String,
    tool_calls: Option<String>,
    metadata: Option<String>,
}

impl TurnRow {
    fn decode(self) -> StoreResult<ConversationTurn> {
        let role = Role::parse(&self.role).ok_or_else(|| StoreError::InvalidRole {
            turn_id: self.id,
            role: self.role.clone(),
        })?;
        Ok(ConversationTurn {
            role,
            content: self.content,
            tool_calls: decode_column("tool_calls", self.id, self.tool_calls.as_deref())?,
            metadata: decode_column("metadata", self.id, self.metadata.as_deref())?,
        })
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn list(&self, session: &SessionId) -> StoreResult<Vec<ConversationTurn>> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT id, role, content, tool_calls, metadata
                 FROM conversation_turns WHERE session_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![session.as_str()], |row| {
                Ok(TurnRow {
                    id: row.get(0)?,
                    role: row.get(1)?,
                    content: row.get(2)?,
                    tool_calls: row.get(3)?,
                    metadata: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter().map(TurnRow::decode).collect()
    }

    async fn append(&self, session: &SessionId, turn: &ConversationTurn) -> StoreResult<()> {
        let now = Utc::now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_turn(&tx, session, turn, now)?;
        tx.commit()?;
        Ok(())
    }

    async fn append_exchange(
        &self,
        session: &SessionId,
        user: &ConversationTurn,
        assistant: &ConversationTurn,
    ) -> StoreResult<()> {
        let now = Utc::now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_turn(&tx, session, user, now)?;
        insert_turn(&tx, session, assistant, now)?;
        tx.commit()?;
        Ok(())
    }

    async fn delete(&self, session: &SessionId) -> StoreResult<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM conversation_turns WHERE session_id = ?1",
            params![session.as_str()],
        )?;
        tracing::debug!(session = %session, deleted, "Deleted session turns");
        Ok(())
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, COUNT(*), MAX(created_at)
             FROM conversation_turns
             GROUP BY session_id
             ORDER BY MAX(id) DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let session_id: String = row.get(0)?;
            let turn_count: i64 = row.get(1)?;
            let last_activity: String = row.get(2)?;
            Ok(SessionSummary {
                session_id: SessionId(session_id),
                turn_count: usize::try_from(turn_count).unwrap_or_default(),
                last_activity: parse_datetime(&last_activity),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

/// Insert one row. Dropping `tx` without a commit discards it.
fn insert_turn(
    tx: &Transaction<'_>,
    session: &SessionId,
    turn: &ConversationTurn,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    let tool_calls = encode_column("tool_calls", &turn.tool_calls, turn.tool_calls.is_empty())?;
    let metadata = encode_column("metadata", &turn.metadata, turn.metadata.is_empty())?;
    tx.execute(
        "INSERT INTO conversation_turns (session_id, role, content, tool_calls, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            session.as_str(),
            turn.role.as_str(),
            turn.content,
            tool_calls,
            metadata,
            now.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn encode_column<T: Serialize>(
    field: &'static str,
    value: &T,
    is_empty: bool,
) -> StoreResult<Option<String>> {
    if is_empty {
        return Ok(None);
    }
    serde_json::to_string(value)
        .map(Some)
        .map_err(|source| StoreError::Encode { field, source })
}

fn decode_column<T: DeserializeOwned + Default>(
    field: &'static str,
    turn_id: i64,
    raw: Option<&str>,
) -> StoreResult<T> {
    match raw {
        None => Ok(T::default()),
        Some(text) if text.trim().is_empty() => Ok(T::default()),
        Some(text) => serde_json::from_str::<Option<T>>(text)
            .map(Option::unwrap_or_default)
            .map_err(|source| StoreError::Decode {
                field,
                turn_id,
                source,
            }),
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
