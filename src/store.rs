//! Conversation store
//!
//! Durable, append-only, per-session log of conversation turns. Two
//! variants implement [`ConversationStore`]: a volatile [`InMemoryStore`]
//! and the SQLite-backed [`SqliteStore`] that survives restarts.

mod memory;
mod schema;
mod sqlite;

pub use memory::InMemoryStore;
pub use schema::*;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode {field}: {source}")]
    Encode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to decode {field} of turn {turn_id}: {source}")]
    Decode {
        field: &'static str,
        turn_id: i64,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unknown role {role:?} on turn {turn_id}")]
    InvalidRole { turn_id: i64, role: String },
    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for conversation turns
///
/// Appends are atomic per call: a concurrent `list` of the same session
/// observes either the whole turn or none of it.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All turns of a session in insertion order. Unknown sessions yield an
    /// empty list. The returned turns are copies.
    async fn list(&self, session: &SessionId) -> StoreResult<Vec<ConversationTurn>>;

    /// Append one turn to the end of the session's log
    async fn append(&self, session: &SessionId, turn: &ConversationTurn) -> StoreResult<()>;

    /// Append a user turn and its answer as one unit. Either both turns are
    /// stored, adjacent and in this order, or neither is.
    async fn append_exchange(
        &self,
        session: &SessionId,
        user: &ConversationTurn,
        assistant: &ConversationTurn,
    ) -> StoreResult<()>;

    /// Remove every turn of a session. Deleting an unknown session is not an error.
    async fn delete(&self, session: &SessionId) -> StoreResult<()>;

    /// Sessions with at least one turn, most recently active first
    async fn list_sessions(&self) -> StoreResult<Vec<SessionSummary>>;
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn list(&self, session: &SessionId) -> StoreResult<Vec<ConversationTurn>> {
        (**self).list(session).await
    }

    async fn append(&self, session: &SessionId, turn: &ConversationTurn) -> StoreResult<()> {
        (**self).append(session, turn).await
    }

    async fn append_exchange(
        &self,
        session: &SessionId,
        user: &ConversationTurn,
        assistant: &ConversationTurn,
    ) -> StoreResult<()> {
        (**self).append_exchange(session, user, assistant).await
    }

    async fn delete(&self, session: &SessionId) -> StoreResult<()> {
        (**self).delete(session).await
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionSummary>> {
        (**self).list_sessions().await
    }
}
