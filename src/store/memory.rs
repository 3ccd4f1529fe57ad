//! Volatile in-memory store

use super::{ConversationStore, ConversationTurn, SessionId, SessionSummary, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct StoredTurn {
    turn: ConversationTurn,
    created_at: DateTime<Utc>,
}

/// Process-local store. Contents are lost on exit.
#[derive(Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, Vec<StoredTurn>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<SessionId, Vec<StoredTurn>>>> {
        self.sessions.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<SessionId, Vec<StoredTurn>>>> {
        self.sessions.write().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn list(&self, session: &SessionId) -> StoreResult<Vec<ConversationTurn>> {
        let sessions = self.read()?;
        Ok(sessions
            .get(session)
            .map(|turns| turns.iter().map(|s| s.turn.clone()).collect())
            .unwrap_or_default())
    }

    async fn append(&self, session: &SessionId, turn: &ConversationTurn) -> StoreResult<()> {
        let stored = StoredTurn {
            turn: turn.clone(),
            created_at: Utc::now(),
        };
        self.write()?.entry(session.clone()).or_default().push(stored);
        Ok(())
    }

    async fn append_exchange(
        &self,
        session: &SessionId,
        user: &ConversationTurn,
        assistant: &ConversationTurn,
    ) -> StoreResult<()> {
        let created_at = Utc::now();
        let mut sessions = self.write()?;
        let turns = sessions.entry(session.clone()).or_default();
        turns.push(StoredTurn {
            turn: user.clone(),
            created_at,
        });
        turns.push(StoredTurn {
            turn: assistant.clone(),
            created_at,
        });
        Ok(())
    }

    async fn delete(&self, session: &SessionId) -> StoreResult<()> {
        self.write()?.remove(session);
        Ok(())
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionSummary>> {
        let sessions = self.read()?;
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .filter_map(|(id, turns)| {
                turns.last().map(|last| SessionSummary {
                    session_id: id.clone(),
                    turn_count: turns.len(),
                    last_activity: last.created_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(summaries)
    }
}
