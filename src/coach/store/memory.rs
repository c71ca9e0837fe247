//! Process-lifetime transcript store.
//!
//! Transcripts are never evicted and are lost on restart.

use dashmap::DashMap;

use crate::coach::core::errors::StoreResult;
use crate::coach::core::ids::SessionKey;
use crate::coach::store::locks::{SessionGuard, SessionLocks};
use crate::coach::store::turn::Turn;
use crate::coach::store::{ConversationStore, StoreFuture};

/// In-memory implementation of transcript storage.
#[derive(Default)]
pub struct InMemoryConversationStore {
    transcripts: DashMap<SessionKey, Vec<Turn>>,
    locks: SessionLocks,
}

impl InMemoryConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one turn.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.transcripts.len()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn lock<'a>(&'a self, key: &'a SessionKey) -> StoreFuture<'a, SessionGuard> {
        Box::pin(self.locks.acquire(key))
    }

    fn load_recent<'a>(
        &'a self,
        key: &'a SessionKey,
        limit: usize,
    ) -> StoreFuture<'a, StoreResult<Vec<Turn>>> {
        Box::pin(async move {
            let turns = self
                .transcripts
                .get(key)
                .map(|transcript| {
                    let skip = transcript.len().saturating_sub(limit);
                    transcript[skip..].to_vec()
                })
                .unwrap_or_default();
            Ok(turns)
        })
    }

    fn append<'a>(
        &'a self,
        session: &'a SessionGuard,
        turn: Turn,
    ) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.transcripts
                .entry(session.key().clone())
                .or_default()
                .push(turn);
            Ok(())
        })
    }

    fn append_exchange<'a>(
        &'a self,
        session: &'a SessionGuard,
        user: Turn,
        assistant: Turn,
    ) -> StoreFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.transcripts
                .entry(session.key().clone())
                .or_default()
                .extend([user, assistant]);
            Ok(())
        })
    }
}
