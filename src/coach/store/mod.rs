//! Conversation storage.
//!
//! The orchestrator talks to transcripts only through [`ConversationStore`]:
//! lock a session key, read its recent turns, append new ones while holding the lock.
//! A full request/reply exchange is written in one step so a cancelled request never
//! leaves a lone user turn behind.

pub mod locks;
pub mod memory;
pub mod sqlite;
pub mod turn;

use std::future::Future;
use std::pin::Pin;

use crate::coach::core::errors::StoreResult;
use crate::coach::core::ids::SessionKey;

pub use locks::{SessionGuard, SessionLocks};
pub use memory::InMemoryConversationStore;
pub use sqlite::SqliteConversationStore;
pub use turn::{Turn, TurnRole};

/// Boxed future type for conversation store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Keyed transcript storage.
pub trait ConversationStore: Send + Sync {
    /// Wait for exclusive write access to one session's transcript.
    fn lock<'a>(&'a self, key: &'a SessionKey) -> StoreFuture<'a, SessionGuard>;

    /// Load the most recent `limit` turns of a session, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn load_recent<'a>(
        &'a self,
        key: &'a SessionKey,
        limit: usize,
    ) -> StoreFuture<'a, StoreResult<Vec<Turn>>>;

    /// Append one turn to the session held by `session`.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append<'a>(&'a self, session: &'a SessionGuard, turn: Turn)
    -> StoreFuture<'a, StoreResult<()>>;

    /// Append a user turn and the assistant reply to it as one unit.
    ///
    /// Either both turns are stored or neither is.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn append_exchange<'a>(
        &'a self,
        session: &'a SessionGuard,
        user: Turn,
        assistant: Turn,
    ) -> StoreFuture<'a, StoreResult<()>>;
}
