//! Core coach types: configuration, errors and identifiers.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::{CoachConfig, ContextConfig, LlmConfig, StorageBackend, StorageConfig};
pub use errors::{CoachError, CoachResult, StoreError, StoreResult};
pub use ids::{ConversationId, SessionKey, UserId};
