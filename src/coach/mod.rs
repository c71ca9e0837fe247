//! Diet-coach orchestration.
//!
//! - `core`: configuration, errors, identifiers
//! - `store`: conversation transcripts and per-session locking
//! - `intent` / `classifier`: message → intent record
//! - `dispatcher` / `results`: intent record → tool result bundle
//! - `synthesizer`: results + context → reply text
//! - `orchestrator`: the request state machine tying it together

pub mod classifier;
pub mod context;
pub mod core;
pub mod dispatcher;
pub mod intent;
pub mod orchestrator;
pub mod results;
pub mod store;
pub mod synthesizer;

pub use classifier::IntentClassifier;
pub use core::{CoachConfig, CoachError, CoachResult};
pub use dispatcher::ToolDispatcher;
pub use intent::{ExtractedInfo, Intent, IntentRecord, SubstitutionNeed, ToolName};
pub use orchestrator::{CoachBackends, CoachReply, CoachRequest, DietCoach};
pub use results::{ToolOutcome, ToolResults};
pub use store::{ConversationStore, InMemoryConversationStore, SqliteConversationStore};
pub use synthesizer::{FALLBACK_REPLY, ResponseSynthesizer};
