//! Configuration for the coach subsystem.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::coach::core::errors::{CoachError, CoachResult};
use crate::llm::gateway::ApiKey;

/// Environment variable holding the provider credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the completion model.
pub const MODEL_ENV: &str = "DIETDRAFT_MODEL";
/// Environment variable overriding the provider base URL.
pub const BASE_URL_ENV: &str = "DIETDRAFT_LLM_BASE_URL";
/// Environment variable overriding the per-call timeout in seconds.
pub const TIMEOUT_ENV: &str = "DIETDRAFT_LLM_TIMEOUT_SECS";
/// Environment variable selecting the conversation store backend.
pub const STORAGE_ENV: &str = "DIETDRAFT_STORAGE";
/// Environment variable overriding the `SQLite` path.
pub const SQLITE_PATH_ENV: &str = "DIETDRAFT_SQLITE_PATH";

/// Top-level configuration for the diet coach.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Completion model settings.
    pub llm: LlmConfig,
    /// Context window settings.
    pub context: ContextConfig,
    /// Conversation storage settings.
    pub storage: StorageConfig,
}

impl CoachConfig {
    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> CoachResult<()> {
        if self.llm.model.trim().is_empty() {
            return Err(CoachError::InvalidConfig(
                "llm.model must not be empty".to_string(),
            ));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(CoachError::InvalidConfig(
                "llm.request_timeout_secs must be > 0".to_string(),
            ));
        }

        Url::parse(&self.llm.base_url)?;

        if self.context.classifier_turn_chars == 0 || self.context.synthesis_turn_chars == 0 {
            return Err(CoachError::InvalidConfig(
                "context turn character budgets must be > 0".to_string(),
            ));
        }

        let widest = self
            .context
            .classifier_window
            .max(self.context.synthesis_window);
        if self.context.history_limit < widest {
            return Err(CoachError::InvalidConfig(format!(
                "context.history_limit must be >= {widest}"
            )));
        }

        if matches!(self.storage.backend, StorageBackend::Sqlite)
            && self.storage.transcript_table.trim().is_empty()
        {
            return Err(CoachError::InvalidConfig(
                "storage.transcript_table must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparsable value.
    pub fn from_env() -> CoachResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> CoachResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.llm.api_key = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty());
        if let Some(model) = lookup(MODEL_ENV) {
            config.llm.model = model;
        }
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.llm.base_url = base_url;
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            config.llm.request_timeout_secs = timeout.trim().parse().map_err(|_| {
                CoachError::InvalidConfig(format!("{TIMEOUT_ENV} must be an integer, got {timeout}"))
            })?;
        }
        if let Some(backend) = lookup(STORAGE_ENV) {
            config.storage.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "sqlite" => StorageBackend::Sqlite,
                other => {
                    return Err(CoachError::InvalidConfig(format!(
                        "{STORAGE_ENV} must be `memory` or `sqlite`, got {other}"
                    )));
                }
            };
        }
        if let Some(path) = lookup(SQLITE_PATH_ENV) {
            config.storage.sqlite_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Pick the request credential, falling back to the configured one.
    #[must_use]
    pub fn resolve_api_key(&self, supplied: Option<&str>) -> Option<ApiKey> {
        supplied
            .and_then(ApiKey::new)
            .or_else(|| self.llm.api_key.as_deref().and_then(ApiKey::new))
    }
}

/// Completion model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Completion model name.
    pub model: String,
    /// Provider base URL (OpenAI-compatible).
    pub base_url: String,
    /// Default credential when requests do not carry one.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Per-call timeout in seconds.
    pub request_timeout_secs: u64,
}

impl LlmConfig {
    /// Per-call timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

/// Context window settings for classification and synthesis prompts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Prior turns shown to the intent classifier.
    pub classifier_window: usize,
    /// Character budget per turn in the classifier prompt.
    pub classifier_turn_chars: usize,
    /// Prior turns shown to the response synthesizer.
    pub synthesis_window: usize,
    /// Character budget per turn in the synthesis prompt.
    pub synthesis_turn_chars: usize,
    /// Ingredients listed in the meal digest.
    pub digest_ingredients: usize,
    /// Alternatives listed per substituted ingredient.
    pub digest_alternatives: usize,
    /// Character budget for the nutritional-benefit digest.
    pub digest_benefit_chars: usize,
    /// Most recent turns loaded from the store per request.
    pub history_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            classifier_window: 6,
            classifier_turn_chars: 150,
            synthesis_window: 4,
            synthesis_turn_chars: 100,
            digest_ingredients: 8,
            digest_alternatives: 3,
            digest_benefit_chars: 200,
            history_limit: 20,
        }
    }
}

/// Conversation store backend selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-lifetime in-memory transcripts.
    #[default]
    Memory,
    /// `SQLite`-backed transcripts.
    Sqlite,
}

/// Storage configuration for transcripts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use.
    pub backend: StorageBackend,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Transcript table name.
    pub transcript_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            sqlite_path: PathBuf::from("dietdraft.sqlite"),
            transcript_table: "coach_transcript".to_string(),
        }
    }
}
