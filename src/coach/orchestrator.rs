//! Session orchestration: the coach's entry point.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::coach::classifier::IntentClassifier;
use crate::coach::core::config::{CoachConfig, StorageBackend};
use crate::coach::core::errors::{CoachError, CoachResult};
use crate::coach::core::ids::{ConversationId, SessionKey, UserId};
use crate::coach::dispatcher::ToolDispatcher;
use crate::coach::intent::{Intent, ToolName};
use crate::coach::results::ToolResults;
use crate::coach::store::turn::Turn;
use crate::coach::store::{ConversationStore, InMemoryConversationStore, SqliteConversationStore};
use crate::coach::synthesizer::ResponseSynthesizer;
use crate::llm::gateway::{ApiKey, InferenceGateway, InferenceHandle};
use crate::llm::openai::OpenAiGateway;
use crate::tools::{LlmToolbox, Toolbox};

/// Incoming coach message.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CoachRequest {
    /// User message; must not be blank.
    pub message: String,
    /// Conversation to resume.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// User the conversation belongs to.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Credential overriding the configured one.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Coach answer.
#[derive(Clone, Debug, Serialize)]
pub struct CoachReply {
    /// Reply text.
    pub response: String,
    /// Intent the message was classified as.
    pub action_taken: Intent,
    /// Tools that completed successfully.
    pub tools_used: Vec<ToolName>,
    /// Conversation identifier to send back next time.
    pub conversation_id: ConversationId,
    /// User identifier to send back next time.
    pub user_id: UserId,
    /// Tool outputs and soft errors.
    pub data: ToolResults,
}

/// External collaborators of the coach.
#[derive(Clone)]
pub struct CoachBackends {
    /// Inference provider.
    pub gateway: Arc<dyn InferenceGateway>,
    /// Capability tools.
    pub toolbox: Arc<dyn Toolbox>,
    /// Transcript storage.
    pub store: Arc<dyn ConversationStore>,
}

impl CoachBackends {
    /// Build the production collaborators described by `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or the `SQLite` store cannot be created.
    pub async fn from_config(config: &CoachConfig) -> CoachResult<Self> {
        let store: Arc<dyn ConversationStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryConversationStore::new()),
            StorageBackend::Sqlite => Arc::new(SqliteConversationStore::new(&config.storage).await?),
        };
        Ok(Self {
            gateway: Arc::new(OpenAiGateway::new(&config.llm)?),
            toolbox: Arc::new(LlmToolbox),
            store,
        })
    }
}

/// The diet coach: classify, dispatch, synthesize, remember.
pub struct DietCoach {
    config: CoachConfig,
    classifier: IntentClassifier,
    synthesizer: ResponseSynthesizer,
    backends: CoachBackends,
}

impl DietCoach {
    /// Assemble a coach from validated configuration and collaborators.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: CoachConfig, backends: CoachBackends) -> CoachResult<Self> {
        config.validate()?;
        Ok(Self {
            classifier: IntentClassifier::new(&config.context)?,
            synthesizer: ResponseSynthesizer::new(&config.context),
            config,
            backends,
        })
    }

    /// Assemble a coach with the production collaborators.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a backend cannot start.
    pub async fn from_config(config: CoachConfig) -> CoachResult<Self> {
        config.validate()?;
        let backends = CoachBackends::from_config(&config).await?;
        Self::new(config, backends)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// Capability tools, for callers that invoke one directly.
    #[must_use]
    pub fn toolbox(&self) -> &dyn Toolbox {
        self.backends.toolbox.as_ref()
    }

    /// Pick the request credential or the configured one.
    ///
    /// # Errors
    /// Returns `CoachError::MissingCredential` when neither is available.
    pub fn resolve_api_key(&self, supplied: Option<&str>) -> CoachResult<ApiKey> {
        self.config
            .resolve_api_key(supplied)
            .ok_or(CoachError::MissingCredential)
    }

    /// Bind the gateway to `api_key` with the configured timeout.
    #[must_use]
    pub fn inference<'a>(&'a self, api_key: &'a ApiKey) -> InferenceHandle<'a> {
        InferenceHandle::new(
            self.backends.gateway.as_ref(),
            api_key,
            self.config.llm.request_timeout(),
        )
    }

    /// Handle one coach message end to end.
    ///
    /// The session stays locked from the first read to the final write, so requests
    /// on the same key never interleave their turns. The user turn is held until the
    /// reply exists and both are stored together, so a request dropped mid-flight
    /// leaves the transcript as it was.
    ///
    /// # Errors
    /// Returns an error on a blank message, a missing credential or a store failure.
    /// Inference failures degrade instead of failing.
    pub async fn handle(&self, request: CoachRequest) -> CoachResult<CoachReply> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(CoachError::EmptyMessage);
        }
        let api_key = self.resolve_api_key(request.api_key.as_deref())?;
        let key = SessionKey::resolve(
            request.user_id.as_deref(),
            request.conversation_id.as_deref(),
        );

        let store = self.backends.store.as_ref();
        let session = store.lock(&key).await;
        let history = store
            .load_recent(&key, self.config.context.history_limit)
            .await?;
        let user_turn = Turn::user(message);
        debug!(session = %key, prior_turns = history.len(), "session history loaded");

        let inference = self.inference(&api_key);
        let intent = self.classifier.classify(&inference, message, &history).await;
        let results = ToolDispatcher::new(self.toolbox(), inference)
            .dispatch(&intent)
            .await;
        let response = self
            .synthesizer
            .synthesize(&inference, message, &history, &intent, &results)
            .await;

        store
            .append_exchange(&session, user_turn, Turn::assistant(response.clone()))
            .await?;
        drop(session);

        info!(
            session = %key,
            intent = %intent.intent,
            confidence = intent.confidence,
            tools_used = results.tools_used().len(),
            "coach request handled"
        );

        Ok(CoachReply {
            response,
            action_taken: intent.intent,
            tools_used: results.tools_used().to_vec(),
            conversation_id: key.conversation_id,
            user_id: key.user_id,
            data: results,
        })
    }
}
