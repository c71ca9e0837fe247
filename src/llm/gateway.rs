//! Gateway abstraction over the language-inference provider.
//!
//! Every inference call in the crate goes through [`InferenceHandle`], which binds a
//! gateway implementation to the caller's credential and a per-call timeout. A timeout
//! is reported as an ordinary [`GatewayError`] so callers can degrade gracefully.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::llm::payload::parse_json_payload;

/// Boxed future type for gateway operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors produced by an inference gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP response was not a success.
    #[error("inference http status not ok: {0}")]
    HttpStatus(u16),
    /// HTTP client error.
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The call did not finish within the configured timeout.
    #[error("inference call timed out after {0:?}")]
    Timeout(Duration),
    /// The provider answered with content that is not the expected structure.
    #[error("malformed inference output: {0}")]
    Malformed(String),
    /// The provider answered without any content.
    #[error("inference returned no content")]
    EmptyOutput,
}

/// Convenience result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Credential for the inference provider. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a credential, rejecting blank values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the raw secret for the outgoing request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Fixed request shape sent to the provider.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceRequest {
    /// System-role instruction.
    pub system_instruction: String,
    /// User-role prompt.
    pub user_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output length limit in tokens.
    pub max_output_tokens: u32,
    /// Whether the provider must answer with a single JSON object.
    pub require_structured_json: bool,
}

impl InferenceRequest {
    /// Build a request that must come back as a JSON object.
    #[must_use]
    pub fn json(system_instruction: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.7,
            max_output_tokens: 500,
            require_structured_json: true,
        }
    }

    /// Build a free-text request.
    #[must_use]
    pub fn text(system_instruction: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            require_structured_json: false,
            ..Self::json(system_instruction, user_prompt)
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token limit.
    #[must_use]
    pub const fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Provider answer.
#[derive(Clone, Debug, PartialEq)]
pub enum InferenceOutput {
    /// Parsed JSON object (structured mode).
    Json(Value),
    /// Raw text (free-text mode).
    Text(String),
}

impl InferenceOutput {
    /// Interpret the output as a JSON object.
    ///
    /// # Errors
    /// Returns an error if text output does not contain a JSON object.
    pub fn into_json(self) -> GatewayResult<Value> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => parse_json_payload(&text),
        }
    }

    /// Interpret the output as text.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Abstraction over a language-inference provider.
pub trait InferenceGateway: Send + Sync {
    /// Run one inference call.
    ///
    /// # Errors
    /// Returns an error if the provider fails or answers with unusable content.
    fn infer<'a>(
        &'a self,
        api_key: &'a ApiKey,
        request: InferenceRequest,
    ) -> GatewayFuture<'a, GatewayResult<InferenceOutput>>;
}

/// A gateway bound to one credential and a per-call timeout.
#[derive(Clone, Copy)]
pub struct InferenceHandle<'a> {
    gateway: &'a dyn InferenceGateway,
    api_key: &'a ApiKey,
    timeout: Duration,
}

impl<'a> InferenceHandle<'a> {
    /// Bind a gateway to a credential.
    #[must_use]
    pub const fn new(
        gateway: &'a dyn InferenceGateway,
        api_key: &'a ApiKey,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            api_key,
            timeout,
        }
    }

    /// Run a call, mapping an elapsed timeout to `GatewayError::Timeout`.
    ///
    /// # Errors
    /// Returns an error if the gateway fails or the timeout elapses.
    pub async fn complete(&self, request: InferenceRequest) -> GatewayResult<InferenceOutput> {
        tokio::time::timeout(self.timeout, self.gateway.infer(self.api_key, request))
            .await
            .unwrap_or(Err(GatewayError::Timeout(self.timeout)))
    }

    /// Run a structured call and decode it into `T`.
    ///
    /// # Errors
    /// Returns an error if the call fails or the payload does not match `T`.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        request: InferenceRequest,
    ) -> GatewayResult<T> {
        let value = self.complete(request).await?.into_json()?;
        serde_json::from_value(value).map_err(|err| GatewayError::Malformed(err.to_string()))
    }

    /// Run a free-text call, rejecting blank answers.
    ///
    /// # Errors
    /// Returns an error if the call fails or the answer is blank.
    pub async fn complete_text(&self, request: InferenceRequest) -> GatewayResult<String> {
        let text = self.complete(request).await?.into_text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::EmptyOutput);
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;

    fn key() -> ApiKey {
        ApiKey::new("sk-test").expect("non-blank key")
    }

    #[test]
    fn test_api_key_rejects_blank_and_redacts() {
        assert!(ApiKey::new("   ").is_none());
        let key = key();
        assert_eq!(key.expose(), "sk-test");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }

    #[test]
    fn test_request_builders() {
        let request = InferenceRequest::text("sys", "user")
            .with_temperature(0.3)
            .with_max_output_tokens(42);
        assert!(!request.require_structured_json);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.max_output_tokens, 42);
        assert!(InferenceRequest::json("sys", "user").require_structured_json);
    }

    #[tokio::test]
    async fn test_complete_json_decodes_text_output() {
        let gateway = ScriptedGateway::new(|_| {
            Ok(InferenceOutput::Text("```json\n{\"value\": 7}\n```".to_string()))
        });
        let key = key();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));

        #[derive(serde::Deserialize)]
        struct Payload {
            value: u32,
        }

        let payload: Payload = handle
            .complete_json(InferenceRequest::json("sys", "user"))
            .await
            .unwrap();
        assert_eq!(payload.value, 7);
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_text_rejects_blank() {
        let gateway = ScriptedGateway::new(|_| Ok(InferenceOutput::Text("  \n".to_string())));
        let key = key();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));

        let result = handle.complete_text(InferenceRequest::text("sys", "user")).await;
        assert!(matches!(result, Err(GatewayError::EmptyOutput)));
    }

    #[tokio::test]
    async fn test_timeout_is_a_gateway_error() {
        let gateway = ScriptedGateway::new(|_| Ok(InferenceOutput::Text("late".to_string())))
            .with_delay(Duration::from_millis(200));
        let key = key();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_millis(10));

        let result = handle.complete(InferenceRequest::text("sys", "user")).await;
        assert!(matches!(result, Err(GatewayError::Timeout(_))));
    }
}
