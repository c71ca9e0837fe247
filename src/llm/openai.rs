//! OpenAI-compatible chat-completions gateway.
//!
//! Behaviour:
//! - One `POST {base_url}/chat/completions` per call, system + user messages.
//! - Structured calls set `response_format = {"type": "json_object"}` and parse the
//!   first choice as a JSON object.
//! - Non-success statuses surface as `GatewayError::HttpStatus`.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coach::core::config::LlmConfig;
use crate::llm::gateway::{
    ApiKey, GatewayError, GatewayFuture, GatewayResult, InferenceGateway, InferenceOutput,
    InferenceRequest,
};
use crate::llm::payload::parse_json_payload;

/// Connection timeout for the provider.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Gateway backed by an OpenAI-compatible HTTP API.
pub struct OpenAiGateway {
    client: Client,
    base_url: String,
    model: String,
}

impl OpenAiGateway {
    /// Create a gateway from the completion model config.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl InferenceGateway for OpenAiGateway {
    fn infer<'a>(
        &'a self,
        api_key: &'a ApiKey,
        request: InferenceRequest,
    ) -> GatewayFuture<'a, GatewayResult<InferenceOutput>> {
        Box::pin(async move {
            let body = build_chat_request(&self.model, &request);
            let url = format!("{}/chat/completions", self.base_url);
            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key.expose())
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::HttpStatus(status.as_u16()));
            }

            let payload = response.json::<ChatResponse>().await?;
            let content = first_content(payload)?;
            debug!(
                "Inference answered with {} chars (json={})",
                content.len(),
                request.require_structured_json
            );

            if request.require_structured_json {
                parse_json_payload(&content).map(InferenceOutput::Json)
            } else {
                Ok(InferenceOutput::Text(content))
            }
        })
    }
}

fn build_chat_request<'a>(model: &'a str, request: &'a InferenceRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: [
            ChatMessage {
                role: "system",
                content: &request.system_instruction,
            },
            ChatMessage {
                role: "user",
                content: &request.user_prompt,
            },
        ],
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
        response_format: request
            .require_structured_json
            .then_some(ResponseFormat { kind: "json_object" }),
    }
}

fn first_content(payload: ChatResponse) -> GatewayResult<String> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(GatewayError::EmptyOutput)
}
