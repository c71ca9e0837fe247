//! Inference gateway components.
//!
//! - `gateway`: request shape, credential, gateway trait and timeout-bound handle
//! - `openai`: OpenAI-compatible chat-completions implementation
//! - `payload`: helpers for decoding untrusted model output

pub mod gateway;
pub mod openai;
pub mod payload;

pub use gateway::{
    ApiKey, GatewayError, GatewayFuture, GatewayResult, InferenceGateway, InferenceHandle,
    InferenceOutput, InferenceRequest,
};
pub use openai::OpenAiGateway;
pub use payload::{lenient_u32, nullable_list, parse_json_payload};
