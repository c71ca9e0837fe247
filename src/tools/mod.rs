//! Single-shot capability tools.
//!
//! - `meal`: recipe generation
//! - `substitution`: ingredient alternatives
//! - `reasoning`: nutritional explanation of a meal
//! - `voice`: voice transcript to structured meal request
//!
//! Each tool makes exactly one inference call and keeps no state. The coach reaches
//! them through the [`Toolbox`] trait so tests and alternative backends can swap the
//! implementation.

pub mod meal;
pub mod reasoning;
pub mod substitution;
pub mod voice;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::llm::gateway::{GatewayError, InferenceHandle};

pub use meal::{Meal, MealRequest};
pub use reasoning::{MealReasoning, ReasoningHighlights, ReasoningRequest};
pub use substitution::{Substitute, SubstitutionRequest, SubstitutionResult};
pub use voice::VoiceParse;

/// Errors produced by capability tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The inference call failed or answered with unusable content.
    #[error("failed to {action}: {source}")]
    Inference {
        /// What the tool was doing.
        action: &'static str,
        /// Underlying gateway failure.
        #[source]
        source: GatewayError,
    },
    /// The tool input is out of range.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ToolError {
    pub(crate) fn inference(action: &'static str) -> impl Fn(GatewayError) -> Self {
        move |source| Self::Inference { action, source }
    }
}

/// Convenience result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Boxed future type for tool operations.
pub type ToolFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The set of capability tools available to the coach and the HTTP surface.
pub trait Toolbox: Send + Sync {
    /// Generate a recipe.
    fn generate_meal<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        request: MealRequest,
    ) -> ToolFuture<'a, ToolResult<Meal>>;

    /// Find alternatives for one ingredient.
    fn find_substitutions<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        request: SubstitutionRequest,
    ) -> ToolFuture<'a, ToolResult<SubstitutionResult>>;

    /// Explain the nutritional choices behind a meal.
    fn explain_meal<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        request: ReasoningRequest,
    ) -> ToolFuture<'a, ToolResult<MealReasoning>>;

    /// Turn a voice transcript into a structured meal request.
    fn parse_voice<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        voice_text: String,
    ) -> ToolFuture<'a, ToolResult<VoiceParse>>;
}

/// Toolbox backed by the inference gateway.
#[derive(Clone, Copy, Debug, Default)]
pub struct LlmToolbox;

impl Toolbox for LlmToolbox {
    fn generate_meal<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        request: MealRequest,
    ) -> ToolFuture<'a, ToolResult<Meal>> {
        Box::pin(async move { meal::generate_meal(&inference, &request).await })
    }

    fn find_substitutions<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        request: SubstitutionRequest,
    ) -> ToolFuture<'a, ToolResult<SubstitutionResult>> {
        Box::pin(async move { substitution::find_substitutions(&inference, &request).await })
    }

    fn explain_meal<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        request: ReasoningRequest,
    ) -> ToolFuture<'a, ToolResult<MealReasoning>> {
        Box::pin(async move { reasoning::explain_meal(&inference, &request).await })
    }

    fn parse_voice<'a>(
        &'a self,
        inference: InferenceHandle<'a>,
        voice_text: String,
    ) -> ToolFuture<'a, ToolResult<VoiceParse>> {
        Box::pin(async move { voice::parse_voice(&inference, &voice_text).await })
    }
}
