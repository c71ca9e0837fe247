//! Intent classification.
//!
//! One structured inference call per message. Any gateway failure or answer that does
//! not validate as an [`IntentRecord`] degrades to a keyword heuristic, so
//! classification itself never fails.

use regex::Regex;
use tracing::{debug, warn};

use crate::coach::context::format_recent_turns;
use crate::coach::core::config::ContextConfig;
use crate::coach::intent::{ExtractedInfo, Intent, IntentRecord, ToolName};
use crate::coach::store::turn::Turn;
use crate::llm::gateway::{InferenceHandle, InferenceOutput, InferenceRequest};

/// System instruction for intent analysis.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = "You are an intent analysis system for a diet coach. \
Always respond with valid JSON. Only extract information explicitly mentioned by the user.";

/// Confidence reported by the heuristic fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

const CLASSIFIER_TEMPERATURE: f32 = 0.3;
const CLASSIFIER_MAX_TOKENS: u32 = 400;

/// Classifies user messages into intent records.
pub struct IntentClassifier {
    recipe_keywords: Regex,
    window: usize,
    turn_chars: usize,
}

impl IntentClassifier {
    /// Create a classifier with the configured history window.
    ///
    /// # Errors
    /// Returns an error if the keyword pattern is invalid.
    pub fn new(context: &ContextConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            recipe_keywords: Regex::new(r"(?i)(make|recipe|cook|meal)")?,
            window: context.classifier_window,
            turn_chars: context.classifier_turn_chars,
        })
    }

    /// Classify `message` given the turns that preceded it.
    pub async fn classify(
        &self,
        inference: &InferenceHandle<'_>,
        message: &str,
        history: &[Turn],
    ) -> IntentRecord {
        let request = self.build_request(message, history);
        let value = match inference.complete(request).await.and_then(InferenceOutput::into_json) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "intent analysis failed, using keyword fallback");
                return self.fallback(message, history);
            }
        };

        match IntentRecord::from_value(value) {
            Ok(record) => {
                debug!(
                    intent = %record.intent,
                    tools = record.tools_needed.len(),
                    confidence = record.confidence,
                    "intent classified"
                );
                record
            }
            Err(err) => {
                warn!(error = %err, "intent record rejected, using keyword fallback");
                self.fallback(message, history)
            }
        }
    }

    /// Deterministic classification used when inference is unavailable.
    #[must_use]
    pub fn fallback(&self, message: &str, history: &[Turn]) -> IntentRecord {
        let intent = if self.recipe_keywords.is_match(message) {
            if history.len() > 2 {
                Intent::FollowUp
            } else {
                Intent::GenerateRecipe
            }
        } else {
            Intent::GeneralQuestion
        };

        IntentRecord {
            intent,
            tools_needed: vec![ToolName::GenerateMeal],
            extracted_info: ExtractedInfo::default(),
            confidence: FALLBACK_CONFIDENCE,
            context_understanding: None,
        }
    }

    /// Build the structured inference request for `message`.
    #[must_use]
    pub fn build_request(&self, message: &str, history: &[Turn]) -> InferenceRequest {
        let recent = format_recent_turns(history, self.window, self.turn_chars);
        let history_block = if recent.is_empty() {
            "This is the first message of the conversation.".to_string()
        } else {
            format!("Previous conversation:\n{recent}")
        };

        let prompt = format!(
            r#"Analyze this user message and extract information.

{history_block}

Current message: "{message}"

Extract and determine:
1. Primary intent (what do they want?)
2. Any specific ingredients mentioned
3. Any dietary preferences mentioned
4. Any substitution needs
5. Whether the message refers to something said earlier in the conversation
6. What tools should be used to help them

Available tools:
- generate_meal: Create a new recipe
- find_substitutions: Find ingredient alternatives
- meal_reasoning: Analyze nutritional aspects of a generated meal

Respond with JSON:
{{
    "intent": "generate_recipe" | "find_substitutions" | "analyze_nutrition" | "general_question" | "follow_up",
    "tools_needed": ["generate_meal"],
    "extracted_info": {{
        "ingredients": ["chicken", "broccoli"],
        "dietary_preferences": ["high-protein", "low-carb"],
        "substitution_requests": [{{"ingredient": "butter", "reason": "dairy-free"}}],
        "meal_type": "dinner",
        "allergies": ["nuts"],
        "references_previous": false
    }},
    "confidence": 0.8,
    "context_understanding": "How this message relates to the previous conversation, if it does"
}}

Only include information that is explicitly mentioned in the message or the conversation."#
        );

        InferenceRequest::json(CLASSIFIER_SYSTEM_PROMPT, prompt)
            .with_temperature(CLASSIFIER_TEMPERATURE)
            .with_max_output_tokens(CLASSIFIER_MAX_TOKENS)
    }
}
