//! Response synthesis.
//!
//! Builds one free-text inference call from three context blocks (recent turns, a
//! digest of successful tool results, soft notes about failed tools). Gateway failure
//! degrades to [`FALLBACK_REPLY`]; there is no retry.

use tracing::warn;

use crate::coach::context::{format_recent_turns, truncate_chars};
use crate::coach::core::config::ContextConfig;
use crate::coach::intent::IntentRecord;
use crate::coach::results::ToolResults;
use crate::coach::store::turn::Turn;
use crate::llm::gateway::{InferenceHandle, InferenceRequest};

/// Reply used when the coach cannot reach the inference provider.
pub const FALLBACK_REPLY: &str = "I'm here to help you with your nutrition goals! Could you tell me \
a bit more about what you're looking for today?";

/// System instruction for the coaching reply.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = "You are a professional diet coach who provides \
helpful, encouraging guidance about nutrition and meal planning. Be friendly, knowledgeable, and \
supportive.";

/// Turns tool results and conversation context into the coach's reply.
pub struct ResponseSynthesizer {
    window: usize,
    turn_chars: usize,
    digest_ingredients: usize,
    digest_alternatives: usize,
    digest_benefit_chars: usize,
}

impl ResponseSynthesizer {
    /// Create a synthesizer with the configured digest budgets.
    #[must_use]
    pub const fn new(context: &ContextConfig) -> Self {
        Self {
            window: context.synthesis_window,
            turn_chars: context.synthesis_turn_chars,
            digest_ingredients: context.digest_ingredients,
            digest_alternatives: context.digest_alternatives,
            digest_benefit_chars: context.digest_benefit_chars,
        }
    }

    /// Produce the reply text. Never fails.
    pub async fn synthesize(
        &self,
        inference: &InferenceHandle<'_>,
        message: &str,
        history: &[Turn],
        intent: &IntentRecord,
        results: &ToolResults,
    ) -> String {
        let request = self.build_request(message, history, intent, results);
        match inference.complete_text(request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "response synthesis failed, using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    /// Build the free-text inference request.
    #[must_use]
    pub fn build_request(
        &self,
        message: &str,
        history: &[Turn],
        intent: &IntentRecord,
        results: &ToolResults,
    ) -> InferenceRequest {
        let mut sections = Vec::new();

        let recent = format_recent_turns(history, self.window, self.turn_chars);
        if !recent.is_empty() {
            sections.push(format!("Previous conversation context:\n{recent}"));
        }
        if let Some(note) = &intent.context_understanding {
            sections.push(format!("How this message relates to the conversation: {note}"));
        }
        sections.push(format!("User's current message: \"{message}\""));

        let digest = self.results_block(results);
        if !digest.is_empty() {
            sections.push(digest);
        }
        let errors = error_block(results);
        if !errors.is_empty() {
            sections.push(errors);
        }

        let prompt = format!(
            "You are a friendly, knowledgeable diet coach. Respond to the user's message in a \
supportive and informative coaching style.

{}

As a diet coach, provide a helpful response that:
1. Acknowledges what the user asked for
2. Presents any generated recipes or substitutions clearly
3. Offers nutritional insights when relevant
4. Asks follow-up questions if more information would be helpful
5. Stays consistent with the previous conversation

Keep the response conversational but informative. If you generated a meal, present it in an \
organized way. If you found substitutions, explain why they work well.",
            sections.join("\n\n")
        );

        InferenceRequest::text(SYNTHESIZER_SYSTEM_PROMPT, prompt)
    }

    fn results_block(&self, results: &ToolResults) -> String {
        let mut lines = Vec::new();

        if let Some(meal) = results.meal() {
            lines.push(format!("Generated meal: {}", meal.meal_name));
            let ingredients: Vec<&str> = meal
                .ingredients
                .iter()
                .take(self.digest_ingredients)
                .map(String::as_str)
                .collect();
            lines.push(format!("Ingredients: {}", ingredients.join(", ")));
            if let Some(info) = &meal.dietary_info {
                lines.push(format!("Dietary info: {info}"));
            }
        }

        let found = results.found_substitutions();
        if !found.is_empty() {
            lines.push("Found substitutions:".to_string());
            for result in found {
                let alternatives: Vec<&str> = result
                    .substitutions
                    .iter()
                    .take(self.digest_alternatives)
                    .map(|alternative| alternative.ingredient.as_str())
                    .collect();
                lines.push(format!(
                    "- {} alternatives: {}",
                    result.original_ingredient,
                    alternatives.join(", ")
                ));
            }
        }

        if let Some(reasoning) = results.reasoning() {
            lines.push(format!(
                "Nutritional benefits: {}",
                truncate_chars(
                    &reasoning.reasoning.nutritional_benefits,
                    self.digest_benefit_chars
                )
            ));
        }

        lines.join("\n")
    }
}

fn error_block(results: &ToolResults) -> String {
    results
        .failure_labels()
        .iter()
        .map(|label| format!("Note: had trouble with {label}."))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::coach::intent::{ExtractedInfo, Intent, ToolName};
    use crate::coach::results::{FailedLookup, SubstitutionBatch, ToolOutcome};
    use crate::llm::gateway::{ApiKey, InferenceOutput};
    use crate::testing::ScriptedGateway;
    use crate::tools::{
        Meal, MealReasoning, ReasoningHighlights, Substitute, SubstitutionResult,
    };

    fn intent() -> IntentRecord {
        IntentRecord {
            intent: Intent::GenerateRecipe,
            tools_needed: vec![ToolName::GenerateMeal],
            extracted_info: ExtractedInfo::default(),
            confidence: 0.9,
            context_understanding: None,
        }
    }

    fn full_results() -> ToolResults {
        let mut results = ToolResults::default();
        results.meal = Some(ToolOutcome::Succeeded(Meal {
            meal_name: "Lemon Chicken".to_string(),
            ingredients: (1..=10).map(|i| format!("ingredient{i}")).collect(),
            instructions: "Roast.".to_string(),
            estimated_calories: None,
            dietary_info: Some("High protein".to_string()),
        }));
        results.substitutions = Some(SubstitutionBatch {
            found: vec![SubstitutionResult {
                original_ingredient: "butter".to_string(),
                reason: "vegan".to_string(),
                substitutions: ["olive oil", "coconut oil", "avocado", "applesauce"]
                    .iter()
                    .map(|name| Substitute {
                        ingredient: (*name).to_string(),
                        notes: String::new(),
                    })
                    .collect(),
            }],
            failures: vec![FailedLookup {
                ingredient: "cream".to_string(),
                error: "inference http status not ok: 500".to_string(),
            }],
        });
        results.reasoning = Some(ToolOutcome::Succeeded(MealReasoning {
            meal_name: "Lemon Chicken".to_string(),
            reasoning: ReasoningHighlights {
                nutritional_benefits: "x".repeat(300),
                ..ReasoningHighlights::default()
            },
        }));
        results.record_success(ToolName::GenerateMeal);
        results
    }

    #[tokio::test]
    async fn test_gateway_failure_returns_fixed_reply() {
        let synthesizer = ResponseSynthesizer::new(&ContextConfig::default());
        let gateway = ScriptedGateway::failing();
        let key = ApiKey::new("sk-test").unwrap();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));

        for message in ["", "make me dinner", "🍕🍕🍕"] {
            let reply = synthesizer
                .synthesize(&handle, message, &[], &intent(), &full_results())
                .await;
            assert_eq!(reply, FALLBACK_REPLY);
        }
    }

    #[tokio::test]
    async fn test_blank_reply_falls_back() {
        let synthesizer = ResponseSynthesizer::new(&ContextConfig::default());
        let gateway = ScriptedGateway::new(|_| Ok(InferenceOutput::Text(String::new())));
        let key = ApiKey::new("sk-test").unwrap();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));

        let reply = synthesizer
            .synthesize(&handle, "hi", &[], &intent(), &ToolResults::default())
            .await;
        assert_eq!(reply, FALLBACK_REPLY);
        assert!(!gateway.calls()[0].require_structured_json);
    }

    #[test]
    fn test_digest_respects_budgets() {
        let synthesizer = ResponseSynthesizer::new(&ContextConfig::default());
        let request = synthesizer.build_request("dinner?", &[], &intent(), &full_results());
        let prompt = request.user_prompt;

        assert!(prompt.contains("Generated meal: Lemon Chicken"));
        assert!(prompt.contains("ingredient8"));
        assert!(!prompt.contains("ingredient9"));
        assert!(prompt.contains("Dietary info: High protein"));
        assert!(prompt.contains("- butter alternatives: olive oil, coconut oil, avocado\n"));
        assert!(!prompt.contains("applesauce"));
        assert!(prompt.contains("\nFound substitutions:\n- butter alternatives:"));
        assert!(prompt.contains(&format!("Nutritional benefits: {}...", "x".repeat(200))));
        assert!(prompt.contains("Note: had trouble with substitutes for cream."));
        assert!(!prompt.contains("status not ok"));
        assert!(!prompt.contains("Previous conversation context"));
    }

    #[test]
    fn test_context_block_includes_previous_turn() {
        let synthesizer = ResponseSynthesizer::new(&ContextConfig::default());
        let history = vec![
            Turn::user("I want chicken for dinner"),
            Turn::assistant("Try my Lemon Chicken with roasted peppers"),
        ];
        let mut record = intent();
        record.context_understanding = Some("Wants the previous dish spicier".to_string());

        let request =
            synthesizer.build_request("make it spicier", &history, &record, &ToolResults::default());
        assert!(request.user_prompt.contains(
            "Previous conversation context:\nUser: I want chicken for dinner\nDiet Coach: Try my Lemon Chicken"
        ));
        assert!(request.user_prompt.contains("Wants the previous dish spicier"));
    }
}
