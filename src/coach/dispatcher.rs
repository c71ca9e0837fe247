//! Tool dispatch.
//!
//! Runs the tools an intent record asks for in a fixed order: substitutions, then the
//! meal, then reasoning over that meal. Every tool is guarded on its own; a failure is
//! recorded in the bundle and never stops the remaining tools.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::coach::intent::{ExtractedInfo, IntentRecord, SubstitutionNeed, ToolName};
use crate::coach::results::{FailedLookup, SubstitutionBatch, ToolOutcome, ToolResults};
use crate::llm::gateway::InferenceHandle;
use crate::tools::meal::MAX_INCLUDED_INGREDIENTS;
use crate::tools::{MealRequest, ReasoningRequest, SubstitutionRequest, Toolbox};

/// Reason used when the user asked for a substitute without saying why.
pub const DEFAULT_SUBSTITUTION_REASON: &str = "dietary preference";

/// Invokes capability tools for one request.
pub struct ToolDispatcher<'a> {
    toolbox: &'a dyn Toolbox,
    inference: InferenceHandle<'a>,
}

impl<'a> ToolDispatcher<'a> {
    /// Bind a toolbox to the request's inference handle.
    #[must_use]
    pub const fn new(toolbox: &'a dyn Toolbox, inference: InferenceHandle<'a>) -> Self {
        Self { toolbox, inference }
    }

    /// Run every requested tool and collect the outcomes.
    pub async fn dispatch(&self, intent: &IntentRecord) -> ToolResults {
        let info = &intent.extracted_info;
        let mut results = ToolResults::default();

        if intent.needs(ToolName::FindSubstitutions) && !info.substitution_requests.is_empty() {
            let batch = self.lookup_substitutions(&info.substitution_requests).await;
            if !batch.found.is_empty() {
                results.record_success(ToolName::FindSubstitutions);
            }
            results.substitutions = Some(batch);
        }

        if intent.needs(ToolName::GenerateMeal) {
            let outcome = match self
                .toolbox
                .generate_meal(self.inference, meal_request(info))
                .await
            {
                Ok(meal) => {
                    results.record_success(ToolName::GenerateMeal);
                    ToolOutcome::Succeeded(meal)
                }
                Err(err) => {
                    warn!(error = %err, "meal generation failed");
                    ToolOutcome::Failed(err.to_string())
                }
            };
            results.meal = Some(outcome);
        }

        if intent.needs(ToolName::MealReasoning) {
            let request = results.meal().map(|meal| ReasoningRequest {
                meal_name: meal.meal_name.clone(),
                ingredients: meal.ingredients.clone(),
                instructions: None,
                dietary_preferences: info.dietary_preferences.clone(),
            });
            if let Some(request) = request {
                let outcome = match self.toolbox.explain_meal(self.inference, request).await {
                    Ok(reasoning) => {
                        results.record_success(ToolName::MealReasoning);
                        ToolOutcome::Succeeded(reasoning)
                    }
                    Err(err) => {
                        warn!(error = %err, "meal reasoning failed");
                        ToolOutcome::Failed(err.to_string())
                    }
                };
                results.reasoning = Some(outcome);
            } else {
                debug!("meal reasoning skipped: no meal was generated");
            }
        }

        results
    }

    async fn lookup_substitutions(&self, needs: &[SubstitutionNeed]) -> SubstitutionBatch {
        let lookups = needs.iter().map(|need| {
            let request = SubstitutionRequest {
                original_ingredient: need.ingredient.clone(),
                reason: need
                    .reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUBSTITUTION_REASON.to_string()),
                recipe_context: None,
            };
            self.toolbox.find_substitutions(self.inference, request)
        });
        let outcomes = join_all(lookups).await;

        let mut batch = SubstitutionBatch::default();
        for (need, outcome) in needs.iter().zip(outcomes) {
            match outcome {
                Ok(found) => batch.found.push(found),
                Err(err) => {
                    warn!(ingredient = %need.ingredient, error = %err, "substitution lookup failed");
                    batch.failures.push(FailedLookup {
                        ingredient: need.ingredient.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        batch
    }
}

fn meal_request(info: &ExtractedInfo) -> MealRequest {
    MealRequest {
        meal_type: info.meal_type.clone(),
        include_ingredients: info
            .ingredients
            .iter()
            .take(MAX_INCLUDED_INGREDIENTS)
            .cloned()
            .collect(),
        dietary_preferences: info.dietary_preferences.clone(),
        allergies: info.allergies.clone(),
        max_calories: None,
        cuisine_type: None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::coach::intent::Intent;
    use crate::llm::gateway::ApiKey;
    use crate::testing::{ScriptedGateway, coach_gateway};
    use crate::tools::LlmToolbox;

    fn record(tools: Vec<ToolName>, info: ExtractedInfo) -> IntentRecord {
        IntentRecord {
            intent: Intent::GenerateRecipe,
            tools_needed: tools,
            extracted_info: info,
            confidence: 0.9,
            context_understanding: None,
        }
    }

    fn need(ingredient: &str, reason: Option<&str>) -> SubstitutionNeed {
        SubstitutionNeed {
            ingredient: ingredient.to_string(),
            reason: reason.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_meal_then_reasoning() {
        let gateway = coach_gateway();
        let key = ApiKey::new("sk-test").unwrap();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));
        let dispatcher = ToolDispatcher::new(&LlmToolbox, handle);

        let info = ExtractedInfo {
            ingredients: (0..7).map(|i| format!("item{i}")).collect(),
            meal_type: Some("dinner".to_string()),
            ..ExtractedInfo::default()
        };
        let results = dispatcher
            .dispatch(&record(
                vec![ToolName::MealReasoning, ToolName::GenerateMeal],
                info,
            ))
            .await;

        assert_eq!(
            results.tools_used(),
            &[ToolName::GenerateMeal, ToolName::MealReasoning]
        );
        assert!(results.meal().is_some());
        assert!(results.reasoning().is_some());

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].user_prompt.contains("item4"));
        assert!(!calls[0].user_prompt.contains("item5"));
    }

    #[tokio::test]
    async fn test_reasoning_never_runs_without_meal() {
        let gateway = ScriptedGateway::failing();
        let key = ApiKey::new("sk-test").unwrap();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));
        let dispatcher = ToolDispatcher::new(&LlmToolbox, handle);

        let results = dispatcher
            .dispatch(&record(
                vec![ToolName::GenerateMeal, ToolName::MealReasoning],
                ExtractedInfo::default(),
            ))
            .await;

        assert!(results.tools_used().is_empty());
        assert!(matches!(results.meal, Some(ToolOutcome::Failed(_))));
        assert!(results.reasoning.is_none());
        assert_eq!(gateway.calls().len(), 1);

        let only_reasoning = dispatcher
            .dispatch(&record(vec![ToolName::MealReasoning], ExtractedInfo::default()))
            .await;
        assert_eq!(only_reasoning, ToolResults::default());
    }

    #[tokio::test]
    async fn test_partial_substitution_failure_keeps_going() {
        let gateway = coach_gateway();
        let key = ApiKey::new("sk-test").unwrap();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));
        let dispatcher = ToolDispatcher::new(&LlmToolbox, handle);

        let info = ExtractedInfo {
            substitution_requests: vec![
                need("mystery", Some("allergy")),
                need("peanut butter", None),
            ],
            ..ExtractedInfo::default()
        };
        let results = dispatcher
            .dispatch(&record(
                vec![ToolName::FindSubstitutions, ToolName::GenerateMeal],
                info,
            ))
            .await;

        let batch = results.substitutions.as_ref().unwrap();
        assert_eq!(batch.found.len(), 1);
        assert_eq!(batch.found[0].original_ingredient, "peanut butter");
        assert_eq!(batch.found[0].reason, DEFAULT_SUBSTITUTION_REASON);
        assert_eq!(batch.failures[0].ingredient, "mystery");
        assert!(results.meal().is_some());
        assert_eq!(
            results.tools_used(),
            &[ToolName::FindSubstitutions, ToolName::GenerateMeal]
        );
    }

    #[tokio::test]
    async fn test_substitutions_need_requests() {
        let gateway = coach_gateway();
        let key = ApiKey::new("sk-test").unwrap();
        let handle = InferenceHandle::new(&gateway, &key, Duration::from_secs(1));
        let dispatcher = ToolDispatcher::new(&LlmToolbox, handle);

        let results = dispatcher
            .dispatch(&record(
                vec![ToolName::FindSubstitutions],
                ExtractedInfo::default(),
            ))
            .await;
        assert!(results.substitutions.is_none());
        assert!(gateway.calls().is_empty());
    }
}
