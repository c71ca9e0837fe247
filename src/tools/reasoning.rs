//! Nutritional reasoning about a meal.

use serde::{Deserialize, Serialize};

use crate::llm::gateway::{InferenceHandle, InferenceRequest};
use crate::llm::payload::nullable_list;
use crate::tools::{ToolError, ToolResult};

const REASONING_SYSTEM_PROMPT: &str =
    "You are a nutritionist who provides concise, evidence-based explanations about meals.";

/// Input of the reasoning generator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningRequest {
    /// Meal to analyze.
    pub meal_name: String,
    /// Its ingredients.
    pub ingredients: Vec<String>,
    /// Cooking instructions, if known.
    #[serde(default)]
    pub instructions: Option<String>,
    /// Preferences the meal should respect.
    #[serde(default, deserialize_with = "nullable_list")]
    pub dietary_preferences: Vec<String>,
}

impl ReasoningRequest {
    /// Check that there is a meal to reason about.
    ///
    /// # Errors
    /// Returns `ToolError::InvalidRequest` on a blank name or empty ingredient list.
    pub fn validate(&self) -> ToolResult<()> {
        if self.meal_name.trim().is_empty() {
            return Err(ToolError::InvalidRequest(
                "meal_name must not be empty".to_string(),
            ));
        }
        if self.ingredients.is_empty() {
            return Err(ToolError::InvalidRequest(
                "ingredients must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Short explanations, one or two sentences each.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningHighlights {
    /// Why the key ingredients were chosen.
    pub key_ingredient_choices: String,
    /// Main nutritional benefits and macronutrient balance.
    pub nutritional_benefits: String,
    /// Fit with the stated dietary preferences.
    pub dietary_alignment: String,
}

/// Reasoning about one meal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealReasoning {
    /// Meal that was analyzed.
    pub meal_name: String,
    /// The explanation.
    pub reasoning: ReasoningHighlights,
}

/// Explain the nutritional choices behind the meal in `request`.
///
/// # Errors
/// Returns an error if the inference call fails or its answer is malformed.
pub async fn explain_meal(
    inference: &InferenceHandle<'_>,
    request: &ReasoningRequest,
) -> ToolResult<MealReasoning> {
    let ingredients = request
        .ingredients
        .iter()
        .map(|ingredient| format!("- {ingredient}"))
        .collect::<Vec<_>>()
        .join("\n");
    let instructions = request
        .instructions
        .as_deref()
        .map(|text| format!("\nInstructions: {text}\n"))
        .unwrap_or_default();
    let preferences = if request.dietary_preferences.is_empty() {
        String::new()
    } else {
        format!(
            "\nDietary preferences: {}\n",
            request.dietary_preferences.join(", ")
        )
    };

    let prompt = format!(
        r#"Generate brief nutritional reasoning about this meal:

Meal Name: {}

Ingredients:
{ingredients}
{instructions}{preferences}
Provide concise reasoning (1-2 sentences each) in this exact JSON format:
{{
    "key_ingredient_choices": "Why key ingredients were selected and their nutritional significance",
    "nutritional_benefits": "Key nutritional benefits of this meal, including macronutrient balance",
    "dietary_alignment": "How this meal aligns with the specified dietary preferences"
}}

Keep explanations concise, evidence-based, and focused on nutritional value."#,
        request.meal_name
    );

    let reasoning: ReasoningHighlights = inference
        .complete_json(
            InferenceRequest::json(REASONING_SYSTEM_PROMPT, prompt).with_max_output_tokens(300),
        )
        .await
        .map_err(ToolError::inference("generate reasoning"))?;

    Ok(MealReasoning {
        meal_name: request.meal_name.clone(),
        reasoning,
    })
}
