//! Ingredient substitution lookup.

use serde::{Deserialize, Serialize};

use crate::llm::gateway::{InferenceHandle, InferenceRequest};
use crate::llm::payload::nullable_list;
use crate::tools::{ToolError, ToolResult};

const SUBSTITUTION_SYSTEM_PROMPT: &str = "You are a culinary expert who provides practical \
ingredient substitutions. Always respond with valid JSON only.";

/// Input of the substitution finder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRequest {
    /// Ingredient to replace.
    pub original_ingredient: String,
    /// Why it must be replaced.
    pub reason: String,
    /// How the ingredient is used in the dish.
    #[serde(default)]
    pub recipe_context: Option<String>,
}

impl SubstitutionRequest {
    /// Check that ingredient and reason are present.
    ///
    /// # Errors
    /// Returns `ToolError::InvalidRequest` if either is blank.
    pub fn validate(&self) -> ToolResult<()> {
        if self.original_ingredient.trim().is_empty() {
            return Err(ToolError::InvalidRequest(
                "original_ingredient must not be empty".to_string(),
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(ToolError::InvalidRequest(
                "reason must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One alternative ingredient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitute {
    /// Replacement ingredient.
    pub ingredient: String,
    /// Practical usage notes.
    #[serde(default)]
    pub notes: String,
}

/// Alternatives found for one ingredient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionResult {
    /// Ingredient that was replaced.
    pub original_ingredient: String,
    /// Reason given for the replacement.
    pub reason: String,
    /// Alternatives, usually three to five.
    pub substitutions: Vec<Substitute>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubstitutionPayload {
    #[serde(deserialize_with = "nullable_list")]
    substitutions: Vec<Substitute>,
}

/// Find alternatives for the ingredient in `request`.
///
/// # Errors
/// Returns an error if the inference call fails or its answer is malformed.
pub async fn find_substitutions(
    inference: &InferenceHandle<'_>,
    request: &SubstitutionRequest,
) -> ToolResult<SubstitutionResult> {
    let context = request
        .recipe_context
        .as_deref()
        .map(|context| format!("Recipe context: {context}\n"))
        .unwrap_or_default();
    let prompt = format!(
        r#"Find ingredient substitutions for the following:

Original ingredient: {}
Reason for substitution: {}
{context}
Provide 3-5 alternative ingredients that would work as substitutions.
Focus on ingredients that address the substitution reason while maintaining the dish's integrity.

Respond with valid JSON in this format:
{{
    "substitutions": [
        {{"ingredient": "coconut cream", "notes": "Use same amount. Adds subtle coconut flavor."}},
        {{"ingredient": "cashew cream", "notes": "Blend 1 cup cashews with 1 cup water."}}
    ]
}}

Make the notes practical and specific about usage."#,
        request.original_ingredient, request.reason
    );

    let payload: SubstitutionPayload = inference
        .complete_json(
            InferenceRequest::json(SUBSTITUTION_SYSTEM_PROMPT, prompt).with_max_output_tokens(400),
        )
        .await
        .map_err(ToolError::inference("find substitutions"))?;

    Ok(SubstitutionResult {
        original_ingredient: request.original_ingredient.clone(),
        reason: request.reason.clone(),
        substitutions: payload
            .substitutions
            .into_iter()
            .filter(|substitute| !substitute.ingredient.trim().is_empty())
            .collect(),
    })
}
