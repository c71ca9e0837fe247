//! Intent record produced by the classifier.
//!
//! Model output is untrusted: [`IntentRecord::from_value`] rejects unknown tags,
//! unknown tools, ill-typed fields and out-of-range confidence so the classifier can
//! fall back instead of acting on garbage.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm::payload::nullable_list;

/// Primary intent of a user message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The user wants a recipe.
    GenerateRecipe,
    /// The user wants ingredient alternatives.
    FindSubstitutions,
    /// The user wants a nutritional explanation.
    AnalyzeNutrition,
    /// Anything else about nutrition.
    GeneralQuestion,
    /// The message builds on an earlier turn.
    FollowUp,
}

impl Intent {
    /// Wire tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GenerateRecipe => "generate_recipe",
            Self::FindSubstitutions => "find_substitutions",
            Self::AnalyzeNutrition => "analyze_nutrition",
            Self::GeneralQuestion => "general_question",
            Self::FollowUp => "follow_up",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog of capability tools the dispatcher can run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Recipe generation.
    GenerateMeal,
    /// Substitution lookup.
    FindSubstitutions,
    /// Nutritional reasoning over a generated meal.
    MealReasoning,
}

impl ToolName {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GenerateMeal => "generate_meal",
            Self::FindSubstitutions => "find_substitutions",
            Self::MealReasoning => "meal_reasoning",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingredient the user wants replaced.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionNeed {
    /// Ingredient to replace.
    pub ingredient: String,
    /// Why, when the user said so.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Parameters pulled out of the message. Every field is optional.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedInfo {
    /// Ingredients mentioned.
    #[serde(deserialize_with = "nullable_list")]
    pub ingredients: Vec<String>,
    /// Dietary preferences mentioned.
    #[serde(deserialize_with = "nullable_list")]
    pub dietary_preferences: Vec<String>,
    /// Meal type (breakfast, lunch, ...).
    pub meal_type: Option<String>,
    /// Allergies mentioned.
    #[serde(deserialize_with = "nullable_list")]
    pub allergies: Vec<String>,
    /// Ingredients to substitute.
    #[serde(deserialize_with = "nullable_list")]
    pub substitution_requests: Vec<SubstitutionNeed>,
    /// Whether the message builds on earlier turns.
    #[serde(deserialize_with = "nullable_bool")]
    pub references_previous: bool,
}

impl ExtractedInfo {
    fn normalize(&mut self) {
        clean_list(&mut self.ingredients);
        clean_list(&mut self.dietary_preferences);
        clean_list(&mut self.allergies);
        self.meal_type = self
            .meal_type
            .take()
            .map(|meal_type| meal_type.trim().to_lowercase())
            .filter(|meal_type| !meal_type.is_empty());
        self.substitution_requests.retain_mut(|need| {
            need.ingredient = need.ingredient.trim().to_string();
            need.reason = need
                .reason
                .take()
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty());
            !need.ingredient.is_empty()
        });
    }
}

fn clean_list(values: &mut Vec<String>) {
    for value in values.iter_mut() {
        *value = value.trim().to_string();
    }
    values.retain(|value| !value.is_empty());
}

fn nullable_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Why a model answer was not accepted as an intent record.
#[derive(Debug, Error)]
pub enum IntentValidationError {
    /// Shape or type mismatch.
    #[error("intent record does not match the schema: {0}")]
    Schema(#[from] serde_json::Error),
    /// Confidence outside `[0, 1]`.
    #[error("confidence out of range: {0}")]
    ConfidenceOutOfRange(f64),
}

/// Structured classification of one user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// Primary intent.
    pub intent: Intent,
    /// Tools to invoke, without duplicates.
    pub tools_needed: Vec<ToolName>,
    /// Parameters for the tools.
    #[serde(default)]
    pub extracted_info: ExtractedInfo,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
    /// How the message relates to earlier turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_understanding: Option<String>,
}

impl IntentRecord {
    /// Validate and normalize a raw model answer.
    ///
    /// # Errors
    /// Returns an error on any schema violation or out-of-range confidence.
    pub fn from_value(value: Value) -> Result<Self, IntentValidationError> {
        let mut record: Self = serde_json::from_value(value)?;
        if !record.confidence.is_finite() || !(0.0..=1.0).contains(&record.confidence) {
            return Err(IntentValidationError::ConfidenceOutOfRange(
                record.confidence,
            ));
        }

        let mut seen = Vec::with_capacity(record.tools_needed.len());
        record.tools_needed.retain(|tool| {
            if seen.contains(tool) {
                false
            } else {
                seen.push(*tool);
                true
            }
        });
        record.extracted_info.normalize();
        record.context_understanding = record
            .context_understanding
            .take()
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());
        Ok(record)
    }

    /// Whether the record asks for `tool`.
    #[must_use]
    pub fn needs(&self, tool: ToolName) -> bool {
        self.tools_needed.contains(&tool)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_value_accepts_full_record() {
        let record = IntentRecord::from_value(json!({
            "intent": "generate_recipe",
            "tools_needed": ["generate_meal", "meal_reasoning", "generate_meal"],
            "extracted_info": {
                "ingredients": ["chicken", "  "],
                "dietary_preferences": null,
                "meal_type": " Dinner ",
                "substitution_requests": [
                    {"ingredient": "butter", "reason": "dairy-free"},
                    {"ingredient": "", "reason": "x"}
                ],
                "references_previous": null
            },
            "confidence": 0.85,
            "context_understanding": "  "
        }))
        .unwrap();

        assert_eq!(record.intent, Intent::GenerateRecipe);
        assert_eq!(
            record.tools_needed,
            vec![ToolName::GenerateMeal, ToolName::MealReasoning]
        );
        assert_eq!(record.extracted_info.ingredients, vec!["chicken"]);
        assert!(record.extracted_info.dietary_preferences.is_empty());
        assert_eq!(record.extracted_info.meal_type.as_deref(), Some("dinner"));
        assert_eq!(record.extracted_info.substitution_requests.len(), 1);
        assert!(!record.extracted_info.references_previous);
        assert!(record.context_understanding.is_none());
        assert!(record.needs(ToolName::MealReasoning));
        assert!(!record.needs(ToolName::FindSubstitutions));
    }

    #[test]
    fn test_from_value_rejects_invalid_records() {
        let unknown_intent = json!({"intent": "order_pizza", "tools_needed": [], "confidence": 0.5});
        assert!(IntentRecord::from_value(unknown_intent).is_err());

        let unknown_tool = json!({"intent": "general_question", "tools_needed": ["web_search"], "confidence": 0.5});
        assert!(IntentRecord::from_value(unknown_tool).is_err());

        let bad_confidence = json!({"intent": "general_question", "tools_needed": [], "confidence": 1.5});
        assert!(matches!(
            IntentRecord::from_value(bad_confidence),
            Err(IntentValidationError::ConfidenceOutOfRange(_))
        ));

        let missing_confidence = json!({"intent": "general_question", "tools_needed": []});
        assert!(IntentRecord::from_value(missing_confidence).is_err());

        let wrong_type = json!({
            "intent": "general_question",
            "tools_needed": [],
            "extracted_info": {"ingredients": "chicken"},
            "confidence": 0.5
        });
        assert!(IntentRecord::from_value(wrong_type).is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Intent::FollowUp.to_string(), "follow_up");
        assert_eq!(ToolName::MealReasoning.to_string(), "meal_reasoning");
        assert_eq!(
            serde_json::to_value(Intent::AnalyzeNutrition).unwrap(),
            json!("analyze_nutrition")
        );
    }
}
