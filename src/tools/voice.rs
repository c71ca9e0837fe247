//! Voice transcript parsing.

use serde::{Deserialize, Serialize};

use crate::llm::gateway::{InferenceHandle, InferenceRequest};
use crate::llm::payload::{lenient_u32, nullable_list};
use crate::tools::{ToolError, ToolResult};

const VOICE_SYSTEM_PROMPT: &str = "You are a helpful assistant that parses voice commands into \
structured JSON for a recipe API.";
const NOTHING_UNDERSTOOD: &str = "I couldn't understand specific meal requirements from your input.";

/// Structured meal request recovered from a voice transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceParse {
    /// Meal type, if mentioned.
    pub meal_type: Option<String>,
    /// Ingredients mentioned.
    #[serde(deserialize_with = "nullable_list")]
    pub include_ingredients: Vec<String>,
    /// Dietary preferences mentioned.
    #[serde(deserialize_with = "nullable_list")]
    pub dietary_preferences: Vec<String>,
    /// Allergies mentioned.
    #[serde(deserialize_with = "nullable_list")]
    pub allergies: Vec<String>,
    /// Calorie limit, if mentioned.
    #[serde(deserialize_with = "lenient_u32")]
    pub max_calories: Option<u32>,
    /// Cuisine style, if mentioned.
    pub cuisine_type: Option<String>,
    /// Human-readable summary of the fields above.
    pub parsed_text: String,
}

impl VoiceParse {
    /// Summarize the recognized fields, one per line.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(meal_type) = self.meal_type.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("Meal type: {}", capitalize(meal_type)));
        }
        if !self.include_ingredients.is_empty() {
            lines.push(format!(
                "Ingredients: {}",
                self.include_ingredients.join(", ")
            ));
        }
        if !self.dietary_preferences.is_empty() {
            lines.push(format!(
                "Dietary preferences: {}",
                self.dietary_preferences.join(", ")
            ));
        }
        if !self.allergies.is_empty() {
            lines.push(format!("Allergies: {}", self.allergies.join(", ")));
        }
        if let Some(cuisine) = self.cuisine_type.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!("Cuisine: {}", capitalize(cuisine)));
        }
        if let Some(calories) = self.max_calories.filter(|calories| *calories > 0) {
            lines.push(format!("Maximum calories: {calories}"));
        }

        if lines.is_empty() {
            NOTHING_UNDERSTOOD.to_string()
        } else {
            lines.join("\n")
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect()
    })
}

/// Parse a voice transcript into a structured meal request.
///
/// # Errors
/// Returns `ToolError::InvalidRequest` on a blank transcript, or an inference error.
pub async fn parse_voice(inference: &InferenceHandle<'_>, voice_text: &str) -> ToolResult<VoiceParse> {
    if voice_text.trim().is_empty() {
        return Err(ToolError::InvalidRequest(
            "voice_text must not be empty".to_string(),
        ));
    }

    let prompt = format!(
        r#"Parse the following voice input into a JSON structure for a meal recipe API.

Voice Input: "{}"

Extract the following information (if present):
- meal_type: (breakfast, lunch, dinner, snack, or dessert)
- include_ingredients: (list of ingredients mentioned)
- dietary_preferences: (like vegetarian, vegan, gluten-free, etc.)
- allergies: (any allergies or ingredients to avoid)
- max_calories: (calorie limit if mentioned)
- cuisine_type: (cuisine style like Italian, Mexican, etc.)

Return ONLY a valid JSON object with these fields. If a field is not mentioned, use null or an empty array as appropriate."#,
        voice_text.trim()
    );

    let mut parsed: VoiceParse = inference
        .complete_json(
            InferenceRequest::json(VOICE_SYSTEM_PROMPT, prompt)
                .with_temperature(0.3)
                .with_max_output_tokens(300),
        )
        .await
        .map_err(ToolError::inference("parse voice input"))?;
    parsed.parsed_text = parsed.summary();
    Ok(parsed)
}
