//! Recipe generation.

use serde::{Deserialize, Serialize};

use crate::llm::gateway::{InferenceHandle, InferenceRequest};
use crate::llm::payload::{lenient_u32, nullable_list};
use crate::tools::{ToolError, ToolResult};

/// Accepted meal types.
pub const MEAL_TYPES: [&str; 5] = ["breakfast", "lunch", "dinner", "snack", "dessert"];
/// Most ingredients a request may force into a recipe.
pub const MAX_INCLUDED_INGREDIENTS: usize = 5;
/// Upper bound for `max_calories`.
pub const MAX_CALORIES: u32 = 2000;

const MEAL_SYSTEM_PROMPT: &str = "You are a nutritionist and chef who creates meals for specific \
dietary needs. Always respond with valid JSON only.";
const DEFAULT_MEAL_NAME: &str = "Untitled Meal";
const DEFAULT_INSTRUCTIONS: &str = "No instructions provided.";

/// Input of the recipe generator. Every constraint is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealRequest {
    /// Breakfast, lunch, dinner, snack or dessert.
    pub meal_type: Option<String>,
    /// Ingredients the recipe must use.
    #[serde(deserialize_with = "nullable_list")]
    pub include_ingredients: Vec<String>,
    /// Dietary preferences such as vegetarian or keto.
    #[serde(deserialize_with = "nullable_list")]
    pub dietary_preferences: Vec<String>,
    /// Allergens to avoid.
    #[serde(deserialize_with = "nullable_list")]
    pub allergies: Vec<String>,
    /// Calorie ceiling per serving.
    pub max_calories: Option<u32>,
    /// Preferred cuisine style.
    pub cuisine_type: Option<String>,
}

impl MealRequest {
    /// Lower-case the meal type and trim the included ingredients, dropping blank ones.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.meal_type = self
            .meal_type
            .map(|meal_type| meal_type.trim().to_lowercase())
            .filter(|meal_type| !meal_type.is_empty());
        self.include_ingredients = self
            .include_ingredients
            .into_iter()
            .map(|ingredient| ingredient.trim().to_string())
            .filter(|ingredient| !ingredient.is_empty())
            .collect();
        self
    }

    /// Check ranges accepted from external callers.
    ///
    /// Run it on a [`normalized`](Self::normalized) request.
    ///
    /// # Errors
    /// Returns `ToolError::InvalidRequest` on an unknown meal type, too many
    /// ingredients, or a calorie limit outside `1..=2000`.
    pub fn validate(&self) -> ToolResult<()> {
        if self
            .meal_type
            .as_deref()
            .is_some_and(|meal_type| !MEAL_TYPES.contains(&meal_type))
        {
            return Err(ToolError::InvalidRequest(format!(
                "meal_type must be one of {}",
                MEAL_TYPES.join(", ")
            )));
        }

        if self.include_ingredients.len() > MAX_INCLUDED_INGREDIENTS {
            return Err(ToolError::InvalidRequest(format!(
                "at most {MAX_INCLUDED_INGREDIENTS} ingredients can be included"
            )));
        }
        if self
            .max_calories
            .is_some_and(|calories| !(1..=MAX_CALORIES).contains(&calories))
        {
            return Err(ToolError::InvalidRequest(format!(
                "max_calories must be between 1 and {MAX_CALORIES}"
            )));
        }

        Ok(())
    }

    /// Render the constraints as a bullet list for the prompt.
    #[must_use]
    pub fn requirements_text(&self) -> String {
        let mut requirements = Vec::new();

        if let Some(meal_type) = &self.meal_type {
            requirements.push(format!("Meal type: {meal_type}"));
        }
        if !self.include_ingredients.is_empty() {
            requirements.push(format!(
                "REQUIRED INGREDIENTS: You MUST use the following ingredients in the recipe: {}",
                self.include_ingredients.join(", ")
            ));
        }
        if !self.dietary_preferences.is_empty() {
            requirements.push(format!(
                "Dietary preferences: {}",
                self.dietary_preferences.join(", ")
            ));
        }
        if !self.allergies.is_empty() {
            requirements.push(format!(
                "Avoid these allergens: {}",
                self.allergies.join(", ")
            ));
        }
        if let Some(calories) = self.max_calories {
            requirements.push(format!("Maximum {calories} calories per serving"));
        }
        if let Some(cuisine) = &self.cuisine_type {
            requirements.push(format!("Cuisine style: {cuisine}"));
        }

        if requirements.is_empty() {
            return "No specific dietary restrictions.".to_string();
        }
        requirements
            .iter()
            .map(|requirement| format!("- {requirement}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A generated recipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    /// Recipe name.
    pub meal_name: String,
    /// Ingredients with quantities.
    pub ingredients: Vec<String>,
    /// Cooking instructions.
    pub instructions: String,
    /// Estimated calories per serving.
    pub estimated_calories: Option<u32>,
    /// How the meal meets the requested constraints.
    pub dietary_info: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MealPayload {
    meal_name: Option<String>,
    #[serde(deserialize_with = "nullable_list")]
    ingredients: Vec<String>,
    instructions: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    estimated_calories: Option<u32>,
    dietary_info: Option<String>,
}

impl From<MealPayload> for Meal {
    fn from(payload: MealPayload) -> Self {
        Self {
            meal_name: non_blank(payload.meal_name)
                .unwrap_or_else(|| DEFAULT_MEAL_NAME.to_string()),
            ingredients: payload.ingredients,
            instructions: non_blank(payload.instructions)
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
            estimated_calories: payload.estimated_calories,
            dietary_info: non_blank(payload.dietary_info),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Generate one recipe for `request`.
///
/// # Errors
/// Returns an error if the inference call fails or its answer is not a recipe object.
pub async fn generate_meal(
    inference: &InferenceHandle<'_>,
    request: &MealRequest,
) -> ToolResult<Meal> {
    let prompt = format!(
        r#"Generate a meal recipe with the following requirements:

{}

You must respond with a valid JSON object in this exact format:
{{
    "meal_name": "Name of the meal",
    "ingredients": ["ingredient 1 with quantity", "ingredient 2 with quantity"],
    "instructions": "Step-by-step cooking instructions in paragraph form",
    "estimated_calories": 400,
    "dietary_info": "Brief explanation of how this meal meets the dietary requirements"
}}"#,
        request.requirements_text()
    );

    let payload: MealPayload = inference
        .complete_json(
            InferenceRequest::json(MEAL_SYSTEM_PROMPT, prompt).with_max_output_tokens(700),
        )
        .await
        .map_err(ToolError::inference("generate meal"))?;
    Ok(payload.into())
}
