//! In-process test doubles for the inference gateway.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Value, json};

use crate::llm::gateway::{
    ApiKey, GatewayError, GatewayFuture, GatewayResult, InferenceGateway, InferenceOutput,
    InferenceRequest,
};

type Script = dyn Fn(&InferenceRequest) -> GatewayResult<InferenceOutput> + Send + Sync;

/// Gateway answering from a closure and recording every request.
pub struct ScriptedGateway {
    script: Box<Script>,
    delay: Option<Duration>,
    calls: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedGateway {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&InferenceRequest) -> GatewayResult<InferenceOutput> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider that is down.
    pub fn failing() -> Self {
        Self::new(|_| Err(GatewayError::HttpStatus(503)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<InferenceRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl InferenceGateway for ScriptedGateway {
    fn infer<'a>(
        &'a self,
        _api_key: &'a ApiKey,
        request: InferenceRequest,
    ) -> GatewayFuture<'a, GatewayResult<InferenceOutput>> {
        let answer = (self.script)(&request);
        self.calls.lock().unwrap().push(request);
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            answer
        })
    }
}

/// A provider that behaves like a cooperative model for the coach scenarios.
///
/// Routes on the prompt: intent analysis, meal, substitution, reasoning, or the
/// free-text coaching reply. The substitution lookup for `mystery` always fails.
pub fn coach_gateway() -> ScriptedGateway {
    ScriptedGateway::new(|request| {
        let prompt = request.user_prompt.as_str();
        if !request.require_structured_json {
            return Ok(InferenceOutput::Text(coach_reply(prompt)));
        }
        let value = if prompt.starts_with("Analyze this user message") {
            classify(current_message(prompt))
        } else if prompt.starts_with("Generate a meal recipe") {
            json!({
                "meal_name": "Herb Roasted Chicken",
                "ingredients": ["2 chicken breasts", "1 cup broccoli", "1 tbsp olive oil"],
                "instructions": "Season the chicken, roast for 25 minutes, steam the broccoli.",
                "estimated_calories": 480,
                "dietary_info": "Lean protein with fibre-rich vegetables."
            })
        } else if prompt.starts_with("Find ingredient substitutions") {
            if prompt.contains("Original ingredient: mystery") {
                return Err(GatewayError::Malformed("unexpected token".to_string()));
            }
            json!({
                "substitutions": [
                    {"ingredient": "sunflower seed butter", "notes": "Same amount, nut free."},
                    {"ingredient": "tahini", "notes": "Thinner, slightly bitter."},
                    {"ingredient": "soy nut butter", "notes": "Closest texture."}
                ]
            })
        } else if prompt.starts_with("Generate brief nutritional reasoning") {
            json!({
                "key_ingredient_choices": "Chicken supplies lean protein.",
                "nutritional_benefits": "Balanced protein and fibre with healthy fats.",
                "dietary_alignment": "Fits a healthy eating plan."
            })
        } else {
            return Err(GatewayError::Malformed("unscripted prompt".to_string()));
        };
        Ok(InferenceOutput::Json(value))
    })
}

fn current_message(prompt: &str) -> &str {
    prompt
        .split("Current message: \"")
        .nth(1)
        .and_then(|rest| rest.split("\"\n").next())
        .unwrap_or_default()
}

fn classify(message: &str) -> Value {
    let lowered = message.to_lowercase();
    if lowered.contains("spicier") {
        json!({
            "intent": "follow_up",
            "tools_needed": ["generate_meal"],
            "extracted_info": {"references_previous": true},
            "confidence": 0.8,
            "context_understanding": "The user wants a spicier version of the previous chicken dinner."
        })
    } else if lowered.contains("instead of") {
        json!({
            "intent": "find_substitutions",
            "tools_needed": ["find_substitutions"],
            "extracted_info": {
                "allergies": ["nuts"],
                "substitution_requests": [{"ingredient": "peanut butter", "reason": "nut allergy"}]
            },
            "confidence": 0.9
        })
    } else if lowered.contains("dinner with chicken") {
        json!({
            "intent": "generate_recipe",
            "tools_needed": ["generate_meal", "meal_reasoning"],
            "extracted_info": {
                "ingredients": ["chicken"],
                "dietary_preferences": ["healthy"],
                "meal_type": "dinner"
            },
            "confidence": 0.92
        })
    } else {
        json!({"intent": "general_question", "tools_needed": [], "confidence": 0.6})
    }
}

fn coach_reply(prompt: &str) -> String {
    let meal = prompt
        .lines()
        .find_map(|line| line.strip_prefix("Generated meal: "));
    match meal {
        Some(name) => format!("Here is a recipe you will enjoy tonight: {name}. Want a side?"),
        None => "Happy to help with your nutrition goals today. What are you craving?".to_string(),
    }
}
