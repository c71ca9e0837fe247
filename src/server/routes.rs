//! HTTP route handlers for the `DietDraft` API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::coach::core::errors::CoachError;
use crate::coach::orchestrator::{CoachReply, CoachRequest};
use crate::tools::{
    Meal, MealReasoning, MealRequest, ReasoningRequest, SubstitutionRequest, SubstitutionResult,
    ToolError, VoiceParse,
};

use super::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Create the API router with all routes.
#[must_use]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/diet-coach", post(diet_coach))
        .route("/generate-meal", post(generate_meal))
        .route("/find-substitutions", post(find_substitutions))
        .route("/meal-reasoning", post(meal_reasoning))
        .route("/parse-voice", post(parse_voice))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "dietdraft",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn coach_error(err: CoachError) -> (StatusCode, String) {
    let status = match err {
        CoachError::EmptyMessage => StatusCode::UNPROCESSABLE_ENTITY,
        CoachError::MissingCredential => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn tool_error(err: ToolError) -> (StatusCode, String) {
    let status = match err {
        ToolError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ToolError::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

/// Handle a conversational coach message.
async fn diet_coach(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CoachRequest>,
) -> ApiResult<CoachReply> {
    state
        .coach
        .handle(request)
        .await
        .map(Json)
        .map_err(coach_error)
}

/// Recipe generation request.
#[derive(Debug, Deserialize)]
pub struct GenerateMealBody {
    /// Recipe constraints.
    #[serde(flatten)]
    pub request: MealRequest,
    /// Credential overriding the configured one.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Handle a standalone recipe request.
async fn generate_meal(
    State(state): State<Arc<AppState>>,
    Json(body): Json<GenerateMealBody>,
) -> ApiResult<Meal> {
    let request = body.request.normalized();
    request.validate().map_err(tool_error)?;
    let api_key = state
        .coach
        .resolve_api_key(body.api_key.as_deref())
        .map_err(coach_error)?;

    let meal = state
        .coach
        .toolbox()
        .generate_meal(state.coach.inference(&api_key), request)
        .await
        .map_err(tool_error)?;
    Ok(Json(meal))
}

/// Substitution request.
#[derive(Debug, Deserialize)]
pub struct FindSubstitutionsBody {
    /// Ingredient, reason and optional context.
    #[serde(flatten)]
    pub request: SubstitutionRequest,
    /// Credential overriding the configured one.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Handle a standalone substitution request.
async fn find_substitutions(
    State(state): State<Arc<AppState>>,
    Json(body): Json<FindSubstitutionsBody>,
) -> ApiResult<SubstitutionResult> {
    body.request.validate().map_err(tool_error)?;
    let api_key = state
        .coach
        .resolve_api_key(body.api_key.as_deref())
        .map_err(coach_error)?;

    let result = state
        .coach
        .toolbox()
        .find_substitutions(state.coach.inference(&api_key), body.request)
        .await
        .map_err(tool_error)?;
    Ok(Json(result))
}

/// Nutritional reasoning request.
#[derive(Debug, Deserialize)]
pub struct MealReasoningBody {
    /// Meal to explain.
    #[serde(flatten)]
    pub request: ReasoningRequest,
    /// Credential overriding the configured one.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Handle a standalone reasoning request.
async fn meal_reasoning(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MealReasoningBody>,
) -> ApiResult<MealReasoning> {
    body.request.validate().map_err(tool_error)?;
    let api_key = state
        .coach
        .resolve_api_key(body.api_key.as_deref())
        .map_err(coach_error)?;

    let reasoning = state
        .coach
        .toolbox()
        .explain_meal(state.coach.inference(&api_key), body.request)
        .await
        .map_err(tool_error)?;
    Ok(Json(reasoning))
}

/// Voice parsing request.
#[derive(Debug, Deserialize)]
pub struct ParseVoiceBody {
    /// Transcribed voice input.
    pub voice_text: String,
    /// Credential overriding the configured one.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Handle a voice transcript.
async fn parse_voice(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ParseVoiceBody>,
) -> ApiResult<VoiceParse> {
    if body.voice_text.trim().is_empty() {
        return Err(tool_error(ToolError::InvalidRequest(
            "voice_text must not be empty".to_string(),
        )));
    }
    let api_key = state
        .coach
        .resolve_api_key(body.api_key.as_deref())
        .map_err(coach_error)?;

    let parsed = state
        .coach
        .toolbox()
        .parse_voice(state.coach.inference(&api_key), body.voice_text)
        .await
        .map_err(tool_error)?;
    Ok(Json(parsed))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::coach::core::config::CoachConfig;
    use crate::coach::orchestrator::{CoachBackends, DietCoach};
    use crate::coach::store::InMemoryConversationStore;
    use crate::testing::coach_gateway;
    use crate::tools::LlmToolbox;

    fn router(api_key: Option<&str>) -> Router {
        let mut config = CoachConfig::default();
        config.llm.api_key = api_key.map(str::to_string);
        let backends = CoachBackends {
            gateway: Arc::new(coach_gateway()),
            toolbox: Arc::new(LlmToolbox),
            store: Arc::new(InMemoryConversationStore::new()),
        };
        create_router(AppState::new(DietCoach::new(config, backends).unwrap()))
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["service"], json!("dietdraft"));
    }

    #[tokio::test]
    async fn test_diet_coach_round_trip() {
        let (status, bytes) = post_json(
            router(Some("sk-configured")),
            "/diet-coach",
            json!({"message": "I want something healthy for dinner with chicken"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["action_taken"], json!("generate_recipe"));
        assert_eq!(body["tools_used"], json!(["generate_meal", "meal_reasoning"]));
        assert_eq!(body["data"]["meal"]["meal_name"], json!("Herb Roasted Chicken"));
        assert!(body["conversation_id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(body["user_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_diet_coach_error_statuses() {
        let (status, _) = post_json(router(None), "/diet-coach", json!({"message": "hi"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = post_json(
            router(Some("sk-configured")),
            "/diet-coach",
            json!({"message": "  "}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = post_json(router(None), "/diet-coach", json!({"message": "hi", "api_key": "sk-request"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_generate_meal_validation_and_success() {
        let (status, _) = post_json(
            router(Some("sk-configured")),
            "/generate-meal",
            json!({"meal_type": "brunch"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, bytes) = post_json(
            router(Some("sk-configured")),
            "/generate-meal",
            json!({"meal_type": "dinner", "include_ingredients": ["chicken"], "max_calories": 600}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let meal: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(meal["estimated_calories"], json!(480));

        let (status, _) = post_json(
            router(Some("sk-configured")),
            "/generate-meal",
            json!({"meal_type": " Dinner ", "include_ingredients": ["chicken", "  "]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_tool_endpoints() {
        let (status, bytes) = post_json(
            router(Some("sk-configured")),
            "/find-substitutions",
            json!({"original_ingredient": "peanut butter", "reason": "nut allergy"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["substitutions"].as_array().map(Vec::len), Some(3));

        let (status, _) = post_json(
            router(Some("sk-configured")),
            "/find-substitutions",
            json!({"original_ingredient": "mystery", "reason": "curiosity"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, bytes) = post_json(
            router(Some("sk-configured")),
            "/meal-reasoning",
            json!({"meal_name": "Chicken Bowl", "ingredients": ["chicken", "rice"]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["meal_name"], json!("Chicken Bowl"));

        let (status, _) = post_json(
            router(Some("sk-configured")),
            "/parse-voice",
            json!({"voice_text": " "}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
