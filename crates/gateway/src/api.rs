//! `/api` routes: the fitness log keyed by the `x-user-id` header, and the
//! AI coach.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use liftlog_core::message::Message;
use liftlog_core::provider::ProviderRequest;
use liftlog_core::store::{NewNutritionEntry, NewWorkoutSession, NutritionEntry, WorkoutSession};

use crate::SharedState;

/// Temperature used for coaching advice.
const COACH_TEMPERATURE: f32 = 0.7;

pub(crate) fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/nutrition", get(list_nutrition).post(create_nutrition))
        .route("/coach", post(coach))
}

// --- DTOs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct SessionBody {
    pub total_volume: f64,
    pub exercises: serde_json::Value,
}

/// Macros plus any extra nutrients, either inline or grouped under
/// `extra_nutrients`.
#[derive(Debug, Deserialize)]
pub struct NutritionBody {
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CoachRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct CoachResponse {
    pub advice: String,
}

fn user_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "x-user-id header is required"))
}

// --- Handlers ---

async fn list_sessions(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<WorkoutSession>>, ApiError> {
    let user_id = user_id(&headers)?;
    state.store.list_sessions(&user_id).await.map(Json).map_err(|e| {
        error!(user_id = %user_id, error = %e, "Session query failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Database query failed: {e}"))
    })
}

async fn create_session(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<SessionBody>,
) -> Result<(StatusCode, Json<WorkoutSession>), ApiError> {
    let user_id = user_id(&headers)?;
    let session = NewWorkoutSession {
        user_id: user_id.clone(),
        total_volume: body.total_volume,
        exercises: body.exercises,
    };

    match state.store.insert_session(session).await {
        Ok(row) => {
            info!(user_id = %user_id, session_id = %row.id, "Workout session stored");
            Ok((StatusCode::CREATED, Json(row)))
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Session insert failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database insert failed: {e}"),
            ))
        }
    }
}

async fn list_nutrition(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Vec<NutritionEntry>>, ApiError> {
    let user_id = user_id(&headers)?;
    state.store.list_nutrition(&user_id).await.map(Json).map_err(|e| {
        error!(user_id = %user_id, error = %e, "Nutrition query failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Database query failed: {e}"))
    })
}

async fn create_nutrition(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<NutritionBody>,
) -> Result<(StatusCode, Json<NutritionEntry>), ApiError> {
    let user_id = user_id(&headers)?;

    let mut extra = body.extra;
    if let Some(serde_json::Value::Object(grouped)) = extra.remove("extra_nutrients") {
        extra.extend(grouped);
    }
    let mut entry = NewNutritionEntry {
        user_id: user_id.clone(),
        carbs: body.carbs,
        protein: body.protein,
        fat: body.fat,
        extra,
    };
    // Never let a body field shadow the header or a column.
    let shadowing = entry.strip_reserved_extras();
    if !shadowing.is_empty() {
        warn!(user_id = %user_id, keys = ?shadowing, "Dropped extra nutrients named like columns");
    }

    match state.store.insert_nutrition(entry).await {
        Ok(row) => {
            info!(user_id = %user_id, entry_id = %row.id, "Nutrition entry stored");
            Ok((StatusCode::CREATED, Json(row)))
        }
        Err(e) => {
            error!(user_id = %user_id, error = %e, "Nutrition insert failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database insert failed: {e}"),
            ))
        }
    }
}

async fn coach(
    State(state): State<SharedState>,
    Json(request): Json<CoachRequest>,
) -> Result<Json<CoachResponse>, ApiError> {
    let provider_request = ProviderRequest {
        model: state.model.clone(),
        messages: vec![
            Message::system(request.system_prompt),
            Message::user(request.user_prompt),
        ],
        temperature: COACH_TEMPERATURE,
        max_tokens: None,
        tools: Vec::new(),
    };

    match state.provider.complete(provider_request).await {
        Ok(response) => Ok(Json(CoachResponse {
            advice: response.message.content,
        })),
        Err(e) => {
            error!(provider = state.provider.name(), error = %e, "Coach request failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("AI coach request failed: {e}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::Request;
    use liftlog_store::InMemoryStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn json_post(uri: &str, user: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_as(uri: &str, user: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-user-id", user)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn missing_user_header_is_bad_request() {
        let app = test_app(Arc::new(InMemoryStore::new()), Arc::new(StaticProvider::new("x")));
        let req = Request::builder().uri("/api/sessions").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let req = json_post(
            "/api/nutrition",
            None,
            serde_json::json!({"carbs": 1, "protein": 1, "fat": 1}),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "x-user-id header is required");
    }

    #[tokio::test]
    async fn sessions_post_then_list() {
        let app = test_app(Arc::new(InMemoryStore::new()), Arc::new(StaticProvider::new("x")));

        let req = json_post(
            "/api/sessions",
            Some("U1"),
            serde_json::json!({"total_volume": 5200.0, "exercises": {"deadlift": "5x5@140kg"}}),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(response).await["user_id"], "U1");

        let response = app.clone().oneshot(get_as("/api/sessions", "U1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let rows = body_json(response).await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["exercises"]["deadlift"], "5x5@140kg");

        let response = app.oneshot(get_as("/api/sessions", "U2")).await.unwrap();
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn nutrition_extras_inline_and_grouped() {
        let app = test_app(Arc::new(InMemoryStore::new()), Arc::new(StaticProvider::new("x")));

        let req = json_post(
            "/api/nutrition",
            Some("U1"),
            serde_json::json!({
                "carbs": 250, "protein": 180, "fat": 70,
                "bcaa": 10,
                "extra_nutrients": {"creatine": 5}
            }),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.oneshot(get_as("/api/nutrition", "U1")).await.unwrap();
        let rows = body_json(response).await;
        assert_eq!(rows[0]["bcaa"], 10);
        assert_eq!(rows[0]["creatine"], 5);
        assert!(rows[0].get("extra_nutrients").is_none());
    }

    #[tokio::test]
    async fn nutrition_extras_cannot_shadow_columns() {
        let app = test_app(Arc::new(InMemoryStore::new()), Arc::new(StaticProvider::new("x")));

        let req = json_post(
            "/api/nutrition",
            Some("U1"),
            serde_json::json!({
                "carbs": 250, "protein": 180, "fat": 70,
                "id": "fake",
                "created_at": "1999-01-01T00:00:00Z",
                "user_id": "U2",
                "extra_nutrients": {"carbs": 1, "bcaa": 10}
            }),
        );
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_ne!(created["id"], "fake");

        let response = app.oneshot(get_as("/api/nutrition", "U1")).await.unwrap();
        let rows = body_json(response).await;
        assert_eq!(rows[0]["carbs"], 250.0);
        assert_eq!(rows[0]["user_id"], "U1");
        assert_eq!(rows[0]["id"], created["id"]);
        assert_ne!(rows[0]["created_at"], "1999-01-01T00:00:00Z");
        assert_eq!(rows[0]["bcaa"], 10);
    }

    #[tokio::test]
    async fn store_failure_is_internal_error() {
        let app = test_app(Arc::new(BrokenStore), Arc::new(StaticProvider::new("x")));

        let response = app.clone().oneshot(get_as("/api/nutrition", "U1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let req = json_post(
            "/api/sessions",
            Some("U1"),
            serde_json::json!({"total_volume": 1, "exercises": []}),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Database insert failed"));
    }

    #[tokio::test]
    async fn coach_uses_prompts_and_warm_temperature() {
        let provider = Arc::new(StaticProvider::new("Add a deload week."));
        let app = test_app(Arc::new(InMemoryStore::new()), provider.clone());

        let req = json_post(
            "/api/coach",
            None,
            serde_json::json!({
                "system_prompt": "You are a coach.",
                "user_prompt": "I stalled on bench."
            }),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["advice"], "Add a deload week.");

        let sent = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(sent.temperature, 0.7);
        assert_eq!(sent.messages[0].content, "You are a coach.");
        assert_eq!(sent.messages[1].content, "I stalled on bench.");
        assert!(sent.tools.is_empty());
    }

    #[tokio::test]
    async fn coach_provider_failure_is_internal_error() {
        let app = test_app(Arc::new(InMemoryStore::new()), Arc::new(DownProvider));
        let req = json_post(
            "/api/coach",
            None,
            serde_json::json!({"system_prompt": "s", "user_prompt": "u"}),
        );
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
