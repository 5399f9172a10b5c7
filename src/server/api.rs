use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::config::{ConfigStatus, Environment};
use crate::generation::models::{CourseFormat, GenerationRequest};
use crate::generation::orchestrator::Orchestrator;

pub const API_KEY_HEADER: &str = "x-api-key";

const MIN_DURATION_MINUTES: f64 = 5.0;
const MAX_DURATION_MINUTES: f64 = 120.0;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Value clients must send in `X-API-Key`.
    pub api_key: String,
    pub config_status: ConfigStatus,
    pub environment: Environment,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

/// Raw start payload. Every field is optional so that missing values get
/// the same messages as invalid ones instead of a deserializer error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGenerationBody {
    pub topic: Option<String>,
    pub format: Option<String>,
    pub audience: Option<String>,
    pub duration_minutes: Option<f64>,
    pub curriculum: Option<String>,
    pub prerequisite: Option<String>,
    pub additional_context: Option<String>,
    #[serde(default)]
    pub source_urls: Vec<String>,
}

impl StartGenerationBody {
    /// Boundary checks, in the order clients see them.
    pub fn into_request(self) -> Result<GenerationRequest, ApiError> {
        let topic = non_blank(self.topic)
            .ok_or_else(|| ApiError::BadRequest("topic is required".into()))?;

        let format = self
            .format
            .as_deref()
            .and_then(|f| CourseFormat::from_str(f).ok())
            .ok_or_else(|| {
                ApiError::BadRequest("format must be elearning, workshop, or scenario".into())
            })?;

        let audience = non_blank(self.audience)
            .ok_or_else(|| ApiError::BadRequest("audience is required".into()))?;

        let duration_minutes = self
            .duration_minutes
            .filter(|d| {
                (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(d) && d.fract() == 0.0
            })
            .map(|d| d as u32)
            .ok_or_else(|| {
                ApiError::BadRequest("durationMinutes must be between 5 and 120".into())
            })?;

        Ok(GenerationRequest {
            topic,
            format,
            audience,
            duration_minutes,
            curriculum: non_blank(self.curriculum),
            prerequisite: non_blank(self.prerequisite),
            additional_context: non_blank(self.additional_context),
            source_urls: self.source_urls,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

fn internal(context: &str, e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, "{}", context);
    ApiError::Internal(format!("{}: {}", context, e))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router(state: SharedState) -> Router<SharedState> {
    let generation = Router::new()
        .route("/api/generation/start", post(start_generation))
        .route("/api/generation/{course_id}/status", get(get_status))
        .route("/api/generation/{course_id}/design-spec", get(get_design_spec))
        .route("/api/generation/{course_id}/storyboard", get(get_storyboard))
        .route_layer(middleware::from_fn_with_state(state, require_api_key));

    Router::new()
        .merge(generation)
        .route("/health", get(health_check))
        .route("/api/status", get(service_status))
        .route("/api/knowledge/examples", get(list_examples))
        .route("/api/knowledge/examples/{title}", get(get_example))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}

// ── Middleware ────────────────────────────────────────────────────────

async fn require_api_key(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match provided {
        None => Err(ApiError::Unauthorized("Missing X-API-Key header".into())),
        Some(key) if key != state.api_key => Err(ApiError::Forbidden("Invalid API key".into())),
        Some(_) => Ok(next.run(request).await),
    }
}

// ── Generation ────────────────────────────────────────────────────────

async fn start_generation(
    State(state): State<SharedState>,
    body: Result<Json<StartGenerationBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = body.into_request()?;

    let started = state
        .orchestrator
        .start_run(request)
        .await
        .map_err(|e| internal("Failed to start generation", e))?;

    let status_url = format!("/api/generation/{}/status", started.course_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "courseId": started.course_id,
            "status": started.status,
            "message": "Course generation started",
            "statusUrl": status_url,
        })),
    ))
}

async fn get_status(
    State(state): State<SharedState>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .orchestrator
        .get_status(&course_id)
        .await
        .map_err(|e| internal("Failed to get status", e))?;
    match status {
        Some(view) => Ok(Json(view)),
        None => Err(ApiError::NotFound("Course not found".into())),
    }
}

async fn get_design_spec(
    State(state): State<SharedState>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let spec = state
        .orchestrator
        .get_design_spec(&course_id)
        .await
        .map_err(|e| internal("Failed to get design spec", e))?
        .ok_or_else(|| ApiError::NotFound("Design spec not found or not yet generated".into()))?;
    Ok(Json(json!({"courseId": course_id, "designSpec": spec})))
}

async fn get_storyboard(
    State(state): State<SharedState>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let storyboard = state
        .orchestrator
        .get_storyboard(&course_id)
        .await
        .map_err(|e| internal("Failed to get storyboard", e))?
        .ok_or_else(|| ApiError::NotFound("Storyboard not found or not yet generated".into()))?;
    Ok(Json(json!({"courseId": course_id, "storyboard": storyboard})))
}

// ── Service status ────────────────────────────────────────────────────

async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let connected = state.orchestrator.db().call(|db| db.ping()).await.is_ok();
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": state.config_status,
        "database": if connected { "connected" } else { "disconnected" },
    }))
}

async fn service_status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.environment.to_string(),
        "services": {
            "database": state.config_status.database,
            "ai": state.config_status.ai,
        },
    }))
}

// ── Knowledge base ────────────────────────────────────────────────────

async fn list_examples(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let examples = state
        .orchestrator
        .db()
        .call(|db| db.list_example_courses())
        .await
        .map_err(|e| internal("Failed to fetch examples", e))?;
    Ok(Json(json!({"examples": examples})))
}

async fn get_example(
    State(state): State<SharedState>,
    Path(title): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let example = state
        .orchestrator
        .db()
        .call(move |db| db.get_example_course_by_title(&title))
        .await
        .map_err(|e| internal("Failed to fetch example", e))?
        .ok_or_else(|| ApiError::NotFound("Example not found".into()))?;
    Ok(Json(json!({"example": example})))
}
