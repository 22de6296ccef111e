use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use genai_common::generator::TextGenerator;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::model::{
    required, HealthResponse, IdeaRequest, IdeaResponse, PolicyRequest, PolicyResponse,
};
use crate::prompt;

/// Shared handler state. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
    pub config: Arc<Config>,
}

pub fn build_router(state: AppState) -> Router {
    let index = ServeFile::new(state.config.index_file());
    let assets = ServeDir::new(&state.config.static_dir);
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route_service("/", index)
        .route("/api/generate-idea", post(generate_idea))
        .route("/api/explain-policy", post(explain_policy))
        .route("/health", get(health))
        .fallback_service(assets)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unwraps a JSON body, turning any extractor rejection into `missing`
/// unless the body was simply too large.
fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    missing: ApiError,
) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(ApiError::BodyTooLarge)
        }
        Err(rejection) => {
            debug!(error = %rejection, "rejected request body");
            Err(missing)
        }
    }
}

async fn generate_idea(
    State(state): State<AppState>,
    payload: Result<Json<IdeaRequest>, JsonRejection>,
) -> Result<Json<IdeaResponse>, ApiError> {
    let request = json_body(payload, ApiError::MissingBusiness)?;
    let business = required(request.business).ok_or(ApiError::MissingBusiness)?;

    let text = state
        .generator
        .generate(&prompt::idea_prompt(&business))
        .await
        .map_err(ApiError::IdeaGeneration)?;

    Ok(Json(IdeaResponse {
        ideas: prompt::ideas_or_fallback(&text),
    }))
}

async fn explain_policy(
    State(state): State<AppState>,
    payload: Result<Json<PolicyRequest>, JsonRejection>,
) -> Result<Json<PolicyResponse>, ApiError> {
    let request = json_body(payload, ApiError::MissingPolicyType)?;
    let policy_type = required(request.policy_type).ok_or(ApiError::MissingPolicyType)?;

    let explanation = state
        .generator
        .generate(&prompt::policy_prompt(&policy_type))
        .await
        .map_err(ApiError::PolicyExplanation)?;

    Ok(Json(PolicyResponse { explanation }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
