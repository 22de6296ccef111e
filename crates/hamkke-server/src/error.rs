use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use genai_common::gemini::GeminiClientError;
use tracing::error;

use crate::model::{ErrorResponse, IdeaErrorResponse, PolicyErrorResponse};
use crate::prompt;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
}

/// Failures surfaced by the HTTP handlers. Upstream detail is logged but
/// never serialized; clients only see the localized message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("business description is missing")]
    MissingBusiness,

    #[error("policy type is missing")]
    MissingPolicyType,

    #[error("request body exceeds the configured limit")]
    BodyTooLarge,

    #[error("idea generation failed: {0}")]
    IdeaGeneration(#[source] GeminiClientError),

    #[error("policy explanation failed: {0}")]
    PolicyExplanation(#[source] GeminiClientError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingBusiness => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: prompt::MISSING_BUSINESS_MESSAGE,
                }),
            )
                .into_response(),
            ApiError::MissingPolicyType => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: prompt::MISSING_POLICY_TYPE_MESSAGE,
                }),
            )
                .into_response(),
            ApiError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse {
                    error: prompt::BODY_TOO_LARGE_MESSAGE,
                }),
            )
                .into_response(),
            ApiError::IdeaGeneration(e) => {
                error!(error = %e, "error generating business idea");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(IdeaErrorResponse {
                        error: prompt::IDEA_FAILURE_MESSAGE,
                        ideas: prompt::fallback_ideas(),
                    }),
                )
                    .into_response()
            }
            ApiError::PolicyExplanation(e) => {
                error!(error = %e, "error explaining policy");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(PolicyErrorResponse {
                        error: prompt::POLICY_FAILURE_MESSAGE,
                        explanation: prompt::POLICY_FALLBACK,
                    }),
                )
                    .into_response()
            }
        }
    }
}
