use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use conductor_agent::AgentError;
use conductor_core::error::CoreError;
use conductor_pipeline::PipelineError;
use serde_json::json;

/// Error returned by every handler; rendered as `{"error", "code"}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The agent could not be reached or refused a kill request.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Malformed request body or parameters.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// Archive and request-shape problems are the caller's fault.
impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Core(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(CoreError::NotFound { entity, id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            ),
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Database(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
            ),
            AppError::Agent(err) => {
                tracing::warn!(error = %err, "Agent request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "AGENT_ERROR",
                    "The execution agent could not complete the request".to_string(),
                )
            }
            AppError::Core(CoreError::Internal(_))
            | AppError::Database(_)
            | AppError::InternalError(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
    }
}
