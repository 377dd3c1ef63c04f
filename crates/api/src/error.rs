use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use mediasift_comfyui::ComfyUIApiError;
use mediasift_core::error::CoreError;
use mediasift_workflow::WorkflowError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain error types from the core, workflow, and comfyui
/// crates and adds HTTP-specific variants. Implements [`IntoResponse`]
/// to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `mediasift_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A workflow-engine error from `mediasift_workflow`.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// An upstream ComfyUI error.
    #[error(transparent)]
    ComfyUI(#[from] ComfyUIApiError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} '{id}' not found"),
                    None,
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                }
                CoreError::Conflict(msg) => {
                    (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None)
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                        None,
                    )
                }
                CoreError::Io(err) => {
                    tracing::error!(error = %err, "I/O error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "IO_ERROR",
                        "A filesystem operation failed".to_string(),
                        None,
                    )
                }
            },

            // --- Workflow engine errors: all caller-fixable ---
            AppError::Workflow(wf) => match wf {
                WorkflowError::UnknownFormat => (
                    StatusCode::BAD_REQUEST,
                    "UNKNOWN_FORMAT",
                    wf.to_string(),
                    None,
                ),
                WorkflowError::Conversion { .. } => (
                    StatusCode::BAD_REQUEST,
                    "CONVERSION_ERROR",
                    wf.to_string(),
                    None,
                ),
                WorkflowError::Structure(_) | WorkflowError::InvalidOptions(_) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    wf.to_string(),
                    None,
                ),
            },

            // --- Upstream ComfyUI errors: surface the raw payload ---
            AppError::ComfyUI(upstream) => match upstream {
                ComfyUIApiError::Rejected { payload } => (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_REJECTED",
                    "ComfyUI rejected the workflow".to_string(),
                    Some(payload.clone()),
                ),
                ComfyUIApiError::ApiError { status, body } => (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    format!("ComfyUI returned status {status}"),
                    Some(json!({ "body": body })),
                ),
                ComfyUIApiError::Request(err) => {
                    tracing::error!(error = %err, "ComfyUI request failed");
                    (
                        StatusCode::BAD_GATEWAY,
                        "UPSTREAM_UNREACHABLE",
                        "Could not reach ComfyUI".to_string(),
                        None,
                    )
                }
                ComfyUIApiError::UnexpectedResponse(msg) => (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    msg.clone(),
                    None,
                ),
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, axum::Json(body)).into_response()
    }
}
