use crate::error::GateError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Maps crate errors onto HTTP responses with a `detail` message.
#[derive(Debug)]
pub enum ApiError {
    Gate(GateError),
    /// Any failure while creating a job is reported to the caller as-is.
    Creation(GateError),
    /// The job identifier could not be parsed.
    UnknownJob,
    /// The request body could not be read as the expected JSON.
    MalformedBody(String),
}

impl From<GateError> for ApiError {
    fn from(error: GateError) -> Self {
        ApiError::Gate(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = match self {
            ApiError::Gate(error) => error,
            ApiError::UnknownJob => return not_found(),
            ApiError::Creation(error) => return bad_request(error.to_string()),
            ApiError::MalformedBody(detail) => return bad_request(detail),
        };
        let (status, detail) = match &error {
            GateError::NotFound(_) => return not_found(),
            error if error.is_request_error() => (StatusCode::BAD_REQUEST, error.to_string()),
            error => {
                error!(%error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

fn bad_request(detail: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Job not found" })),
    )
        .into_response()
}
