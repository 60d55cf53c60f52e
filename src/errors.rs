use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;

/// Outcome taxonomy of the purchase pipeline.
///
/// The pipeline never maps these to HTTP itself; see [`AppError`].
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// A required field is missing or unusable. Raised before hashing or any network call.
    Validation(String),
    /// Pixel id or access token is not configured. Operator-fixable.
    Configuration(String),
    /// The Conversions API answered with an `error` object, kept verbatim.
    UpstreamRejection(Value),
    /// Transport failure, unparseable response or anything else.
    Unexpected(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Validation(msg) => write!(f, "Validation error: {}", msg),
            PipelineError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::UpstreamRejection(detail) => {
                write!(f, "Conversions API rejected the event: {}", detail)
            }
            PipelineError::Unexpected(msg) => write!(f, "Unexpected error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Transport failures. The URL is stripped because its query carries the access token.
impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Unexpected(err.without_url().to_string())
    }
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Missing or invalid bearer token.
    Unauthorized(String),
    /// Request body over the intake limit.
    PayloadTooLarge(String),
    /// Pipeline failure, mapped to a status code in `into_response`.
    Pipeline(PipelineError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Pipeline(err)
    }
}

impl AppError {
    /// HTTP status for each failure kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Pipeline(PipelineError::Validation(_))
            | AppError::Pipeline(PipelineError::UpstreamRejection(_)) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(PipelineError::Configuration(_))
            | AppError::Pipeline(PipelineError::Unexpected(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Every body carries `success: false`. Upstream rejections keep the
    /// Conversions API error under `metaError` so callers can re-drive.
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                json!({ "success": false, "error": "Unauthorized. Invalid token." })
            }
            AppError::PayloadTooLarge(msg) => {
                tracing::warn!("Oversized request body: {}", msg);
                json!({ "success": false, "error": msg })
            }
            AppError::Pipeline(PipelineError::Validation(msg)) => {
                tracing::warn!("Rejected purchase: {}", msg);
                json!({ "success": false, "error": msg })
            }
            AppError::Pipeline(PipelineError::Configuration(msg)) => {
                tracing::error!("Server misconfigured: {}", msg);
                json!({ "success": false, "error": "Server configuration error" })
            }
            AppError::Pipeline(PipelineError::UpstreamRejection(detail)) => {
                tracing::warn!("Conversions API rejected event: {}", detail);
                json!({
                    "success": false,
                    "message": "Meta rejected the event",
                    "metaError": detail,
                })
            }
            AppError::Pipeline(PipelineError::Unexpected(msg)) => {
                tracing::error!("Unexpected error: {}", msg);
                json!({ "success": false, "error": msg })
            }
        };

        (status, Json(body)).into_response()
    }
}
