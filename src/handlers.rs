use crate::config::Config;
use crate::errors::{AppError, PipelineError};
use crate::lead_models::RawLead;
use crate::pipeline::PurchasePipeline;
use crate::redirect_handler;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Max accepted request body. Leads are a handful of short fields.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Purchase pipeline, holding the Conversions API client.
    pub pipeline: PurchasePipeline,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let pipeline = PurchasePipeline::new(&config)?;
        Ok(Self { config, pipeline })
    }
}

/// Builds the service router with CORS, tracing and body-limit layers.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/meta-purchase", post(meta_purchase))
        .route("/api/ir", get(redirect_handler::whatsapp_redirect))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Browser and Make/Keitaro callers post cross-origin; preflights are answered here.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::OPTIONS,
            Method::PATCH,
            Method::DELETE,
            Method::POST,
            Method::PUT,
        ])
        .allow_headers([
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-requested-with"),
            header::ACCEPT,
            HeaderName::from_static("accept-version"),
            header::CONTENT_LENGTH,
            HeaderName::from_static("content-md5"),
            header::CONTENT_TYPE,
            header::DATE,
            HeaderName::from_static("x-api-version"),
            header::AUTHORIZATION,
        ])
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-capi-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/meta-purchase
///
/// Receives a purchase from a sheet script or automation, runs it through the
/// pipeline and relays it to the Conversions API.
///
/// Authentication is checked before the body is looked at.
///
/// # Returns
///
/// * `Result<(StatusCode, Json<serde_json::Value>), AppError>` - `{success, metaResponse, event_id}` or an error.
pub async fn meta_purchase(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RawLead>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    validate_bearer_token(&state.config, &headers)?;

    let Json(lead) = payload.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(rejection.body_text()),
        _ => PipelineError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
            .into(),
    })?;

    tracing::info!(
        "Received purchase: amount={:?}, has_fbp={}, has_fbc={}, has_click_id={}",
        lead.amount,
        lead.fbp.is_some(),
        lead.fbc.is_some(),
        lead.click_id.is_some()
    );

    let outcome = state.pipeline.process(&lead).await?;

    tracing::info!(
        "Purchase accepted: event_id={}, mode={:?}",
        outcome.event_id,
        outcome.mode
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "metaResponse": outcome.meta_response,
            "event_id": outcome.event_id,
        })),
    ))
}

/// Validates `Authorization: Bearer <token>` against ADMIN_TOKEN.
///
/// Without a configured token every request is refused.
fn validate_bearer_token(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected) = config.admin_token else {
        tracing::error!("ADMIN_TOKEN not configured, refusing purchase request");
        return Err(AppError::Unauthorized("ADMIN_TOKEN not configured".to_string()));
    };

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !constant_time_compare(token, expected) {
        return Err(AppError::Unauthorized("Invalid bearer token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
