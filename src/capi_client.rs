use crate::capi_models::EventEnvelope;
use crate::config::Config;
use crate::errors::PipelineError;
use reqwest;
use serde_json::Value;
use std::time::Duration;
use tracing;
use url::Url;

/// Client for the Meta Conversions API (Graph API `/{pixel_id}/events`).
///
/// Credentials are optional at construction so the service can boot without
/// them; a missing pixel id or token fails each submission with
/// [`PipelineError::Configuration`] before anything is sent.
#[derive(Clone)]
pub struct CapiClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    pixel_id: Option<String>,
    access_token: Option<String>,
}

impl CapiClient {
    /// Creates a new `CapiClient` from the process configuration.
    ///
    /// The underlying HTTP client enforces `request_timeout_secs` on every
    /// call so a hung Graph API request cannot block the intake forever.
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                PipelineError::Unexpected(format!("Failed to create Conversions API client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.graph_base_url.clone(),
            api_version: config.graph_api_version.clone(),
            pixel_id: config.meta_pixel_id.clone(),
            access_token: config.meta_access_token.clone(),
        })
    }

    pub fn pixel_id(&self) -> Option<&str> {
        self.pixel_id.as_deref()
    }

    /// Fails with a configuration error unless both pixel id and token are set.
    pub fn ensure_configured(&self) -> Result<(&str, &str), PipelineError> {
        match (self.pixel_id.as_deref(), self.access_token.as_deref()) {
            (Some(pixel_id), Some(token)) => Ok((pixel_id, token)),
            _ => Err(PipelineError::Configuration(
                "META_PIXEL_ID or META_ACCESS_TOKEN not configured".to_string(),
            )),
        }
    }

    /// `{base}/{version}/{pixel_id}/events?access_token=...`
    fn events_url(&self, pixel_id: &str, token: &str) -> Result<Url, PipelineError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            PipelineError::Unexpected(format!("Invalid Graph API base URL: {}", e))
        })?;

        url.path_segments_mut()
            .map_err(|_| PipelineError::Unexpected("Graph API base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend([self.api_version.as_str(), pixel_id, "events"]);
        url.query_pairs_mut().append_pair("access_token", token);

        Ok(url)
    }

    /// Posts the envelope once. No retries.
    ///
    /// The response body decides the outcome: an `error` object means Meta
    /// rejected the event, anything else is returned to the caller as-is.
    ///
    /// # Returns
    ///
    /// * `Result<Value, PipelineError>` - The raw Graph API response.
    pub async fn send_events(&self, envelope: &EventEnvelope) -> Result<Value, PipelineError> {
        let (pixel_id, token) = self.ensure_configured()?;
        let url = self.events_url(pixel_id, token)?;

        tracing::info!(
            "Sending {} event(s) to Conversions API for pixel {}",
            envelope.data.len(),
            pixel_id
        );
        // Redact token from logs to prevent credential exposure
        tracing::debug!(
            "Graph API URL: {}/{}/{}/events?access_token=[REDACTED]",
            self.base_url,
            self.api_version,
            pixel_id
        );

        let response = self
            .client
            .post(url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors embed the URL, which carries the token
                PipelineError::Unexpected(format!(
                    "Conversions API request failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|e| {
            PipelineError::Unexpected(format!(
                "Failed to read Conversions API response: {}",
                e.without_url()
            ))
        })?;

        let body: Value = serde_json::from_str(&body_text).map_err(|e| {
            PipelineError::Unexpected(format!(
                "Failed to parse Conversions API response ({}): {}",
                status, e
            ))
        })?;

        if let Some(error) = body.get("error") {
            return Err(PipelineError::UpstreamRejection(error.clone()));
        }

        if !status.is_success() {
            return Err(PipelineError::Unexpected(format!(
                "Conversions API returned {}: {}",
                status, body_text
            )));
        }

        Ok(body)
    }
}
