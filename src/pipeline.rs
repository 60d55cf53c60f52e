//! Purchase conversion pipeline
//!
//! One inbound lead becomes one `Purchase` event for the Conversions API:
//! 1. Validate required fields (nothing is hashed or sent if this fails)
//! 2. Sanitize attribution fields
//! 3. Normalize and hash phone/names
//! 4. Resolve event time
//! 5. Resolve attribution mode and dedup key
//! 6. Build the envelope
//! 7. Submit once and interpret the response

use crate::attribution::{resolve_attribution, AttributionContext, AttributionMode, AttributionSignals};
use crate::capi_client::CapiClient;
use crate::capi_models::EventEnvelope;
use crate::config::Config;
use crate::errors::PipelineError;
use crate::event_time::{resolve_event_time, Clock, SystemClock};
use crate::identity::NormalizedIdentity;
use crate::lead_models::RawLead;
use crate::sanitize::sanitize_field;
use serde_json::Value;
use std::sync::Arc;

/// Everything derived from a lead before the network call.
#[derive(Debug, Clone)]
pub struct PreparedPurchase {
    pub identity: NormalizedIdentity,
    pub attribution: AttributionContext,
    pub envelope: EventEnvelope,
}

/// Successful submission.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub event_id: String,
    pub mode: AttributionMode,
    pub meta_response: Value,
}

#[derive(Clone)]
pub struct PurchasePipeline {
    client: CapiClient,
    clock: Arc<dyn Clock>,
}

impl PurchasePipeline {
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            client: CapiClient::new(config)?,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the wall clock, mainly for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs every stage up to (not including) submission.
    pub fn prepare(&self, lead: &RawLead) -> Result<PreparedPurchase, PipelineError> {
        let valid = lead.validate()?;
        let now = self.clock.now();

        let signals = AttributionSignals {
            fbp: sanitize_field(lead.fbp.as_deref()),
            fbc: sanitize_field(lead.fbc.as_deref()),
            click_id: sanitize_field(lead.click_id.as_deref()),
            event_id: sanitize_field(lead.event_id.as_deref()),
        };
        let test_event_code = sanitize_field(lead.test_event_code.as_deref());

        let identity = NormalizedIdentity::new(valid.first_name, valid.last_name, valid.phone);
        let event_time = resolve_event_time(lead.event_time.as_ref(), now);
        let attribution = resolve_attribution(signals, &identity, now, &mut rand::thread_rng());

        tracing::debug!(
            "Prepared purchase: mode={:?}, event_id={}, event_time={}",
            attribution.mode,
            attribution.dedup_key,
            event_time
        );

        let envelope = EventEnvelope::purchase(
            &identity,
            &attribution,
            event_time,
            valid.amount,
            test_event_code,
        );

        Ok(PreparedPurchase {
            identity,
            attribution,
            envelope,
        })
    }

    /// Prepares and submits a purchase. Single attempt.
    pub async fn process(&self, lead: &RawLead) -> Result<PurchaseOutcome, PipelineError> {
        let prepared = self.prepare(lead)?;

        let result = self.client.send_events(&prepared.envelope).await;

        // Audit line, one per submission attempt
        let amount = prepared
            .envelope
            .event()
            .map(|e| e.custom_data.value)
            .unwrap_or_default();
        tracing::info!(
            "[CAPI] Pixel: {} | Amount: {} | FBP: {} | Mode: {:?} | Meta Status: {}",
            self.client.pixel_id().unwrap_or("-"),
            amount,
            if prepared.attribution.fbp.is_some() { "YES" } else { "NO" },
            prepared.attribution.mode,
            match &result {
                Ok(body) if body.get("events_received").is_some() => "OK",
                Ok(_) => "OK (no events_received)",
                Err(_) => "FAIL",
            }
        );

        let meta_response = result?;

        Ok(PurchaseOutcome {
            event_id: prepared.attribution.dedup_key,
            mode: prepared.attribution.mode,
            meta_response,
        })
    }
}
