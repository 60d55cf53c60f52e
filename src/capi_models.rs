use serde::Serialize;

use crate::attribution::AttributionContext;
use crate::identity::NormalizedIdentity;

pub const EVENT_NAME: &str = "Purchase";
pub const CURRENCY: &str = "ARS";
/// Action source Meta accepts for events relayed from a CRM/sheet rather than a website.
pub const ACTION_SOURCE: &str = "system_generated";

/// Body of `POST /{pixel_id}/events`.
/// Documentation: https://developers.facebook.com/docs/marketing-api/conversions-api/parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub data: Vec<ConversionEvent>,

    /// Routes the event to the Events Manager "Test events" tab
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_event_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionEvent {
    pub event_name: String,

    /// Unix seconds
    pub event_time: i64,

    /// Dedup key shared with the browser pixel event, if any
    pub event_id: String,

    pub user_data: UserData,
    pub custom_data: CustomData,
    pub action_source: String,
}

/// Customer information parameters. Hash arrays always hold exactly one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserData {
    pub ph: Vec<String>,
    #[serde(rename = "fn")]
    pub first_name: Vec<String>,
    #[serde(rename = "ln")]
    pub last_name: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomData {
    pub currency: String,
    pub value: f64,
}

impl EventEnvelope {
    /// Wraps a single purchase event for submission.
    pub fn purchase(
        identity: &NormalizedIdentity,
        attribution: &AttributionContext,
        event_time: i64,
        amount: f64,
        test_event_code: Option<String>,
    ) -> Self {
        let event = ConversionEvent {
            event_name: EVENT_NAME.to_string(),
            event_time,
            event_id: attribution.dedup_key.clone(),
            user_data: UserData {
                ph: vec![identity.hashed_phone.clone()],
                first_name: vec![identity.hashed_first_name.clone()],
                last_name: vec![identity.hashed_last_name.clone()],
                fbp: attribution.fbp.clone(),
                fbc: attribution.fbc.clone(),
            },
            custom_data: CustomData {
                currency: CURRENCY.to_string(),
                value: amount,
            },
            action_source: ACTION_SOURCE.to_string(),
        };

        Self {
            data: vec![event],
            test_event_code,
        }
    }

    /// The single event carried by this envelope.
    pub fn event(&self) -> Option<&ConversionEvent> {
        self.data.first()
    }
}
