//! Attribution mode and deduplication key selection.
//!
//! Ad-click purchases must reuse an identifier known at click time so Meta can
//! merge the browser/pixel signal with this server-side event. Offline
//! purchases have nothing to merge with and always get a fresh key.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::identity::NormalizedIdentity;

const PHONE_HASH_PREFIX_LEN: usize = 5;
const OFFLINE_SUFFIX_RANGE: std::ops::Range<u32> = 0..10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionMode {
    AdClick,
    Offline,
}

/// Sanitized attribution fields from the inbound lead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributionSignals {
    pub fbp: Option<String>,
    pub fbc: Option<String>,
    pub click_id: Option<String>,
    pub event_id: Option<String>,
}

impl AttributionSignals {
    /// True when any browser or click identifier survived sanitization.
    pub fn has_click_signal(&self) -> bool {
        self.fbp.is_some() || self.fbc.is_some() || self.click_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionContext {
    pub mode: AttributionMode,
    pub dedup_key: String,
    /// Only populated in `AdClick` mode; forwarded unhashed.
    pub fbp: Option<String>,
    pub fbc: Option<String>,
}

/// Decides the attribution mode and the dedup key.
///
/// `AdClick`: first of `event_id`, `click_id`, or
/// `purchase_<millis>_<phone hash prefix>`.
/// `Offline`: always `purchase_offline_<millis>_<0..9999>`, any supplied
/// `event_id` is ignored.
pub fn resolve_attribution<R: Rng>(
    signals: AttributionSignals,
    identity: &NormalizedIdentity,
    now: DateTime<Utc>,
    rng: &mut R,
) -> AttributionContext {
    let millis = now.timestamp_millis();

    if !signals.has_click_signal() {
        let suffix = rng.gen_range(OFFLINE_SUFFIX_RANGE);
        return AttributionContext {
            mode: AttributionMode::Offline,
            dedup_key: format!("purchase_offline_{}_{}", millis, suffix),
            fbp: None,
            fbc: None,
        };
    }

    let dedup_key = signals
        .event_id
        .or(signals.click_id)
        .unwrap_or_else(|| {
            format!(
                "purchase_{}_{}",
                millis,
                identity.phone_hash_prefix(PHONE_HASH_PREFIX_LEN)
            )
        });

    AttributionContext {
        mode: AttributionMode::AdClick,
        dedup_key,
        fbp: signals.fbp,
        fbc: signals.fbc,
    }
}
