use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use std::sync::Arc;
use url::{form_urlencoded, Url};

use crate::handlers::AppState;

const GREETING: &str = "Hola! Quiero mi usuario";
const WHATSAPP_BASE: &str = "https://wa.me/";

/// Query parameters of the ad landing redirect.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    /// Destination number chosen by the rotator.
    pub phone: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
}

/// GET /api/ir
///
/// Sends an ad click to a WhatsApp chat with a prefilled greeting. Campaign
/// and ad names are appended so the sheet can attribute the conversation.
/// Always redirects, even when the query string is malformed.
pub async fn whatsapp_redirect(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RedirectQuery>, QueryRejection>,
) -> Redirect {
    let fallback = &state.config.whatsapp_fallback_phone;

    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::warn!("Malformed redirect query: {}", rejection.body_text());
            return Redirect::temporary(&format!("{}{}", WHATSAPP_BASE, fallback));
        }
    };

    match build_whatsapp_url(&query, fallback) {
        Some(url) => {
            tracing::debug!("Redirecting ad click to {}", url);
            Redirect::temporary(url.as_str())
        }
        None => {
            tracing::error!("Could not build WhatsApp URL for {:?}", query);
            Redirect::temporary(&format!("{}{}", WHATSAPP_BASE, fallback))
        }
    }
}

/// `https://wa.me/<phone>?text=<greeting[ (Ref: campaign | ad)]>`
///
/// Only blank parameters count as missing; a literal `N/A` is passed through.
pub fn build_whatsapp_url(query: &RedirectQuery, fallback_phone: &str) -> Option<Url> {
    let phone = non_blank(query.phone.as_deref()).unwrap_or(fallback_phone);

    let campaign = non_blank(query.utm_campaign.as_deref());
    let content = non_blank(query.utm_content.as_deref());

    let mut message = GREETING.to_string();
    if campaign.is_some() || content.is_some() {
        message.push_str(&format!(
            " (Ref: {} | {})",
            campaign.unwrap_or("N/A"),
            content.unwrap_or("N/A")
        ));
    }

    let mut url = Url::parse(WHATSAPP_BASE).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(phone);

    // wa.me expects %20 for spaces; form encoding yields '+' and escapes literal '+' as %2B
    let text: String = form_urlencoded::byte_serialize(message.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    let query = format!("text={}", text);
    url.set_query(Some(query.as_str()));

    Some(url)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
