
const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";
const DEFAULT_GRAPH_API_VERSION: &str = "v19.0";
const DEFAULT_WHATSAPP_FALLBACK_PHONE: &str = "5492235568815";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Meta pixel (dataset) the purchases are reported to.
    pub meta_pixel_id: Option<String>,
    pub meta_access_token: Option<String>,
    /// Shared secret expected as `Authorization: Bearer <token>` on intake.
    pub admin_token: Option<String>,
    pub graph_base_url: String,
    pub graph_api_version: String,
    pub request_timeout_secs: u64,
    pub whatsapp_fallback_phone: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            meta_pixel_id: non_empty_var("META_PIXEL_ID"),
            meta_access_token: non_empty_var("META_ACCESS_TOKEN"),
            admin_token: non_empty_var("ADMIN_TOKEN"),
            graph_base_url: non_empty_var("META_GRAPH_BASE_URL")
                .map(|url| {
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("META_GRAPH_BASE_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })
                .transpose()?
                .unwrap_or_else(|| DEFAULT_GRAPH_BASE_URL.to_string()),
            graph_api_version: non_empty_var("META_GRAPH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.to_string()),
            request_timeout_secs: non_empty_var("META_REQUEST_TIMEOUT_SECS")
                .map(|secs| match secs.parse::<u64>() {
                    Ok(0) | Err(_) => {
                        anyhow::bail!("META_REQUEST_TIMEOUT_SECS must be a positive integer")
                    }
                    Ok(n) => Ok(n),
                })
                .transpose()?
                .unwrap_or(30),
            whatsapp_fallback_phone: non_empty_var("WHATSAPP_FALLBACK_PHONE")
                .unwrap_or_else(|| DEFAULT_WHATSAPP_FALLBACK_PHONE.to_string()),
        };

        // Log what is configured (never the secret values)
        tracing::info!("Configuration loaded successfully");
        if config.meta_pixel_id.is_none() || config.meta_access_token.is_none() {
            tracing::warn!(
                "META_PIXEL_ID or META_ACCESS_TOKEN not set - purchase submissions will fail"
            );
        }
        if config.admin_token.is_none() {
            tracing::warn!("ADMIN_TOKEN not set - all purchase requests will be rejected");
        }
        tracing::debug!(
            "Graph API: {}/{}",
            config.graph_base_url,
            config.graph_api_version
        );
        tracing::debug!("Request timeout: {}s", config.request_timeout_secs);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            meta_pixel_id: None,
            meta_access_token: None,
            admin_token: None,
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            graph_api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
            request_timeout_secs: 30,
            whatsapp_fallback_phone: DEFAULT_WHATSAPP_FALLBACK_PHONE.to_string(),
        }
    }
}

/// Reads an environment variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
