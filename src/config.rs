use serde::Deserialize;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub dashboard_data_url: String,
    pub refresh_interval_secs: u64,
    pub gemini_api_key: Option<String>, // Absence disables advice, not the dashboard
    pub gemini_base_url: String,
    pub gemini_model: String,
}

fn require_http_url(name: &str, value: String) -> anyhow::Result<String> {
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    let parsed = url::Url::parse(value.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(value.trim().to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            dashboard_data_url: std::env::var("DASHBOARD_DATA_URL")
                .map_err(|_| anyhow::anyhow!("DASHBOARD_DATA_URL environment variable required"))
                .and_then(|url| require_http_url("DASHBOARD_DATA_URL", url))?,
            refresh_interval_secs: std::env::var("DASHBOARD_REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_REFRESH_INTERVAL_SECS.to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("DASHBOARD_REFRESH_INTERVAL_SECS must be a whole number of seconds")
                })
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("DASHBOARD_REFRESH_INTERVAL_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|key| !key.trim().is_empty()),
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    require_http_url("GEMINI_BASE_URL", url)
                        .map(|url| url.trim_end_matches('/').to_string())
                })
                .transpose()?
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        };

        // Log configuration without the credential
        tracing::debug!("Dashboard data URL: {}", config.dashboard_data_url);
        tracing::debug!("Refresh interval: {}s", config.refresh_interval_secs);
        tracing::debug!(
            "Gemini endpoint: {} (model {})",
            config.gemini_base_url,
            config.gemini_model
        );
        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; AI advice will be unavailable");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }
}
