//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```yaml
//! model: deepseek-chat
//! settle_delay_ms: 1500
//! error_markers:
//!   - "Access Denied"
//! ```

use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

/// Browser user agent sent with every page request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// LLM model name.
    pub model: String,
    /// Timeout for the listing page fetch.
    pub listing_timeout_secs: u64,
    /// Timeout for each detail page fetch.
    pub detail_timeout_secs: u64,
    /// Wait between receiving a detail page and capturing it.
    pub settle_delay_ms: u64,
    pub user_agent: String,
    /// Upper bound on page text characters sent to the LLM.
    pub max_input_chars: usize,
    /// Phrases that mark a detail page as an error page.
    pub error_markers: Vec<String>,
    /// Drop overlay, modal and cookie-banner elements before text extraction.
    pub remove_overlays: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            listing_timeout_secs: 60,
            detail_timeout_secs: 60,
            settle_delay_ms: 3000,
            user_agent: BROWSER_USER_AGENT.to_string(),
            max_input_chars: 12_000,
            error_markers: vec![
                "Fetch Error".to_string(),
                "Access Denied".to_string(),
                "404 Not Found".to_string(),
            ],
            remove_overlays: true,
        }
    }
}

impl AppConfig {
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Load the config file at `path`, or the defaults when no path is given.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&str>) -> Result<AppConfig, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let raw = tokio::fs::read_to_string(path).await?;
    let config = parse_config(&raw)?;
    info!(path, model = %config.model, "Loaded configuration");
    Ok(config)
}

fn parse_config(raw: &str) -> Result<AppConfig, Box<dyn Error>> {
    if raw.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}
