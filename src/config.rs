use std::path::PathBuf;
use std::time::Duration;

use crate::models::StrategyKind;

/// Application-level constants
pub const APP_NAME: &str = "DealDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Review sessions untouched for this long are reclaimed.
pub const SESSION_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(3600);

/// How often the binary sweeps idle sessions.
pub const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_MODEL_URL: &str = "https://api.mistral.ai";
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;

/// Rate-limit retry budget for the model backend.
pub const MODEL_RETRY_ATTEMPTS: u32 = 3;
pub const MODEL_RETRY_BASE_DELAY_MS: u64 = 1000;
pub const MODEL_RETRY_MAX_DELAY_MS: u64 = 8000;

pub const SINK_TIMEOUT_SECS: u64 = 30;

pub const DATABASE_FILE: &str = "dealdesk.db";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "dealdesk_lib=info,dealdesk=info,warn"
}

/// Get the application data directory
/// ~/DealDesk/ on all platforms, or the working directory when no home exists
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub strategy: StrategyKind,
    pub api_key: Option<String>,
    pub model: String,
    pub model_url: String,
    pub model_timeout_secs: u64,
    pub sink_url: Option<String>,
    pub sink_token: Option<String>,
    /// Opt-in: language English when every geo is English-speaking.
    pub geo_language: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: app_data_dir(),
            strategy: StrategyKind::Pattern,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            sink_url: None,
            sink_token: None,
            geo_language: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let mut strategy = match get("DEALDESK_STRATEGY").as_deref() {
            Some("model") => StrategyKind::Model,
            Some("pattern") | None => StrategyKind::Pattern,
            Some(other) => {
                tracing::warn!(value = other, "Unknown DEALDESK_STRATEGY, using pattern");
                StrategyKind::Pattern
            }
        };
        let api_key = get("MISTRAL_API_KEY");
        if strategy == StrategyKind::Model && api_key.is_none() {
            tracing::warn!("MISTRAL_API_KEY not set, falling back to pattern extraction");
            strategy = StrategyKind::Pattern;
        }

        let model_timeout_secs = match get("DEALDESK_MODEL_TIMEOUT_SECS") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid DEALDESK_MODEL_TIMEOUT_SECS, using default");
                DEFAULT_MODEL_TIMEOUT_SECS
            }),
            None => DEFAULT_MODEL_TIMEOUT_SECS,
        };

        Self {
            data_dir: get("DEALDESK_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            strategy,
            api_key,
            model: get("DEALDESK_MODEL").unwrap_or(defaults.model),
            model_url: get("DEALDESK_MODEL_URL").unwrap_or(defaults.model_url),
            model_timeout_secs,
            sink_url: get("DEALDESK_SINK_URL"),
            sink_token: get("DEALDESK_SINK_TOKEN"),
            geo_language: matches!(
                get("DEALDESK_GEO_LANGUAGE").as_deref(),
                Some("1" | "true" | "yes")
            ),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}
