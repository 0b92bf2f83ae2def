//! Runtime configuration.
//!
//! Defaults, overlaid by an optional JSON settings file, then environment
//! variables, then command-line flags (applied by the caller).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::api::{normalize_base_url, DEFAULT_TIMEOUT};
use crate::logging::LogFormat;

pub const DEFAULT_API_BASE: &str = "https://toko-agung.my.id/toko-agung-api/api";
pub const DEFAULT_OPERATOR: &str = "kasir";

// Environment keys
const ENV_API_BASE: &str = "TOKO_API_BASE";
const ENV_API_TIMEOUT_SECS: &str = "TOKO_API_TIMEOUT_SECS";
pub(crate) const ENV_LOG_DIR: &str = "TOKO_LOG_DIR";
const ENV_LOG_FORMAT: &str = "TOKO_LOG_FORMAT";
const ENV_OPERATOR: &str = "TOKO_OPERATOR";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// `None` means the platform default from [`crate::logging::default_log_dir`].
    pub log_dir: Option<PathBuf>,
    pub log_format: LogFormat,
    pub operator: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            log_dir: None,
            log_format: LogFormat::default(),
            operator: DEFAULT_OPERATOR.to_string(),
        }
    }
}

/// Settings file shape, camelCase like the rest of the dashboard's JSON:
/// ```json
/// {
///   "apiBaseUrl": "http://localhost/toko-agung-api/api",
///   "requestTimeoutSecs": 10,
///   "logDir": "/var/log/toko",
///   "logFormat": "json",
///   "operator": "kasir1"
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, alias = "api_base_url")]
    api_base_url: Option<String>,
    #[serde(default, alias = "request_timeout_secs")]
    request_timeout_secs: Option<u64>,
    #[serde(default, alias = "log_dir")]
    log_dir: Option<PathBuf>,
    #[serde(default, alias = "log_format")]
    log_format: Option<String>,
    #[serde(default)]
    operator: Option<String>,
}

impl AppConfig {
    /// Build the configuration from defaults, `settings_path` (when given)
    /// and the process environment.
    pub fn load(settings_path: Option<&Path>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(path) = settings_path {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("read settings {}: {e}", path.display()))?;
            config.apply_settings_json(&raw)?;
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_settings_json(&mut self, raw: &str) -> Result<(), String> {
        let settings: SettingsFile =
            serde_json::from_str(raw).map_err(|e| format!("Invalid settings file: {e}"))?;
        if let Some(url) = settings.api_base_url {
            self.set_api_base(&url);
        }
        if let Some(secs) = settings.request_timeout_secs.filter(|s| *s > 0) {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = settings.log_dir {
            self.log_dir = Some(dir);
        }
        if let Some(format) = settings.log_format {
            self.log_format = format.parse()?;
        }
        if let Some(operator) = settings.operator.filter(|o| !o.trim().is_empty()) {
            self.operator = operator.trim().to_string();
        }
        Ok(())
    }

    fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_BASE) {
            self.set_api_base(&url);
        }
        if let Some(raw) = non_empty(ENV_API_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout = Duration::from_secs(secs),
                _ => warn!(value = %raw, "ignoring invalid TOKO_API_TIMEOUT_SECS"),
            }
        }
        if let Some(dir) = non_empty(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = non_empty(ENV_LOG_FORMAT) {
            match raw.parse() {
                Ok(format) => self.log_format = format,
                Err(e) => warn!(error = %e, "ignoring invalid TOKO_LOG_FORMAT"),
            }
        }
        if let Some(operator) = non_empty(ENV_OPERATOR) {
            self.operator = operator.trim().to_string();
        }
    }

    /// Set the API base URL, normalised. Blank input is ignored.
    pub fn set_api_base(&mut self, url: &str) {
        let normalized = normalize_base_url(url);
        if !normalized.is_empty() {
            self.api_base_url = normalized;
        }
    }
}
