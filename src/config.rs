use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Aarogya Portal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default upload ceiling for patient reports (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SUMMARIZER_MODEL: &str = "medgemma";
const DEFAULT_SUMMARIZER_TIMEOUT_SECS: u64 = 120;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "aarogya_portal=info,tower_http=warn".to_string()
}

/// Get the application data directory
/// ~/AarogyaPortal/ on all platforms. Falls back to the working directory
/// when no home directory can be determined (containers, CI).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("AarogyaPortal")
}

/// Default SQLite database location.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("portal.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime configuration for the portal server.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub log_filter: String,
    /// Base URL of the summarization backend. `None` disables summaries.
    pub summarizer_url: Option<String>,
    pub summarizer_model: String,
    pub summarizer_timeout_secs: u64,
    pub max_upload_bytes: usize,
    /// Optional JSON seed file applied at startup.
    pub seed_path: Option<PathBuf>,
    /// Bearer token for the platform owner's admin routes. `None` disables
    /// them.
    pub admin_token: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080))),
            database_path: default_database_path(),
            log_filter: default_log_filter(),
            summarizer_url: None,
            summarizer_model: DEFAULT_SUMMARIZER_MODEL.to_string(),
            summarizer_timeout_secs: DEFAULT_SUMMARIZER_TIMEOUT_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            seed_path: None,
            admin_token: None,
        }
    }
}

impl PortalConfig {
    /// Build configuration from `AAROGYA_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (testable without
    /// touching the process environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("AAROGYA_BIND_ADDR") {
            config.bind_addr = value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "AAROGYA_BIND_ADDR",
                value,
            })?;
        }
        if let Some(value) = lookup("AAROGYA_DATABASE_PATH") {
            config.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("AAROGYA_LOG") {
            config.log_filter = value;
        }
        if let Some(value) = lookup("AAROGYA_SUMMARIZER_URL") {
            let trimmed = value.trim();
            config.summarizer_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(value) = lookup("AAROGYA_SUMMARIZER_MODEL") {
            config.summarizer_model = value;
        }
        if let Some(value) = lookup("AAROGYA_SUMMARIZER_TIMEOUT_SECS") {
            config.summarizer_timeout_secs =
                value.parse().map_err(|_| ConfigError::InvalidValue {
                    var: "AAROGYA_SUMMARIZER_TIMEOUT_SECS",
                    value,
                })?;
        }
        if let Some(value) = lookup("AAROGYA_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = value
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: "AAROGYA_MAX_UPLOAD_BYTES",
                    value,
                })?;
        }
        if let Some(value) = lookup("AAROGYA_SEED_FILE") {
            config.seed_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("AAROGYA_ADMIN_TOKEN") {
            let trimmed = value.trim();
            config.admin_token = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }

        Ok(config)
    }
}
