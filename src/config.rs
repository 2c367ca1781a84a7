//! Configuration types — env-driven, with sensible local defaults.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Top-level platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Path to the libSQL database file.
    pub db_path: String,
    /// Directory where uploaded documents are kept locally.
    pub upload_dir: std::path::PathBuf,
    /// Port for the REST API.
    pub listen_port: u16,
    /// External pitch-deck scoring API.
    pub scoring: ScoringConfig,
    /// External vault storage API (None disables folder provisioning/mirroring).
    pub vault: Option<VaultStorageConfig>,
    /// Webhook URL for best-effort notifications (None disables them).
    pub notify_webhook: Option<String>,
    /// Freshness window for cached progress snapshots.
    pub progress_cache_ttl: Duration,
}

impl PlatformConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("PROOFHUB_DB_PATH")
            .unwrap_or_else(|_| "./data/proofhub.db".to_string());

        let upload_dir = std::env::var("PROOFHUB_UPLOAD_DIR")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| std::path::PathBuf::from("./data/uploads"));

        let listen_port: u16 = parse_env("PROOFHUB_PORT", 8080)?;

        let progress_cache_secs: u64 = parse_env("PROOFHUB_PROGRESS_CACHE_SECS", 120)?;

        Ok(Self {
            db_path,
            upload_dir,
            listen_port,
            scoring: ScoringConfig::from_env()?,
            vault: VaultStorageConfig::from_env(),
            notify_webhook: std::env::var("PROOFHUB_NOTIFY_WEBHOOK").ok(),
            progress_cache_ttl: Duration::from_secs(progress_cache_secs),
        })
    }
}

/// Scoring API configuration. The scoring call is the only external call
/// that blocks a request, so it carries an explicit timeout.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl ScoringConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("PROOFHUB_SCORING_URL")
            .map_err(|_| ConfigError::MissingEnvVar("PROOFHUB_SCORING_URL".into()))?;
        let api_key = std::env::var("PROOFHUB_SCORING_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("PROOFHUB_SCORING_API_KEY".into()))?;
        let timeout_secs: u64 = parse_env("PROOFHUB_SCORING_TIMEOUT_SECS", 60)?;

        Ok(Self {
            base_url,
            api_key: SecretString::from(api_key),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Vault storage API configuration. Optional — without it, folder
/// provisioning is skipped per-category and uploads stay local-only.
#[derive(Debug, Clone)]
pub struct VaultStorageConfig {
    pub base_url: String,
    pub token: SecretString,
}

impl VaultStorageConfig {
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("PROOFHUB_VAULT_URL").ok()?;
        let token = std::env::var("PROOFHUB_VAULT_TOKEN").unwrap_or_default();
        Some(Self {
            base_url,
            token: SecretString::from(token),
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
