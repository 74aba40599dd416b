//! Predictor configuration types.

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prediction endpoint settings.
    #[serde(default)]
    pub predictor: PredictorConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cache tuning.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry policy for the prediction endpoint.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Authenticated-user handle standing in for the identity collaborator.
    #[serde(default)]
    pub user: UserConfig,

    /// Compute predictions locally instead of calling the endpoint.
    #[serde(default)]
    pub offline: bool,
}

/// External prediction endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Base URL of the prediction API.
    #[serde(default = "default_predictor_url")]
    pub base_url: String,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            base_url: default_predictor_url(),
        }
    }
}

/// Durable store endpoint and credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the store's REST surface.
    #[serde(default)]
    pub base_url: String,

    /// API key sent as `apikey` and bearer token.
    #[serde(default)]
    pub api_key: String,
}

/// Prediction cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum in-memory entries before FIFO-by-age eviction.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// Entry time-to-live in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Fixed-delay retry policy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_retry_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed delay between attempts in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,

    /// Additional attempts after the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_retry_timeout_secs(),
            delay_secs: default_retry_delay_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Authenticated user supplied by the identity collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Identity-provider subject id.
    #[serde(default)]
    pub auth_id: String,

    #[serde(default)]
    pub email: String,
}

fn default_predictor_url() -> String {
    "http://localhost:8000".into()
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_retry_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.retry.timeout_secs, 30);
        assert_eq!(cfg.retry.delay_secs, 5);
        assert_eq!(cfg.retry.max_retries, 3);
        assert_eq!(cfg.cache.max_entries, 100);
        assert_eq!(cfg.cache.ttl_secs, 86_400);
        assert!(!cfg.offline);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [user]
            auth_id = "auth0|abc"
            email = "user@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.user.email, "user@example.com");
        assert_eq!(cfg.predictor.base_url, "http://localhost:8000");
        assert_eq!(cfg.retry.max_retries, 3);
    }
}
