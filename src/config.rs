//! Configuration loader — merges env vars, .env file, and config.toml.

use std::path::Path;

use common::config::AppConfig;
use common::Error;

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.user.auth_id.trim().is_empty() {
        issues.push("user.auth_id is required".into());
    }
    if config.user.email.trim().is_empty() {
        issues.push("user.email is required".into());
    }

    if config.storage.base_url.trim().is_empty() {
        issues.push("storage.base_url is required".into());
    }
    if config.storage.api_key.trim().is_empty() {
        issues.push("storage.api_key is required".into());
    }

    if !config.offline && config.predictor.base_url.trim().is_empty() {
        issues.push("predictor.base_url is required unless offline mode is enabled".into());
    }

    if config.retry.timeout_secs == 0 {
        issues.push("retry.timeout_secs must be > 0".into());
    }
    if config.retry.delay_secs == 0 {
        issues.push("retry.delay_secs must be > 0".into());
    }

    if config.cache.max_entries == 0 {
        issues.push("cache.max_entries must be > 0".into());
    }
    if config.cache.ttl_secs == 0 {
        issues.push("cache.ttl_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load application configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(url) = std::env::var("PREDICT_API_BASE_URL") {
        config.predictor.base_url = url;
    }
    if let Ok(url) = std::env::var("STORAGE_API_URL") {
        config.storage.base_url = url;
    }
    if let Ok(key) = std::env::var("STORAGE_API_KEY") {
        config.storage.api_key = key;
    }
    if let Ok(id) = std::env::var("ENERGY_USER_AUTH_ID") {
        config.user.auth_id = id;
    }
    if let Ok(email) = std::env::var("ENERGY_USER_EMAIL") {
        config.user.email = email;
    }
    if let Ok(raw) = std::env::var("ENERGY_OFFLINE") {
        config.offline = parse_bool(&raw);
    }
    if let Ok(raw) = std::env::var("PREDICT_TIMEOUT_SECS") {
        config.retry.timeout_secs = parse_positive_u64(&raw, "PREDICT_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("PREDICT_RETRY_DELAY_SECS") {
        config.retry.delay_secs = parse_positive_u64(&raw, "PREDICT_RETRY_DELAY_SECS")?;
    }
    if let Ok(raw) = std::env::var("PREDICT_MAX_RETRIES") {
        config.retry.max_retries = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::Config("PREDICT_MAX_RETRIES must be an integer >= 0".into()))?;
    }
    if let Ok(raw) = std::env::var("CACHE_MAX_ENTRIES") {
        config.cache.max_entries = parse_positive_u64(&raw, "CACHE_MAX_ENTRIES")? as usize;
    }
    if let Ok(raw) = std::env::var("CACHE_TTL_SECS") {
        config.cache.ttl_secs = parse_positive_u64(&raw, "CACHE_TTL_SECS")?;
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}
