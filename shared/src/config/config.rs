use std::fs;
use tracing::{debug, error, info};

use crate::types::client_config::{AppConfig, ConfigError};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    parse_config(&contents)
}

/// Parse and validate configuration text. Split out of [`load_config`] so
/// embedded defaults and tests skip the filesystem.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let base_url = config.api.resolved_base_url();
    if base_url.is_empty() {
        return Err(ConfigError::InvalidConfig(
            "api.base_url must be set via the CAFE_API_URL env var or the config file".into(),
        ));
    }

    if !base_url.starts_with("http://") {
        return Err(ConfigError::InvalidConfig(format!(
            "api.base_url must be a plain http:// URL, got {}",
            base_url
        )));
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "api.timeout_secs must be greater than 0".into(),
        ));
    }

    if config.storage.path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidConfig("storage.path cannot be empty".into()));
    }

    if config.storage.token_key.trim().is_empty() || config.storage.user_key.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "storage.token_key and storage.user_key cannot be empty".into(),
        ));
    }

    // Both entries live in one map; a shared key would let the user record
    // overwrite the token.
    if config.storage.token_key == config.storage.user_key {
        return Err(ConfigError::InvalidConfig(
            "storage.token_key and storage.user_key must differ".into(),
        ));
    }

    if config.admin.primary_creator.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "admin.primary_creator cannot be empty".into(),
        ));
    }

    if config.admin.undo_window_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "admin.undo_window_secs must be greater than 0".into(),
        ));
    }

    Ok(())
}
