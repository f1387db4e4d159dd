use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Where the backend lives.
///
/// `base_url` has no default: historical builds pointed at different hosts
/// and ports, so the deployment must say which one is real.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Durable session storage. Both keys are required for the same reason as
/// `base_url`: older builds disagreed on them.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub token_key: String,
    pub user_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Username of the account nobody may delete.
    pub primary_creator: String,
    #[serde(default = "default_undo_window_secs")]
    pub undo_window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub admin: AdminConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ApiConfig {
    /// Base URL with `CAFE_API_URL` taking priority over the config file,
    /// trailing slashes removed.
    pub fn resolved_base_url(&self) -> String {
        std::env::var("CAFE_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.base_url.clone())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AdminConfig {
    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_timeout_secs() -> u64 {
    10
}

pub fn default_undo_window_secs() -> u64 {
    8
}
