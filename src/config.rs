//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://donatify-api-205718923595.southamerica-east1.run.app/api";
pub const DEFAULT_STORE_PATH: &str = ".donatify/session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DONATIFY_BASE_URL must not be empty")]
    EmptyBaseUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, without a trailing slash (e.g. `https://host/api`).
    pub base_url: String,
    /// JSON file backing the persisted token record.
    pub store_path: PathBuf,
    pub timeouts: HttpTimeouts,
}

impl ClientConfig {
    /// Build typed client config from process environment variables.
    ///
    /// Optional:
    /// - `DONATIFY_BASE_URL`: API root, default production host
    /// - `DONATIFY_STORE_PATH`: default `.donatify/session.json`
    /// - `DONATIFY_REQUEST_TIMEOUT_SECS`: default 30
    /// - `DONATIFY_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if `DONATIFY_BASE_URL` is set but blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same parsing as [`ClientConfig::from_env`] against an arbitrary lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("DONATIFY_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = normalize_base_url(&base_url)?;
        let store_path = lookup("DONATIFY_STORE_PATH")
            .filter(|raw| !raw.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from);
        let timeouts = HttpTimeouts {
            request_secs: parse_u64(lookup("DONATIFY_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("DONATIFY_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, store_path, timeouts })
    }

    /// Override the API root, e.g. from a CLI flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the new base URL is blank.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    Ok(trimmed.to_owned())
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
