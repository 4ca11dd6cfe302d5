use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tether_common::deep_link::LinkConfig;

pub const API_URL_VAR: &str = "TETHER_API_URL";
pub const AUTH_TOKEN_VAR: &str = "TETHER_AUTH_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Sent as a bearer token on every request.
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
    pub links: LinkConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from("http://127.0.0.1:8000"),
            auth_token: None,
            request_timeout_secs: 30,
            links: LinkConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var(API_URL_VAR) {
            self.api_base_url = url;
        }
        if let Ok(token) = env::var(AUTH_TOKEN_VAR) {
            self.auth_token = Some(token).filter(|t| !t.is_empty());
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"apiBaseUrl":"https://api.example.org","links":{"scheme":"demo"}}"#)
                .unwrap();
        assert_eq!(config.api_base_url, "https://api.example.org");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.links.scheme, "demo");
        assert_eq!(config.links.invite_path, "/invite");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ClientConfig::load_from("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }
}
