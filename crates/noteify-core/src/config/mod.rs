//! Client configuration.
//!
//! `ClientConfig` tells every front end where the notes API and the optional
//! summary endpoint live and how the sync layer behaves. Values come from the
//! environment (see [`ClientConfig::from_env`]) or from explicit construction.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::util::{normalize_base_url, normalize_text_option};

pub const ENV_API_URL: &str = "NOTEIFY_API_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "NOTEIFY_REQUEST_TIMEOUT_SECS";
pub const ENV_SUMMARY_URL: &str = "NOTEIFY_SUMMARY_URL";
pub const ENV_SUMMARY_API_KEY: &str = "NOTEIFY_SUMMARY_API_KEY";
pub const ENV_FLUSH_ON_SWITCH: &str = "NOTEIFY_FLUSH_ON_SWITCH";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the notes API, without trailing slash
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub summary_url: Option<String>,
    pub summary_api_key: Option<String>,
    /// Save a pending autosave immediately when the open note changes
    pub flush_on_switch: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("summary_url", &self.summary_url)
            .field(
                "summary_api_key",
                &self.summary_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("flush_on_switch", &self.flush_on_switch)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration for an explicit API base URL with defaults for everything else.
    pub fn new(api_base_url: impl AsRef<str>) -> Result<Self, ConfigError> {
        let api_base_url = normalize_base_url(api_base_url.as_ref()).ok_or_else(|| {
            ConfigError::Invalid("API base URL must start with http:// or https://".to_string())
        })?;
        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            summary_url: None,
            summary_api_key: None,
            flush_on_switch: false,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = required_trimmed(&lookup, ENV_API_URL)?;
        let mut config = Self::new(&api_base_url).map_err(|_| {
            ConfigError::Invalid(format!("{ENV_API_URL} must start with http:// or https://"))
        })?;

        if let Some(raw) = optional_trimmed(&lookup, ENV_REQUEST_TIMEOUT_SECS) {
            let secs = raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be an integer in [1, 120]"
                ))
            })?;
            if !(1..=120).contains(&secs) {
                return Err(ConfigError::Invalid(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be in [1, 120]"
                )));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(url) = optional_trimmed(&lookup, ENV_SUMMARY_URL) {
            let url = normalize_base_url(&url).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{ENV_SUMMARY_URL} must start with http:// or https://"
                ))
            })?;
            config.summary_url = Some(url);
        }
        config.summary_api_key = optional_trimmed(&lookup, ENV_SUMMARY_API_KEY);

        if let Some(raw) = optional_trimmed(&lookup, ENV_FLUSH_ON_SWITCH) {
            config.flush_on_switch = parse_bool(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("{ENV_FLUSH_ON_SWITCH} must be a boolean"))
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}
