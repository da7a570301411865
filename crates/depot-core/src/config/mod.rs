//! Client configuration loaded from the environment.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::RetryPolicy;
use crate::models::UserType;
use crate::util::{is_http_url, normalize_text_option};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for talking to the download API.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    /// Session defaults used when a command does not name them
    pub user_type: Option<UserType>,
    pub user_id: Option<i64>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("http_timeout", &self.http_timeout)
            .field("retry", &self.retry)
            .field("user_type", &self.user_type)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl ClientConfig {
    /// Minimal configuration for an explicit base URL.
    pub fn new(api_base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let api_base_url = normalize_base_url(&api_base_url.into())?;
        Ok(Self {
            api_base_url,
            api_token: None,
            http_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            user_type: None,
            user_id: None,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = required_trimmed(&lookup, "DEPOT_API_BASE_URL")?;
        let api_base_url = normalize_base_url(&api_base_url)?;
        let api_token = optional_trimmed(&lookup, "DEPOT_API_TOKEN");

        let timeout_secs = parse_in_range(&lookup, "DEPOT_HTTP_TIMEOUT_SECS", "30", 1, 600)?;
        let max_attempts = parse_in_range(&lookup, "DEPOT_RETRY_MAX_ATTEMPTS", "3", 1, 10)?;
        let base_delay_ms =
            parse_in_range(&lookup, "DEPOT_RETRY_BASE_DELAY_MS", "500", 0, 60_000)?;
        let max_delay_ms =
            parse_in_range(&lookup, "DEPOT_RETRY_MAX_DELAY_MS", "8000", 0, 300_000)?;
        if max_delay_ms < base_delay_ms {
            return Err(ConfigError::Invalid(
                "DEPOT_RETRY_MAX_DELAY_MS must be >= DEPOT_RETRY_BASE_DELAY_MS".to_string(),
            ));
        }

        let user_type = optional_trimmed(&lookup, "DEPOT_USER_TYPE")
            .map(|value| {
                value.parse::<UserType>().map_err(|_| {
                    ConfigError::Invalid(format!(
                        "DEPOT_USER_TYPE must be a user type code or name, got '{value}'"
                    ))
                })
            })
            .transpose()?;
        let user_id = optional_trimmed(&lookup, "DEPOT_USER_ID")
            .map(|value| {
                value.parse::<i64>().map_err(|_| {
                    ConfigError::Invalid("DEPOT_USER_ID must be an integer".to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            api_base_url,
            api_token,
            http_timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy {
                // Bounded above, so the narrowing cast cannot truncate
                max_attempts: u32::try_from(max_attempts).unwrap_or(u32::MAX),
                base_delay: Duration::from_millis(base_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
            },
            user_type,
            user_id,
        })
    }
}

fn normalize_base_url(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !is_http_url(trimmed) {
        return Err(ConfigError::Invalid(
            "DEPOT_API_BASE_URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn parse_in_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    min: u64,
    max: u64,
) -> Result<u64, ConfigError> {
    let value = optional_trimmed(lookup, name)
        .unwrap_or_else(|| default.to_string())
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]")))?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(value)
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}
