use std::{collections::HashMap, str::FromStr, time::Duration};
use thiserror::Error;
use transport::{
    retry::RetryPolicy,
    settings::{DEFAULT_API_ENDPOINT, TransportSettings},
};

pub const ENV_PROJECT: &str = "BQJOBS_PROJECT";
pub const ENV_LOCATION: &str = "BQJOBS_LOCATION";
pub const ENV_ENDPOINT: &str = "BQJOBS_ENDPOINT";
pub const ENV_ACCESS_TOKEN: &str = "BQJOBS_ACCESS_TOKEN";
pub const ENV_POLL_INTERVAL_MS: &str = "BQJOBS_POLL_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "BQJOBS_REQUEST_TIMEOUT_MS";
pub const ENV_MAX_RETRIES: &str = "BQJOBS_MAX_RETRIES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub project_id: String,
    /// Default location for jobs that do not name one.
    pub location: Option<String>,
    pub api_endpoint: String,
    pub access_token: Option<String>,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let transport = TransportSettings::default();
        ClientConfig {
            project_id: String::new(),
            location: None,
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            access_token: None,
            poll_interval: Duration::from_millis(500),
            request_timeout: transport.request_timeout,
            retry: transport.retry,
        }
    }
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        ClientConfig {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// Reads `BQJOBS_*` settings from an environment map. Only the project is
    /// required.
    pub fn from_env(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let project_id = get(ENV_PROJECT).ok_or(ConfigError::Missing(ENV_PROJECT))?;
        let mut config = ClientConfig::new(project_id);

        config.location = get(ENV_LOCATION).map(str::to_string);
        config.access_token = get(ENV_ACCESS_TOKEN).map(str::to_string);
        if let Some(endpoint) = get(ENV_ENDPOINT) {
            config.api_endpoint = endpoint.to_string();
        }
        if let Some(ms) = parse_opt::<u64>(get(ENV_POLL_INTERVAL_MS), ENV_POLL_INTERVAL_MS)? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64>(get(ENV_REQUEST_TIMEOUT_MS), ENV_REQUEST_TIMEOUT_MS)? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_opt::<usize>(get(ENV_MAX_RETRIES), ENV_MAX_RETRIES)? {
            config.retry = RetryPolicy::new(
                retries.saturating_add(1),
                config.retry.base_delay,
                config.retry.max_delay,
            );
        }

        Ok(config)
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            api_endpoint: self.api_endpoint.clone(),
            request_timeout: self.request_timeout,
            retry: self.retry.clone(),
            ..Default::default()
        }
    }
}

fn parse_opt<T: FromStr>(raw: Option<&str>, key: &'static str) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value.parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            value: value.to_string(),
            expected: "a non-negative integer",
        })
    })
    .transpose()
}
