use client::ConfigError;
use engine_core::{ClientError, FetchError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    InvalidSettings(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to fetch results: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to read the query file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Shutdown requested")]
    ShutdownRequested,
}

impl CliError {
    pub fn is_shutdown(&self) -> bool {
        matches!(
            self,
            CliError::ShutdownRequested | CliError::Client(ClientError::Cancelled)
        )
    }
}
