//! Error types for the mediator

use openhim_client::HubError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No {stem}.json, {stem}.yaml or {stem}.yml found in {}", dir.display())]
    NotFound { dir: PathBuf, stem: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

/// Downstream facilities API errors
#[derive(Error, Debug)]
pub enum FacilitiesError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

/// Top-level mediator errors
#[derive(Error, Debug)]
pub enum MediatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hub error: {0}")]
    Hub(#[from] HubError),

    #[error("Facilities client error: {0}")]
    Facilities(#[from] FacilitiesError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MediatorError>;
