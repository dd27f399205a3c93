use crate::processor::ProcessedError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for campaign-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error types for the synchronization engine
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Campaign '{entity_id}' not found")]
    EntityNotFound { entity_id: String },

    #[error("A mutation for campaign '{entity_id}' is already pending")]
    ConcurrentMutation { entity_id: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Remote call failed: {}", .0.classification.technical_message)]
    Remote(Box<ProcessedError>),
}

impl SyncError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new entity-not-found error
    pub fn entity_not_found<S: Into<String>>(entity_id: S) -> Self {
        Self::EntityNotFound {
            entity_id: entity_id.into(),
        }
    }

    /// Create a new concurrent-mutation error
    pub fn concurrent_mutation<S: Into<String>>(entity_id: S) -> Self {
        Self::ConcurrentMutation {
            entity_id: entity_id.into(),
        }
    }

    /// Access the processed error when a failed remote call is the cause
    pub fn processed(&self) -> Option<&ProcessedError> {
        match self {
            Self::Remote(processed) => Some(processed),
            _ => None,
        }
    }
}
