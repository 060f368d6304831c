use store::StorageError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::context::ContextError;
use crate::transport::TransportError;

/// Errors returned to plugins by capability calls.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("Framework has been terminated")]
    Terminated,

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("Invalid binding: {0}")]
    InvalidBinding(String),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FrameworkResult<T> = Result<T, FrameworkError>;
