//! DraftyFox Error Types
//!
//! Centralized error handling for both sides of the process boundary.

use thiserror::Error;

/// Message shown when the inference proxy cannot be reached.
pub const PROXY_UNREACHABLE_MESSAGE: &str =
    "DraftyFox was updated or restarted. Refresh the page and try again.";

/// Message shown when no API key is configured.
pub const MISSING_API_KEY_MESSAGE: &str =
    "API key not configured. Click the DraftyFox extension icon to set it up.";

/// Message shown when a request does not fit through the IPC socket.
pub const SELECTION_TOO_LARGE_MESSAGE: &str = "The selection is too large to rewrite.";

/// Central error type for DraftyFox
#[derive(Error, Debug)]
pub enum DraftError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inference proxy unreachable: {0}")]
    ProxyUnreachable(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Request rejected by the inference proxy: {0}")]
    Rejected(String),

    #[error("Replacement error: {0}")]
    Replace(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DraftError {
    /// Text rendered inline in the action menu.
    ///
    /// Configuration and provider errors are shown as-is. Transport failures
    /// never leak the raw channel message to the user.
    pub fn user_message(&self) -> String {
        match self {
            DraftError::Config(msg)
            | DraftError::Provider(msg)
            | DraftError::Rejected(msg)
            | DraftError::Replace(msg) => msg.clone(),
            DraftError::ProxyUnreachable(_) => PROXY_UNREACHABLE_MESSAGE.to_string(),
            DraftError::Http(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for DraftyFox operations
pub type DraftResult<T> = Result<T, DraftError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for DraftError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        DraftError::Lock(err.to_string())
    }
}
