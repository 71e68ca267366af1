//! Error types for docrepo

use thiserror::Error;

/// Result type alias
pub type RepoResult<T> = Result<T, RepoError>;

/// Main error type
#[derive(Error, Debug)]
pub enum RepoError {
    /// Id does not resolve, or resolves to the wrong base type
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider API error ({provider}): {message}")]
    ProviderApi { provider: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl RepoError {
    /// Errors that must reach the caller instead of degrading to an empty entity
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RepoError::BackendUnreachable(_) | RepoError::UnsupportedBackend(_) | RepoError::Config(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            RepoError::NotFound(_) => true,
            RepoError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
