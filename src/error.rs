//! Error types for privmap

use thiserror::Error;

/// The main error type for privmap operations
#[derive(Debug, Error)]
pub enum PrivmapError {
    #[error("invalid mapping entry: {0}")]
    InvalidEntry(String),

    #[error("mapping entry '{key}' conflicts with an existing registration: {reason}")]
    ConflictingEntry { key: String, reason: String },

    #[error("mapping entry '{key}' references unknown parent '{parent}'")]
    UnknownParent { key: String, parent: String },

    #[error("role '{0}' not found")]
    RoleNotFound(String),

    #[error("access denied: missing privilege '{0}'")]
    AccessDenied(String),

    #[error("invalid verification token")]
    InvalidToken,

    #[error("verification token expired")]
    TokenExpired,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("save was not requested; identity verification is pending")]
    VerificationRequired,

    #[error("entropy source failed: {0}")]
    Entropy(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<heed::Error> for PrivmapError {
    fn from(e: heed::Error) -> Self {
        PrivmapError::Storage(e.to_string())
    }
}

impl From<toml::de::Error> for PrivmapError {
    fn from(e: toml::de::Error) -> Self {
        PrivmapError::Config(e.to_string())
    }
}

/// Result type alias for privmap operations
pub type Result<T> = std::result::Result<T, PrivmapError>;
