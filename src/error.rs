//! Error types for the ayanfe-core library.
//!
//! This module provides custom error types using `thiserror` for the storage,
//! catalog and tracking layers. Application-edge code (CLI, configuration,
//! validation) uses `anyhow` instead.

use thiserror::Error;

/// Errors that can occur in the ayanfe-core library.
#[derive(Error, Debug)]
pub enum AyanfeError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Achievement catalog could not be parsed
    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller supplied data that failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Achievement not found
    #[error("Achievement not found: {0}")]
    AchievementNotFound(i64),

    /// Badge not found
    #[error("Badge not found: {0}")]
    BadgeNotFound(i64),

    /// Unlock notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with AyanfeError
pub type Result<T> = std::result::Result<T, AyanfeError>;

impl From<anyhow::Error> for AyanfeError {
    fn from(err: anyhow::Error) -> Self {
        AyanfeError::Other(err.to_string())
    }
}

impl From<config::ConfigError> for AyanfeError {
    fn from(err: config::ConfigError) -> Self {
        AyanfeError::InvalidConfig(err.to_string())
    }
}
