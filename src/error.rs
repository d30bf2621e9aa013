//! Error types for Parlance
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parlance operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, account management, completion streaming,
/// and conversation storage.
#[derive(Error, Debug)]
pub enum ParlanceError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Account validation errors (signup/login/plan selection)
    ///
    /// These are always surfaced inline to the user and are never fatal.
    #[error("{0}")]
    Auth(String),

    /// Completion endpoint errors (connection failures, non-2xx statuses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// No user is logged in but the operation requires one
    #[error("Not logged in. Run `parlance login` or `parlance signup` first.")]
    NotLoggedIn,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Parlance operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
