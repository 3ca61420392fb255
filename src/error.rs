//! Error types for Kondate
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Kondate operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, relay and vendor API calls, and conversation
/// storage.
#[derive(Error, Debug)]
pub enum KondateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Vendor API errors (upstream chat-messages calls)
    #[error("Vendor error: {0}")]
    Vendor(String),

    /// Vendor API returned a non-success HTTP status
    #[error("Vendor API error: status={status}, {details}")]
    VendorStatus {
        /// HTTP status code reported by the vendor
        status: u16,
        /// Best-effort detail text from the vendor response body
        details: String,
    },

    /// Relay errors (requests from the chat client to the relay server)
    #[error("Relay error: {0}")]
    Relay(String),

    /// Missing credentials for the vendor API
    #[error("Missing credentials for vendor: {0}")]
    MissingCredentials(String),

    /// Conversation storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

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

/// Result type alias for Kondate operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
