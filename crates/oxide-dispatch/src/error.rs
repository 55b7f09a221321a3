//! Error types for routing.

use thiserror::Error;

/// Router-specific errors.
///
/// All of these surface at registration or configuration time. Nothing
/// that happens while serving a request is reported through this type.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid path pattern.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),

    /// A handler is already registered for this method and pattern.
    #[error("route already registered: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    /// The value passed as a handler has no known handler form.
    #[error("unsupported handler type for {method} {path}")]
    UnsupportedHandler { method: String, path: String },

    /// The method token is empty or contains invalid characters.
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    /// Router configuration could not be parsed.
    #[error("invalid router configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
