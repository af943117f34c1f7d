//! Crate-level error types.
//!
//! [`FathomError`] unifies every error source (configuration, inbound
//! message decoding) behind a single enum so callers can match on the
//! variant they care about while still using the `?` operator for easy
//! propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FathomError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum FathomError {
    /// A configuration value was missing, malformed, or out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// An inbound book message was structurally invalid.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
