//! Error type for host-facing operations
//!
//! Session outcomes (no provider, refusal, timeout) are statuses, not errors.
//! These errors cover malformed host messages and platform failures.

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Invalid location request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("Unknown location action: {0}")]
    UnknownAction(String),

    #[error("Location source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LocationError>;
