// File: src/error.rs
//! Errors from the I/O edges of the crate. Gameplay itself never fails:
//! bad input is reported through [`crate::core::engine::Outcome`].

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("analytics sink unavailable: {0}")]
    Analytics(String),
}
