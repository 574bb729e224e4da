//! Error types for BV-BRC client operations.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected locally before any request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-2xx response; the body is kept verbatim.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether retrying the same request could reasonably succeed.
    ///
    /// Only transport-level failures qualify; HTTP errors carry a server
    /// verdict on the request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Connection(_))
    }

    /// Short name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Http { .. } => "http",
            Error::Timeout(_) => "timeout",
            Error::Connection(_) => "connection",
            Error::Decode(_) => "decode",
            Error::Config(_) | Error::ConfigNotFound(_) | Error::Toml(_) => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
