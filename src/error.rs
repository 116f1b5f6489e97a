//! Error types for the copilot client.

use thiserror::Error;

/// Crate error type.
///
/// The chat engine never surfaces these to the presentation layer; they are
/// resolved into a visible message at the turn boundary. The history client
/// and configuration loader return them directly.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before or during the response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The backend accepted the request but sent no body to stream.
    #[error("No response body")]
    MissingBody,

    /// A chunk could not be decoded as UTF-8 text.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No data arrived within the configured idle timeout.
    #[error("Timed out waiting for the retrieval service")]
    Timeout,

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for copilot operations.
pub type Result<T> = std::result::Result<T, Error>;
