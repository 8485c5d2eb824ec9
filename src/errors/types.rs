//! Error type definitions for the plant telemetry service
//!
//! Transport faults on the metrics feed are classified here so the ingest
//! client can log and retry them locally; they are never surfaced to
//! consumers of the store.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O errors (config file access, socket binding)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Listen address could not be parsed
    #[error("Invalid listen address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Faults on the long-lived metrics stream connection.
///
/// Every variant is recoverable: the client logs it and retries after the
/// configured reconnect delay.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The GET request could not be sent or the connection was refused
    #[error("Connection failed: {url} - {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// The response body failed mid-stream
    #[error("Stream read failed: {0}")]
    Read(#[source] reqwest::Error),
}

impl AppError {
    /// Create a configuration error with a custom message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
