//! Error types for the Bassa API client.
//!
//! # Design
//! Validation failures (`InvalidUrl`, `IncompleteParams`,
//! `InvalidEmailFormat`) are raised before any network I/O so a bad call
//! never reaches the wire. `ResponseError` carries the raw status and body
//! for debugging; transport-level failures land in `Transport` after the
//! retry budget is spent.

use std::fmt;

/// Errors returned by `BassaClient` operations.
#[derive(Debug)]
pub enum ApiError {
    /// The base URL is not a well-formed http(s)/ftp(s) URL.
    InvalidUrl(String),

    /// A required argument is missing or empty; carries the parameter name.
    IncompleteParams(&'static str),

    /// An email argument does not match the expected address shape.
    InvalidEmailFormat(String),

    /// The server returned a non-200 status.
    ResponseError { status: u16, body: String },

    /// The response body could not be parsed as JSON.
    Deserialization(String),

    /// A request payload could not be serialized.
    Serialization(String),

    /// Connection or timeout failure, surfaced after retries are exhausted.
    Transport(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidUrl(url) => write!(f, "invalid base URL: {url}"),
            ApiError::IncompleteParams(param) => {
                write!(f, "required parameter `{param}` is missing or empty")
            }
            ApiError::InvalidEmailFormat(email) => {
                write!(f, "invalid email format: {email}")
            }
            ApiError::ResponseError { status, body } => {
                write!(f, "HTTP {status}: {body}")
            }
            ApiError::Deserialization(msg) => {
                write!(f, "deserialization failed: {msg}")
            }
            ApiError::Serialization(msg) => write!(f, "serialization failed: {msg}"),
            ApiError::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
