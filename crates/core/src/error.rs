//! Error taxonomy shared by every client.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Result alias over [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can end a request unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Transport-level failure or missing response.
    #[error("network request failed: {0}")]
    Network(String),

    /// Status outside 200..=299.
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body does not match the expected JSON shape.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// A request is already in flight on this client.
    #[error("a request is already in progress")]
    Busy,

    /// Required configuration is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// The in-flight request was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,

    /// The request was rejected before sending.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// The error code reported to listeners.
    ///
    /// HTTP status errors report the numeric status as text.
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            Self::Network(_) => "NETWORK_ERROR".into(),
            Self::Status { status, .. } => status.to_string().into(),
            Self::Parse(_) => "PARSE_ERROR".into(),
            Self::Busy => "REQUEST_IN_PROGRESS".into(),
            Self::Config(_) => "CONFIG_ERROR".into(),
            Self::Cancelled => "CANCELLED".into(),
            Self::InvalidRequest(_) => "INVALID_REQUEST".into(),
        }
    }

    /// The human readable message reported to listeners.
    pub fn message(&self) -> String {
        match self {
            Self::Network(msg) | Self::Parse(msg) | Self::Config(msg) => msg.clone(),
            Self::InvalidRequest(msg) => msg.clone(),
            Self::Status { body, .. } => body.clone(),
            Self::Busy => "A request is already in progress".into(),
            Self::Cancelled => "Request was cancelled".into(),
        }
    }

    /// Build a parse error from anything displayable.
    pub fn parse(err: impl std::fmt::Display) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// The `(code, message)` pair carried by error events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorInfo {
    /// Machine readable code, e.g. `NETWORK_ERROR` or `500`
    pub code: String,

    /// Human readable message
    pub message: String,
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code().into_owned(),
            message: err.message(),
        }
    }
}

impl From<Error> for ErrorInfo {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}
