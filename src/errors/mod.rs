//! Error handling module for the hub client.
//!
//! Every failure a view can run into is one `ClientError`. Transport, timeout,
//! server and malformed-data failures are treated alike at the view boundary.

use serde::Deserialize;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const MALFORMED_RESPONSE: &str = "MALFORMED_RESPONSE";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// Client error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No response was received
    Transport(String),
    /// The request did not settle within the configured bound
    Timeout(String),
    /// A response arrived carrying an error envelope or a non-2xx status
    Server(String),
    /// A response arrived but could not be understood
    Malformed(String),
    /// Rejected locally before any request was sent
    Validation(String),
    /// The current session does not satisfy a guard
    Unauthorized(String),
    /// Local storage could not be read or written
    Storage(String),
}

impl ClientError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => codes::TRANSPORT_ERROR,
            ClientError::Timeout(_) => codes::TIMEOUT,
            ClientError::Server(_) => codes::SERVER_ERROR,
            ClientError::Malformed(_) => codes::MALFORMED_RESPONSE,
            ClientError::Validation(_) => codes::VALIDATION_ERROR,
            ClientError::Unauthorized(_) => codes::UNAUTHORIZED,
            ClientError::Storage(_) => codes::STORAGE_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            ClientError::Transport(msg) => msg.clone(),
            ClientError::Timeout(msg) => msg.clone(),
            ClientError::Server(msg) => msg.clone(),
            ClientError::Malformed(msg) => msg.clone(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Unauthorized(msg) => msg.clone(),
            ClientError::Storage(msg) => msg.clone(),
        }
    }

    /// True for failures that originate on the far side of the API call.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_)
                | ClientError::Timeout(_)
                | ClientError::Server(_)
                | ClientError::Malformed(_)
        )
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            tracing::warn!("Request timed out: {:?}", err);
            ClientError::Timeout(format!("Request timed out: {}", err))
        } else if err.is_decode() {
            tracing::warn!("Undecodable response: {:?}", err);
            ClientError::Malformed(format!("Undecodable response: {}", err))
        } else {
            tracing::warn!("Transport error: {:?}", err);
            ClientError::Transport(format!("Transport error: {}", err))
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!("JSON error: {:?}", err);
        ClientError::Malformed(format!("JSON error: {}", err))
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Storage error: {:?}", err);
        ClientError::Storage(format!("Storage error: {}", err))
    }
}

/// Error envelope returned by the remote API.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorEnvelope {
    /// Extract the server's message from a raw body, if it carries one.
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .filter(|msg| !msg.trim().is_empty())
    }
}
