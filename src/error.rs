//! Gateway Error Types
//!
//! Every failure the gateway can report, with the HTTP status and the
//! OpenAI-style error `type` each one is surfaced as.

use crate::config::Provider;
use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Inbound request used something other than POST
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// No `Authorization: Bearer <token>` header
    #[error("Missing Authorization header")]
    MissingAuthorization,

    /// Bearer token is not on the gateway allow-list
    #[error("Invalid API Key")]
    InvalidGatewayKey,

    /// Inbound body could not be understood
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// The routed provider has no credentials configured
    #[error("No {} API Keys configured on server", .0.display_name())]
    NoProviderKeys(Provider),

    /// Every credential tried was rejected (401/403/429)
    #[error("All API keys are exhausted or invalid")]
    KeysExhausted { status: StatusCode, details: String },

    /// The attempt budget ran out without any usable upstream response
    #[error("All API key attempts failed")]
    AttemptsFailed,

    /// Upstream answered with a non-credential error status
    #[error("Upstream Error: {body}")]
    Upstream { status: StatusCode, body: String },

    /// Startup configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal error
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status the error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::MissingAuthorization | GatewayError::InvalidGatewayKey => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::KeysExhausted { status, .. } => *status,
            GatewayError::AttemptsFailed => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::NoProviderKeys(_)
            | GatewayError::Config(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value of the `type` field in the error envelope
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::MethodNotAllowed | GatewayError::InvalidBody(_) => {
                "invalid_request_error"
            }
            GatewayError::MissingAuthorization | GatewayError::InvalidGatewayKey => {
                "authentication_error"
            }
            GatewayError::NoProviderKeys(_) | GatewayError::Config(_) => {
                "server_configuration_error"
            }
            GatewayError::KeysExhausted { .. } => "api_key_error",
            GatewayError::AttemptsFailed => "service_unavailable_error",
            GatewayError::Upstream { .. } => "upstream_error",
            GatewayError::Internal(_) => "server_error",
        }
    }

    /// Extra diagnostic text carried in the envelope's `details` field
    pub fn details(&self) -> Option<&str> {
        match self {
            GatewayError::KeysExhausted { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            GatewayError::Config(format!("Failed to create HTTP client: {}", err))
        } else {
            GatewayError::Internal(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Internal(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
