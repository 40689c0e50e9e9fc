//! Chat Completion API
//!
//! Inbound request shape and the error envelope returned to callers.

use crate::error::GatewayError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound chat completion request
///
/// Only `model` is interpreted; everything else, `messages` included, is
/// forwarded exactly as received, except `stream` which is always sent
/// upstream as `false` whatever its inbound type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Requested model, used for routing
    pub model: String,

    /// Caller's streaming preference (ignored)
    #[serde(default, skip_serializing)]
    pub stream: Option<Value>,

    /// All other parameters
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatRequest {
    /// Parse a raw inbound body
    pub fn from_slice(body: &[u8]) -> Result<Self, GatewayError> {
        serde_json::from_slice(body).map_err(|e| GatewayError::InvalidBody(e.to_string()))
    }

    /// Build the outbound body: caller fields, forced non-streaming,
    /// then provider-specific fields on top
    pub fn into_upstream_body(self, extra_body: &Map<String, Value>) -> Value {
        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(self.model));
        for (key, value) in self.extra {
            body.insert(key, value);
        }
        body.insert("stream".to_string(), Value::Bool(false));

        for (key, value) in extra_body {
            body.insert(key.clone(), value.clone());
        }

        Value::Object(body)
    }
}

/// Error body: `{"error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,

    #[serde(rename = "type")]
    pub error_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(err: &GatewayError) -> Self {
        Self {
            error: ErrorDetail {
                message: err.to_string(),
                error_type: err.error_type().to_string(),
                details: err.details().map(str::to_string),
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::from(&self))).into_response()
    }
}
