//! HTTP Client
//!
//! Performs single upstream calls and classifies what came back.

use crate::config::GatewayConfig;
use crate::error::Result;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// A complete upstream response that ends the rotation session
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Body as lossy UTF-8, for error messages
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result of one upstream call with one key
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Any response that isn't a credential failure, successful or not
    Completed(UpstreamResponse),

    /// 401, 403 or 429: the key is unusable for this request
    CredentialFailure { status: StatusCode, body: String },

    /// No complete response was obtained
    TransportFailure(String),
}

impl AttemptOutcome {
    /// Statuses that mean "try another key"
    pub fn is_credential_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
        )
    }
}

/// One POST of a JSON body to a provider with a given key
pub trait UpstreamCaller {
    fn call(
        &self,
        url: &str,
        api_key: &str,
        extra_headers: &HeaderMap,
        body: &Value,
    ) -> impl Future<Output = AttemptOutcome> + Send;
}

/// reqwest-backed upstream caller
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,
}

impl HttpClient {
    /// Create a client with the configured transport timeouts
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Self::with_timeouts(config.upstream_timeout, config.connect_timeout)
    }

    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self { client })
    }

    fn build_headers(api_key: &str, extra_headers: &HeaderMap) -> Option<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).ok()?,
        );

        // Extra headers never replace auth or content type
        for (key, value) in extra_headers {
            if key == AUTHORIZATION || key == CONTENT_TYPE {
                continue;
            }
            headers.insert(key.clone(), value.clone());
        }

        Some(headers)
    }
}

impl UpstreamCaller for HttpClient {
    async fn call(
        &self,
        url: &str,
        api_key: &str,
        extra_headers: &HeaderMap,
        body: &Value,
    ) -> AttemptOutcome {
        let Some(headers) = Self::build_headers(api_key, extra_headers) else {
            return AttemptOutcome::TransportFailure(
                "API key contains characters not allowed in a header".to_string(),
            );
        };

        let response = match self.client.post(url).headers(headers).json(body).send().await {
            Ok(resp) => resp,
            Err(e) => return AttemptOutcome::TransportFailure(e.to_string()),
        };

        let status = response.status();

        if AttemptOutcome::is_credential_status(status) {
            return match response.text().await {
                Ok(body) => AttemptOutcome::CredentialFailure { status, body },
                Err(e) => AttemptOutcome::TransportFailure(e.to_string()),
            };
        }

        match response.bytes().await {
            Ok(body) => AttemptOutcome::Completed(UpstreamResponse { status, body }),
            Err(e) => AttemptOutcome::TransportFailure(e.to_string()),
        }
    }
}
