//! keygate - OpenAI-compatible chat completion gateway
//!
//! Authenticates callers against a static token allow-list, routes each
//! request to Gemini or Cerebras by model name, and forwards it with one of
//! several pooled upstream keys, rotating to another key when the current
//! one is rejected or rate limited.

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{error, info, warn};

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod router;

pub use api::{app, ChatRequest, ErrorResponse};
pub use client::{HttpClient, RotationSession, SessionOutcome, UpstreamCaller};
pub use config::{ConfigLoader, GatewayConfig, Provider, RotationPolicy};
pub use error::{GatewayError, Result};
pub use router::{KeyPool, ModelRouter, ProviderRoute};

/// Successful upstream reply, ready to relay
#[derive(Debug, Clone)]
pub struct Completion {
    /// Provider that served the request
    pub provider: Provider,

    /// Upstream status (2xx)
    pub status: StatusCode,

    /// Parsed upstream body
    pub body: Value,
}

/// The gateway core
pub struct Gateway {
    /// Tokens accepted from callers
    allowed_keys: HashSet<String>,

    /// Model to provider routing
    router: ModelRouter,

    /// Retry behaviour
    rotation: RotationPolicy,

    /// HTTP client
    http_client: HttpClient,
}

impl Gateway {
    /// Create a gateway from a loaded configuration
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            allowed_keys: config.allowed_keys.iter().cloned().collect(),
            router: ModelRouter::new(config),
            rotation: config.rotation.clone(),
            http_client: HttpClient::new(config)?,
        })
    }

    /// Check the caller's `Authorization: Bearer <token>` header
    pub fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(GatewayError::MissingAuthorization)?;

        let token = token.split(' ').next().unwrap_or_default();
        if !self.allowed_keys.contains(token) {
            warn!("Rejected request with unknown gateway key");
            return Err(GatewayError::InvalidGatewayKey);
        }

        Ok(())
    }

    /// Forward a chat completion upstream, rotating keys as needed
    pub async fn complete(&self, request: ChatRequest) -> Result<Completion> {
        let mut route = self.router.route(&request.model)?;
        route.pool.shuffle();

        let provider = route.provider;
        info!(%provider, pool_size = route.pool.len(), model = %request.model, "Using initial API key");

        let body = request.into_upstream_body(&route.extra_body);
        let mut session = RotationSession::new(&route.pool, &self.rotation);
        let outcome = session
            .run(&self.http_client, &route.url, &route.extra_headers, &body)
            .await;

        match outcome {
            SessionOutcome::Completed(response) if response.status.is_success() => {
                let body: Value = serde_json::from_slice(&response.body)?;
                Ok(Completion {
                    provider,
                    status: response.status,
                    body,
                })
            }
            SessionOutcome::Completed(response) => {
                let text = response.text();
                error!(%provider, status = response.status.as_u16(), body = %text, "Upstream error");
                Err(GatewayError::Upstream {
                    status: response.status,
                    body: text,
                })
            }
            SessionOutcome::Exhausted { status, details } => {
                error!(%provider, status = status.as_u16(), calls = session.calls(), "All keys exhausted");
                Err(GatewayError::KeysExhausted { status, details })
            }
            SessionOutcome::AllAttemptsFailed => {
                error!(%provider, calls = session.calls(), "All key attempts failed");
                Err(GatewayError::AttemptsFailed)
            }
        }
    }
}
