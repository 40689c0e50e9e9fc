//! Model Routing
//!
//! Maps a requested model name onto an upstream provider route.

use crate::config::{GatewayConfig, Provider, ProviderConfig};
use crate::error::{GatewayError, Result};
use crate::router::key_pool::KeyPool;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

/// Everything needed to forward one request to a provider
#[derive(Debug, Clone)]
pub struct ProviderRoute {
    /// Selected provider
    pub provider: Provider,

    /// Chat completion URL
    pub url: String,

    /// Keys for this request
    pub pool: KeyPool,

    /// Headers added to every upstream call
    pub extra_headers: HeaderMap,

    /// Fields merged over the outbound body
    pub extra_body: Map<String, Value>,
}

/// Picks a provider from the model name
#[derive(Debug, Clone)]
pub struct ModelRouter {
    gemini: ProviderConfig,
    cerebras: ProviderConfig,
}

impl ModelRouter {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            gemini: config.gemini.clone(),
            cerebras: config.cerebras.clone(),
        }
    }

    /// Provider serving a model name
    pub fn provider_for(model: &str) -> Provider {
        if model.starts_with("gemini") {
            Provider::Gemini
        } else {
            Provider::Cerebras
        }
    }

    /// Resolve the route for a model; fails if the provider has no keys
    pub fn route(&self, model: &str) -> Result<ProviderRoute> {
        let provider = Self::provider_for(model);
        let config = match provider {
            Provider::Gemini => &self.gemini,
            Provider::Cerebras => &self.cerebras,
        };

        let pool = KeyPool::new(provider, config.api_keys.clone())?;

        let mut extra_headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::try_from(key.as_str())
                .map_err(|e| GatewayError::Config(format!("Invalid header name {key}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| GatewayError::Config(format!("Invalid header value for {key}: {e}")))?;
            extra_headers.insert(name, value);
        }

        let mut extra_body = Map::new();
        if provider == Provider::Gemini && model.contains("gemini-3") {
            extra_body.insert(
                "reasoning_effort".to_string(),
                Value::String("high".to_string()),
            );
        }

        Ok(ProviderRoute {
            provider,
            url: config.url.clone(),
            pool,
            extra_headers,
            extra_body,
        })
    }
}
