//! Provider Configuration
//!
//! Defines the configuration schema for the gateway and its upstream providers.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Upstream chat completion endpoint for Gemini's OpenAI-compatible API
pub const GEMINI_CHAT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

/// Upstream chat completion endpoint for Cerebras
pub const CEREBRAS_CHAT_URL: &str = "https://api.cerebras.ai/v1/chat/completions";

/// Cerebras rejects requests that don't look like they come from a browser
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Supported upstream providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    Cerebras,
}

impl Provider {
    /// Human readable name used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Cerebras => "Cerebras",
        }
    }

    /// Environment variable holding this provider's key pool
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Cerebras => "CEREBRAS_API_KEY",
        }
    }

    /// Environment variable that may override the upstream URL
    pub fn api_base_env(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_BASE",
            Provider::Cerebras => "CEREBRAS_API_BASE",
        }
    }

    /// Default chat completion URL
    pub fn default_url(&self) -> &'static str {
        match self {
            Provider::Gemini => GEMINI_CHAT_URL,
            Provider::Cerebras => CEREBRAS_CHAT_URL,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::Cerebras => write!(f, "cerebras"),
        }
    }
}

/// Configuration for a single upstream provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Which provider this is
    pub provider: Provider,

    /// Full chat completion URL
    pub url: String,

    /// Raw credentials, already split and trimmed. May be empty.
    pub api_keys: Vec<String>,

    /// Additional headers to send with requests
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Build the stock configuration for a provider
    pub fn new(provider: Provider, api_keys: Vec<String>) -> Self {
        let mut headers = HashMap::new();
        if provider == Provider::Cerebras {
            headers.insert("User-Agent".to_string(), BROWSER_USER_AGENT.to_string());
        }

        Self {
            provider,
            url: provider.default_url().to_string(),
            api_keys,
            headers,
        }
    }

    /// Point the provider at a different URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// How the rotation controller spends its attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Upper bound on upstream calls per gateway request
    pub max_attempts: usize,

    /// Rotate to another key on credential failures
    pub rotate: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rotate: true,
        }
    }
}

impl RotationPolicy {
    /// Total attempts allowed for a pool of `pool_size` keys
    pub fn attempt_budget(&self, pool_size: usize) -> usize {
        if !self.rotate || pool_size == 0 {
            return 1;
        }
        pool_size.min(self.max_attempts).max(1)
    }
}

/// Root configuration, loaded once at process start
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,

    /// Gateway tokens callers must present
    pub allowed_keys: Vec<String>,

    /// Gemini upstream
    pub gemini: ProviderConfig,

    /// Cerebras upstream
    pub cerebras: ProviderConfig,

    /// Retry behaviour
    pub rotation: RotationPolicy,

    /// Overall upstream request timeout
    pub upstream_timeout: Duration,

    /// Upstream connect timeout
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            allowed_keys: Vec::new(),
            gemini: ProviderConfig::new(Provider::Gemini, Vec::new()),
            cerebras: ProviderConfig::new(Provider::Cerebras, Vec::new()),
            rotation: RotationPolicy::default(),
            upstream_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl GatewayConfig {
    /// Get a provider configuration
    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::Cerebras => &self.cerebras,
        }
    }
}
