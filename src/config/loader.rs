//! Configuration Loader
//!
//! Builds a [`GatewayConfig`] from environment variables, once, at startup.

use crate::config::provider::{GatewayConfig, Provider, ProviderConfig, RotationPolicy};
use crate::error::{GatewayError, Result};
use crate::router::key_pool::split_key_list;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration loader reading from an environment-like source
pub struct ConfigLoader {
    config: GatewayConfig,
}

impl ConfigLoader {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = GatewayConfig::default();

        if let Some(addr) = var("LISTEN_ADDR") {
            config.listen_addr = addr.parse::<SocketAddr>().map_err(|e| {
                GatewayError::Config(format!("invalid LISTEN_ADDR {:?}: {}", addr, e))
            })?;
        }

        config.allowed_keys = split_key_list(&var("ALLOWED_KEYS").unwrap_or_default());
        config.gemini = Self::load_provider(Provider::Gemini, &var);
        config.cerebras = Self::load_provider(Provider::Cerebras, &var);

        let mut rotation = RotationPolicy::default();
        if let Some(raw) = var("MAX_KEY_ATTEMPTS") {
            rotation.max_attempts = parse_number("MAX_KEY_ATTEMPTS", &raw)?;
            if rotation.max_attempts == 0 {
                return Err(GatewayError::Config(
                    "MAX_KEY_ATTEMPTS must be at least 1".to_string(),
                ));
            }
        }
        if let Some(raw) = var("KEY_ROTATION") {
            rotation.rotate = parse_bool("KEY_ROTATION", &raw)?;
        }
        config.rotation = rotation;

        if let Some(raw) = var("UPSTREAM_TIMEOUT_SECS") {
            config.upstream_timeout =
                Duration::from_secs(parse_number("UPSTREAM_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = var("UPSTREAM_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout =
                Duration::from_secs(parse_number("UPSTREAM_CONNECT_TIMEOUT_SECS", &raw)?);
        }

        Ok(Self { config })
    }

    fn load_provider(provider: Provider, var: &impl Fn(&str) -> Option<String>) -> ProviderConfig {
        let keys = split_key_list(&var(provider.api_key_env()).unwrap_or_default());
        let config = ProviderConfig::new(provider, keys);

        match var(provider.api_base_env()) {
            Some(url) => config.with_url(url),
            None => config,
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> GatewayConfig {
        self.config
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| GatewayError::Config(format!("invalid numeric value for {name}: {raw:?}")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(GatewayError::Config(format!(
            "invalid boolean value for {name}: {raw:?} (expected true/false)"
        ))),
    }
}
