//! API Key Pool Management
//!
//! Per-request pool of upstream credentials and the set of keys that have
//! been rejected while serving that request.

use crate::config::Provider;
use crate::error::{GatewayError, Result};
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Split a comma-separated key list, trimming whitespace and dropping empties
pub fn split_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Short, log-safe rendering of a key
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Keys rejected during one gateway request
#[derive(Debug, Default, Clone)]
pub struct InvalidKeys {
    keys: HashSet<String>,
}

impl InvalidKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as rejected
    pub fn insert(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Ordered, non-empty pool of keys for one provider
#[derive(Debug, Clone)]
pub struct KeyPool {
    /// Provider this pool belongs to
    provider: Provider,

    /// Keys in selection order
    keys: Vec<String>,
}

impl KeyPool {
    /// Create a pool; an empty key list is a configuration error
    pub fn new(provider: Provider, keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            return Err(GatewayError::NoProviderKeys(provider));
        }
        Ok(Self { provider, keys })
    }

    /// Create a pool from a raw comma-separated value
    pub fn parse(provider: Provider, raw: &str) -> Result<Self> {
        Self::new(provider, split_key_list(raw))
    }

    /// Get the provider
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Get the number of keys in the pool
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a constructed pool
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Randomize key order to spread load across keys
    pub fn shuffle(&mut self) {
        self.keys.shuffle(&mut rand::thread_rng());
    }

    /// The key a request starts with
    pub fn first(&self) -> &str {
        &self.keys[0]
    }

    /// First key that is neither rejected nor the one just tried
    pub fn next_unused(&self, invalid: &InvalidKeys, current: &str) -> Option<&str> {
        self.keys
            .iter()
            .map(String::as_str)
            .find(|k| *k != current && !invalid.contains(k))
    }
}
