//! Configuration Module
//!
//! Handles gateway and provider configuration loading.

pub mod loader;
pub mod provider;

pub use loader::ConfigLoader;
pub use provider::{GatewayConfig, Provider, ProviderConfig, RotationPolicy};
