//! Router Module
//!
//! Handles model routing and API key pool management.

pub mod key_pool;
pub mod strategy;

pub use key_pool::{mask_key, split_key_list, InvalidKeys, KeyPool};
pub use strategy::{ModelRouter, ProviderRoute};
