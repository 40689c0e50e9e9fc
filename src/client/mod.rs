//! Client Module
//!
//! Upstream HTTP calls and key rotation.

pub mod http;
pub mod rotation;

pub use http::{AttemptOutcome, HttpClient, UpstreamCaller, UpstreamResponse};
pub use rotation::{RotationSession, SessionOutcome};
