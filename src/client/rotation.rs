//! Key Rotation
//!
//! Drives repeated upstream calls for one gateway request, moving to a
//! fresh key whenever the current one is rejected or rate limited.

use crate::client::http::{AttemptOutcome, UpstreamCaller, UpstreamResponse};
use crate::config::RotationPolicy;
use crate::router::key_pool::{mask_key, InvalidKeys, KeyPool};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error, warn};

/// How a rotation session ended
#[derive(Debug)]
pub enum SessionOutcome {
    /// Upstream produced a non-credential response; relay it as-is
    Completed(UpstreamResponse),

    /// Every reachable key was rejected; carries the last rejection
    Exhausted { status: StatusCode, details: String },

    /// Attempt budget spent without a usable response
    AllAttemptsFailed,
}

/// Rotation state for a single gateway request
#[derive(Debug)]
pub struct RotationSession<'a> {
    pool: &'a KeyPool,
    invalid: InvalidKeys,
    current: &'a str,
    budget: usize,
    rotate: bool,
    calls: usize,
}

impl<'a> RotationSession<'a> {
    /// Start a session on the pool's first key
    pub fn new(pool: &'a KeyPool, policy: &RotationPolicy) -> Self {
        Self {
            pool,
            invalid: InvalidKeys::new(),
            current: pool.first(),
            budget: policy.attempt_budget(pool.len()),
            rotate: policy.rotate,
            calls: 0,
        }
    }

    /// Keys rejected so far
    pub fn invalid_keys(&self) -> &InvalidKeys {
        &self.invalid
    }

    /// Key used by the most recent attempt
    pub fn current_key(&self) -> &str {
        self.current
    }

    /// Number of upstream calls made
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn next_key(&self) -> Option<&'a str> {
        if !self.rotate {
            return None;
        }
        self.pool.next_unused(&self.invalid, self.current)
    }

    /// Run attempts until a terminal outcome is reached
    pub async fn run<C: UpstreamCaller>(
        &mut self,
        caller: &C,
        url: &str,
        extra_headers: &HeaderMap,
        body: &Value,
    ) -> SessionOutcome {
        let provider = self.pool.provider();
        let mut attempts = 0;

        while attempts < self.budget {
            self.calls += 1;
            debug!(%provider, attempt = self.calls, key = %mask_key(self.current), "Calling upstream");

            match caller.call(url, self.current, extra_headers, body).await {
                AttemptOutcome::Completed(response) => return SessionOutcome::Completed(response),

                AttemptOutcome::CredentialFailure { status, body } => {
                    warn!(
                        %provider,
                        status = status.as_u16(),
                        key = %mask_key(self.current),
                        body = %truncate(&body, 500),
                        "API key failed"
                    );
                    self.invalid.insert(self.current);

                    match self.next_key() {
                        Some(next) => {
                            self.current = next;
                            attempts += 1;
                        }
                        None => {
                            return SessionOutcome::Exhausted {
                                status,
                                details: body,
                            }
                        }
                    }
                }

                AttemptOutcome::TransportFailure(err) => {
                    error!(%provider, attempt = self.calls, error = %err, "Upstream request failed");
                    attempts += 1;

                    // Without an alternative the same key is tried again
                    if let Some(next) = self.next_key() {
                        self.current = next;
                    }
                }
            }
        }

        SessionOutcome::AllAttemptsFailed
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
