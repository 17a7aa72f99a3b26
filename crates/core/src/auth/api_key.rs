//! API key authentication.

use std::sync::Arc;
use tracing::{trace, warn};

use super::{AuthError, SecretProvider};
use crate::metrics::AUTH_FAILURES;

/// Validates caller API keys against the display form of the shared secret.
#[derive(Debug, Clone)]
pub struct ApiKeyAuthenticator {
    secrets: Arc<SecretProvider>,
}

impl ApiKeyAuthenticator {
    pub fn new(secrets: Arc<SecretProvider>) -> Self {
        Self { secrets }
    }

    /// Returns true when `candidate` is the current API key.
    pub fn check_api_key(&self, candidate: &str) -> bool {
        let expected = self.secrets.shared_secret().display();

        if constant_time_eq(candidate.as_bytes(), expected.as_bytes()) {
            return true;
        }

        warn!("API key mismatch");
        trace!(expected = %expected, "Expected API key");
        false
    }

    /// Check an optional key, recording why it failed.
    pub fn authenticate(&self, candidate: Option<&str>) -> Result<(), AuthError> {
        let candidate = match candidate {
            Some(key) if !key.is_empty() => key,
            _ => {
                AUTH_FAILURES.with_label_values(&["missing"]).inc();
                return Err(AuthError::NotAuthenticated);
            }
        };

        if self.check_api_key(candidate) {
            Ok(())
        } else {
            AUTH_FAILURES.with_label_values(&["invalid"]).inc();
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
