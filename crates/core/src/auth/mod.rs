mod api_key;
mod secret;

pub use api_key::*;
pub use secret::*;

use thiserror::Error;

/// Why an API key check failed. Callers answer both variants the same way.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,
}
