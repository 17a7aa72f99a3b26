//! Process-wide shared secret.
//!
//! One secret both authenticates API callers and signs download tokens.

use once_cell::sync::OnceCell;
use rand::RngCore;
use sha1::{Digest, Sha1};
use std::fmt;

use crate::config::AuthConfig;

/// Length of passphrase-derived and random secrets.
pub const SECRET_LEN: usize = 16;

/// Where the active secret came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    ApiKey,
    Passphrase,
    Random,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::ApiKey => "api_key",
            SecretSource::Passphrase => "passphrase",
            SecretSource::Random => "random",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret {
    bytes: Vec<u8>,
    source: SecretSource,
}

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> SecretSource {
        self.source
    }

    /// The form callers present as their API key.
    ///
    /// A configured API key is shown verbatim; derived and random secrets
    /// are shown as lowercase hex.
    pub fn display(&self) -> String {
        match self.source {
            SecretSource::ApiKey => String::from_utf8_lossy(&self.bytes).into_owned(),
            SecretSource::Passphrase | SecretSource::Random => hex::encode(&self.bytes),
        }
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("source", &self.source)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Pick the shared secret: API key, else truncated SHA-1 of the passphrase,
/// else random bytes.
pub fn derive_shared_secret(api_key: &[u8], passphrase: &str) -> SharedSecret {
    if !api_key.is_empty() {
        return SharedSecret {
            bytes: api_key.to_vec(),
            source: SecretSource::ApiKey,
        };
    }

    if !passphrase.is_empty() {
        let digest = Sha1::digest(passphrase.as_bytes());
        return SharedSecret {
            bytes: digest[..SECRET_LEN].to_vec(),
            source: SecretSource::Passphrase,
        };
    }

    let mut bytes = vec![0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    SharedSecret {
        bytes,
        source: SecretSource::Random,
    }
}

/// Derives the secret on first use and hands out the same value afterwards.
pub struct SecretProvider {
    api_key: String,
    passphrase: String,
    secret: OnceCell<SharedSecret>,
}

impl SecretProvider {
    pub fn new(api_key: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            passphrase: passphrase.into(),
            secret: OnceCell::new(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.api_key.clone().unwrap_or_default(),
            config.passphrase.clone().unwrap_or_default(),
        )
    }

    pub fn shared_secret(&self) -> &SharedSecret {
        self.secret
            .get_or_init(|| derive_shared_secret(self.api_key.as_bytes(), &self.passphrase))
    }
}

impl fmt::Debug for SecretProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretProvider")
            .field("secret", &self.secret.get())
            .finish_non_exhaustive()
    }
}
