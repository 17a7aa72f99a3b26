//! Signed download tokens.
//!
//! A token carries the indexer name and the indexer-side link of a result so
//! the server can fetch it later without ever showing that link to clients.
//! Wire form: `base64url(json) "." base64url(hmac_sha256(secret, json))`,
//! unpadded, which keeps it safe inside a URL path segment.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::auth::SharedSecret;
use crate::metrics::{TOKENS_ISSUED, TOKENS_REJECTED};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadToken {
    #[serde(rename = "site")]
    pub indexer: String,
    #[serde(rename = "link")]
    pub source_link: String,
}

impl DownloadToken {
    pub fn new(indexer: impl Into<String>, source_link: impl Into<String>) -> Self {
        Self {
            indexer: indexer.into(),
            source_link: source_link.into(),
        }
    }

    /// Deterministic: the same token and secret always give the same string.
    pub fn encode(&self, secret: &SharedSecret) -> Result<String, TokenError> {
        let payload =
            serde_json::to_vec(self).map_err(|e| TokenError::Encoding(e.to_string()))?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();

        TOKENS_ISSUED.inc();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// The signature is verified before the payload is parsed.
    pub fn decode(token: &str, secret: &SharedSecret) -> Result<Self, TokenError> {
        let result = Self::decode_inner(token, secret);
        if let Err(e) = &result {
            let reason = match e {
                TokenError::InvalidSignature => "invalid_signature",
                _ => "malformed",
            };
            TOKENS_REJECTED.with_label_values(&[reason]).inc();
        }
        result
    }

    fn decode_inner(token: &str, secret: &SharedSecret) -> Result<Self, TokenError> {
        let (payload_b64, tag_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        if payload_b64.is_empty() || tag_b64.is_empty() || tag_b64.contains('.') {
            return Err(TokenError::Malformed);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| TokenError::InvalidSignature)?;
        mac.update(&payload);
        mac.verify_slice(&tag)
            .map_err(|_| TokenError::InvalidSignature)?;

        serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::derive_shared_secret;
    use tokio_test::assert_ok;

    fn secret() -> SharedSecret {
        derive_shared_secret(b"", "serverpass")
    }

    fn token() -> DownloadToken {
        DownloadToken::new("rarbg", "https://rarbg.example/download.php?id=42&f=a+b.torrent")
    }

    #[test]
    fn test_round_trip() {
        let encoded = assert_ok!(token().encode(&secret()));
        let decoded = assert_ok!(DownloadToken::decode(&encoded, &secret()));
        assert_eq!(decoded, token());
    }

    #[test]
    fn test_encoding_is_deterministic_and_url_safe() {
        let a = token().encode(&secret()).unwrap();
        let b = token().encode(&secret()).unwrap();
        assert_eq!(a, b);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let encoded = token().encode(&secret()).unwrap();
        let other = derive_shared_secret(b"", "otherpass");
        assert!(matches!(
            DownloadToken::decode(&encoded, &other),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let encoded = token().encode(&secret()).unwrap();
        let (_, tag) = encoded.split_once('.').unwrap();

        let forged = DownloadToken::new("rarbg", "https://evil.example/x.torrent");
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}", forged_payload, tag);

        assert!(matches!(
            DownloadToken::decode(&tampered, &secret()),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        for bad in ["", "nodot", ".", "abc.", ".abc", "a.b.c", "***.***"] {
            assert!(
                matches!(
                    DownloadToken::decode(bad, &secret()),
                    Err(TokenError::Malformed)
                ),
                "expected Malformed for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_signed_non_token_payload_is_malformed() {
        let payload = b"not json";
        let mut mac = HmacSha256::new_from_slice(secret().as_bytes()).unwrap();
        mac.update(payload);
        let tag = mac.finalize().into_bytes();
        let encoded = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(tag)
        );

        assert!(matches!(
            DownloadToken::decode(&encoded, &secret()),
            Err(TokenError::Malformed)
        ));
    }
}
