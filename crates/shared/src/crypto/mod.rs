//! Envelope-encryption keyring and HMAC keying for credential storage (§4.1).
//!
//! Mirrors the Python `common/encryption.py` split: a `Keyring` handles
//! encrypt/decrypt of arbitrary plaintext (used for OAuth2 client secrets and
//! access/refresh tokens inside a [`SecurityCredentialsDoc`]), while
//! [`hmac_sha256`] is a separate, non-reversible keyed digest used only for
//! API-key lookup. The two never share key material.

pub mod kms;
pub mod local;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub use kms::AwsKmsKeyring;
pub use local::LocalKeyring;

/// Plaintext used by the startup round-trip self-test.
const SELF_TEST_PLAINTEXT: &[u8] = b"agent-control-plane-keyring-self-test";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("KMS error: {0}")]
    Kms(String),

    #[error("local keyring error: {0}")]
    Local(String),

    #[error("keyring self-test failed: round-tripped plaintext did not match")]
    SelfTestMismatch,

    #[error("configuration error: {0}")]
    Config(String),
}

/// An envelope-encryption backend for credential-store field encryption.
#[async_trait]
pub trait Keyring: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Keyed HMAC-SHA256 over an arbitrary string, used as the API-key lookup
/// index. Never reversed — API keys are looked up by recomputing this digest
/// and matching it against the stored value, the same pattern
/// `encryption.py::hmac_sha256` uses.
pub fn hmac_sha256(secret: &str, value: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(value.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison of two hex-encoded HMAC digests.
pub fn hmac_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Build the configured keyring backend and round-trip a known plaintext
/// through it, aborting startup on mismatch. Mirrors
/// `shared::db::check_health`'s startup gate.
pub async fn build_and_self_test(
    config: &crate::config::CryptoConfig,
) -> Result<Box<dyn Keyring>, CryptoError> {
    let keyring: Box<dyn Keyring> = match config.backend.as_str() {
        "aws" => {
            let arn = config
                .kms_key_arn
                .clone()
                .ok_or_else(|| CryptoError::Config("KEY_ENCRYPTION_KEY_ARN must be set when CRYPTO_BACKEND=aws".to_string()))?;
            Box::new(AwsKmsKeyring::new(arn, config.aws_region.clone(), config.aws_endpoint_url.clone()).await?)
        }
        "local" => {
            let key_b64 = config.local_keyring_key_b64.clone().ok_or_else(|| {
                CryptoError::Config(
                    "LOCAL_KEYRING_KEY_B64 must be set when CRYPTO_BACKEND=local".to_string(),
                )
            })?;
            Box::new(LocalKeyring::from_base64_key(&key_b64)?)
        }
        other => {
            return Err(CryptoError::Config(format!(
                "unknown CRYPTO_BACKEND: {other} (expected aws or local)"
            )))
        }
    };

    let ciphertext = keyring.encrypt(SELF_TEST_PLAINTEXT).await?;
    let roundtripped = keyring.decrypt(&ciphertext).await?;
    if roundtripped != SELF_TEST_PLAINTEXT {
        return Err(CryptoError::SelfTestMismatch);
    }

    Ok(keyring)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_is_deterministic_and_keyed() {
        let a = hmac_sha256("secret-one", "api-key-value");
        let b = hmac_sha256("secret-one", "api-key-value");
        let c = hmac_sha256("secret-two", "api-key-value");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hmac_eq_is_constant_time_equal() {
        let digest = hmac_sha256("secret", "value");
        assert!(hmac_eq(&digest, &digest));
        assert!(!hmac_eq(&digest, "not-the-digest"));
    }

    #[tokio::test]
    async fn local_keyring_self_test_round_trips() {
        let config = crate::config::CryptoConfig {
            backend: "local".to_string(),
            kms_key_arn: None,
            aws_region: "us-east-1".to_string(),
            aws_endpoint_url: None,
            local_keyring_key_b64: Some(LocalKeyring::generate_key_b64()),
            api_key_hashing_secret: "test".to_string(),
        };

        let keyring = build_and_self_test(&config).await.expect("self-test should pass");
        let ciphertext = keyring.encrypt(b"hello").await.unwrap();
        let plaintext = keyring.decrypt(&ciphertext).await.unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let config = crate::config::CryptoConfig {
            backend: "bogus".to_string(),
            kms_key_arn: None,
            aws_region: "us-east-1".to_string(),
            aws_endpoint_url: None,
            local_keyring_key_b64: None,
            api_key_hashing_secret: "test".to_string(),
        };

        let result = build_and_self_test(&config).await;
        assert!(matches!(result, Err(CryptoError::Config(_))));
    }
}
