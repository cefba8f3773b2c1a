//! In-memory AEAD keyring for local development and tests.
//!
//! Not a production backend — key material lives in an env var rather than
//! a managed KMS. Selected with `CRYPTO_BACKEND=local`.

use super::CryptoError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

const NONCE_LEN: usize = 12;

pub struct LocalKeyring {
    cipher: ChaCha20Poly1305,
}

impl LocalKeyring {
    pub fn from_base64_key(key_b64: &str) -> Result<Self, CryptoError> {
        let key_bytes = STANDARD
            .decode(key_b64)
            .map_err(|e| CryptoError::Config(format!("invalid LOCAL_KEYRING_KEY_B64: {e}")))?;
        if key_bytes.len() != 32 {
            return Err(CryptoError::Config(format!(
                "LOCAL_KEYRING_KEY_B64 must decode to 32 bytes, got {}",
                key_bytes.len()
            )));
        }
        let cipher = ChaCha20Poly1305::new_from_slice(&key_bytes)
            .map_err(|e| CryptoError::Local(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Generate a fresh random key, base64-encoded — used by tests and by
    /// operators bootstrapping a new `LOCAL_KEYRING_KEY_B64`.
    pub fn generate_key_b64() -> String {
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        STANDARD.encode(key)
    }
}

#[async_trait]
impl super::Keyring for LocalKeyring {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Local(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(CryptoError::Local("ciphertext too short".to_string()));
        }
        let (nonce_bytes, body) = ciphertext.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, body)
            .map_err(|e| CryptoError::Local(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Keyring;
    use super::*;

    #[tokio::test]
    async fn round_trips_plaintext() {
        let keyring = LocalKeyring::from_base64_key(&LocalKeyring::generate_key_b64()).unwrap();
        let ciphertext = keyring.encrypt(b"refresh-token-value").await.unwrap();
        assert_ne!(ciphertext, b"refresh-token-value".to_vec());

        let plaintext = keyring.decrypt(&ciphertext).await.unwrap();
        assert_eq!(plaintext, b"refresh-token-value".to_vec());
    }

    #[tokio::test]
    async fn different_nonces_produce_different_ciphertexts() {
        let keyring = LocalKeyring::from_base64_key(&LocalKeyring::generate_key_b64()).unwrap();
        let a = keyring.encrypt(b"same-plaintext").await.unwrap();
        let b = keyring.encrypt(b"same-plaintext").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_key() {
        let result = LocalKeyring::from_base64_key("not-base64!!!");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_wrong_length_key() {
        let short_key = STANDARD.encode([0u8; 16]);
        let result = LocalKeyring::from_base64_key(&short_key);
        assert!(result.is_err());
    }
}
