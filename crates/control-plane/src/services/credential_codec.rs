//! Field-level encryption for credential documents (§4.2, invariant 6).
//!
//! `linked_accounts.security_credentials` and
//! `app_configurations.security_scheme_overrides` are stored as JSON, but only
//! the fields named by [`SecurityCredentialsDoc::encrypted_fields`] actually
//! need confidentiality (an oauth2 `client_id` or `scope` is not a secret).
//! This codec walks the named fields of a JSON object, replacing each string
//! value with its base64-encoded [`Keyring`] ciphertext on the way into
//! storage, and reversing the transform on the way out.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;
use shared::crypto::{CryptoError, Keyring};

use crate::models::credentials::SecurityCredentialsDoc;
use crate::models::enums::SecurityScheme;

/// Encrypts the scheme's sensitive fields of `value` in place, returning the
/// updated document. Non-string and absent fields are left untouched.
pub async fn encrypt_credentials(
    keyring: &dyn Keyring,
    scheme: SecurityScheme,
    mut value: Value,
) -> Result<Value, CryptoError> {
    for field in SecurityCredentialsDoc::encrypted_fields(scheme) {
        if let Some(existing) = value.get(*field).cloned() {
            if let Some(plaintext) = existing.as_str() {
                let ciphertext = keyring.encrypt(plaintext.as_bytes()).await?;
                value[*field] = Value::String(STANDARD.encode(ciphertext));
            }
        }
    }
    Ok(value)
}

/// Reverses [`encrypt_credentials`], decrypting the scheme's sensitive fields
/// back into plaintext.
pub async fn decrypt_credentials(
    keyring: &dyn Keyring,
    scheme: SecurityScheme,
    mut value: Value,
) -> Result<Value, CryptoError> {
    for field in SecurityCredentialsDoc::encrypted_fields(scheme) {
        if let Some(existing) = value.get(*field).cloned() {
            if let Some(encoded) = existing.as_str() {
                let ciphertext = STANDARD
                    .decode(encoded)
                    .map_err(|e| CryptoError::Local(format!("malformed ciphertext: {e}")))?;
                let plaintext = keyring.decrypt(&ciphertext).await?;
                let plaintext = String::from_utf8(plaintext)
                    .map_err(|e| CryptoError::Local(format!("decrypted value not utf-8: {e}")))?;
                value[*field] = Value::String(plaintext);
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct IdentityKeyring;

    #[async_trait]
    impl Keyring for IdentityKeyring {
        async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
            Ok(plaintext.to_vec())
        }

        async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
            Ok(ciphertext.to_vec())
        }
    }

    #[tokio::test]
    async fn api_key_round_trips_secret_key_only() {
        let keyring = IdentityKeyring;
        let value = serde_json::json!({"secret_key": "sk-live-123"});

        let encrypted = encrypt_credentials(&keyring, SecurityScheme::ApiKey, value.clone())
            .await
            .unwrap();
        assert_ne!(encrypted["secret_key"], value["secret_key"]);

        let decrypted = decrypt_credentials(&keyring, SecurityScheme::ApiKey, encrypted)
            .await
            .unwrap();
        assert_eq!(decrypted, value);
    }

    #[tokio::test]
    async fn no_auth_leaves_document_untouched() {
        let keyring = IdentityKeyring;
        let value = serde_json::json!({});
        let encrypted = encrypt_credentials(&keyring, SecurityScheme::NoAuth, value.clone())
            .await
            .unwrap();
        assert_eq!(encrypted, value);
    }

    #[tokio::test]
    async fn oauth2_encrypts_only_named_fields() {
        let keyring = IdentityKeyring;
        let value = serde_json::json!({
            "client_id": "abc",
            "client_secret": "shh",
            "scope": "read",
            "access_token": "tok",
            "refresh_token": "ref",
        });
        let encrypted = encrypt_credentials(&keyring, SecurityScheme::Oauth2, value.clone())
            .await
            .unwrap();
        assert_eq!(encrypted["client_id"], value["client_id"]);
        assert_eq!(encrypted["scope"], value["scope"]);
        assert_ne!(encrypted["client_secret"], value["client_secret"]);
        assert_ne!(encrypted["access_token"], value["access_token"]);
        assert_ne!(encrypted["refresh_token"], value["refresh_token"]);
    }
}
