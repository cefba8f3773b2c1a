//! Agent Secrets Manager connector: CRUD over `(domain -> {username,
//! password})` secrets for a Linked Account, a no-auth scheme. Grounded on
//! `agent_secrets_manager.py` and its `DomainCredential`/`SecretValue`
//! schemas.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::crypto::Keyring;
use shared::DbPool;

use crate::execution::connector_executor::ConnectorHandler;
use crate::execution::FunctionExecutionResult;
use crate::models::credentials::SecurityCredentialsDoc;
use crate::models::entities::LinkedAccount;
use crate::repositories::SecretRepository;

#[derive(Debug, Serialize, Deserialize)]
struct SecretValue {
    username: String,
    password: String,
}

async fn encrypt_secret(keyring: &dyn Keyring, value: &SecretValue) -> Result<Vec<u8>, String> {
    let plaintext = serde_json::to_vec(value).map_err(|e| e.to_string())?;
    keyring.encrypt(&plaintext).await.map_err(|e| e.to_string())
}

async fn decrypt_secret(keyring: &dyn Keyring, encrypted_value: &[u8]) -> Result<SecretValue, String> {
    let plaintext = keyring.decrypt(encrypted_value).await.map_err(|e| e.to_string())?;
    serde_json::from_slice(&plaintext).map_err(|e| e.to_string())
}

fn domain_and_credentials(input: &Value) -> Result<(String, Option<SecretValue>), String> {
    let domain = input
        .get("domain")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing required field: domain".to_string())?
        .to_string();

    let username = input.get("username").and_then(Value::as_str);
    let password = input.get("password").and_then(Value::as_str);
    let credentials = match (username, password) {
        (Some(username), Some(password)) => {
            Some(SecretValue { username: username.to_string(), password: password.to_string() })
        }
        (None, None) => None,
        _ => return Err("username and password must be provided together".to_string()),
    };

    Ok((domain, credentials))
}

pub struct CreateSecret;

#[async_trait]
impl ConnectorHandler for CreateSecret {
    async fn call(
        &self,
        _http_client: &reqwest::Client,
        pool: &DbPool,
        keyring: &dyn Keyring,
        linked_account: &LinkedAccount,
        _credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult {
        let (domain, credentials) = match domain_and_credentials(&input) {
            Ok(parsed) => parsed,
            Err(e) => return FunctionExecutionResult::failure(e),
        };
        let credentials = match credentials {
            Some(c) => c,
            None => return FunctionExecutionResult::failure("username and password are required"),
        };

        match SecretRepository::find(pool, linked_account.id, &domain).await {
            Ok(Some(_)) => return FunctionExecutionResult::failure(format!("credential for domain '{domain}' already exists")),
            Ok(None) => {}
            Err(e) => return FunctionExecutionResult::failure(e.to_string()),
        }

        let encrypted = match encrypt_secret(keyring, &credentials).await {
            Ok(e) => e,
            Err(e) => return FunctionExecutionResult::failure(e),
        };

        match SecretRepository::upsert(pool, linked_account.id, &domain, &encrypted).await {
            Ok(_) => FunctionExecutionResult::ok(json!({ "domain": domain })),
            Err(e) => FunctionExecutionResult::failure(e.to_string()),
        }
    }
}

pub struct GetSecret;

#[async_trait]
impl ConnectorHandler for GetSecret {
    async fn call(
        &self,
        _http_client: &reqwest::Client,
        pool: &DbPool,
        keyring: &dyn Keyring,
        linked_account: &LinkedAccount,
        _credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult {
        let (domain, _) = match domain_and_credentials(&input) {
            Ok(parsed) => parsed,
            Err(e) => return FunctionExecutionResult::failure(e),
        };

        let secret = match SecretRepository::find(pool, linked_account.id, &domain).await {
            Ok(Some(s)) => s,
            Ok(None) => return FunctionExecutionResult::failure(format!("no credentials found for domain '{domain}'")),
            Err(e) => return FunctionExecutionResult::failure(e.to_string()),
        };

        match decrypt_secret(keyring, &secret.encrypted_value).await {
            Ok(value) => FunctionExecutionResult::ok(json!({
                "domain": domain,
                "username": value.username,
                "password": value.password,
            })),
            Err(e) => FunctionExecutionResult::failure(e),
        }
    }
}

pub struct UpdateSecret;

#[async_trait]
impl ConnectorHandler for UpdateSecret {
    async fn call(
        &self,
        _http_client: &reqwest::Client,
        pool: &DbPool,
        keyring: &dyn Keyring,
        linked_account: &LinkedAccount,
        _credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult {
        let (domain, credentials) = match domain_and_credentials(&input) {
            Ok(parsed) => parsed,
            Err(e) => return FunctionExecutionResult::failure(e),
        };
        let credentials = match credentials {
            Some(c) => c,
            None => return FunctionExecutionResult::failure("username and password are required"),
        };

        match SecretRepository::find(pool, linked_account.id, &domain).await {
            Ok(Some(_)) => {}
            Ok(None) => return FunctionExecutionResult::failure(format!("no credentials found for domain '{domain}'")),
            Err(e) => return FunctionExecutionResult::failure(e.to_string()),
        }

        let encrypted = match encrypt_secret(keyring, &credentials).await {
            Ok(e) => e,
            Err(e) => return FunctionExecutionResult::failure(e),
        };

        match SecretRepository::upsert(pool, linked_account.id, &domain, &encrypted).await {
            Ok(_) => FunctionExecutionResult::ok(json!({ "domain": domain })),
            Err(e) => FunctionExecutionResult::failure(e.to_string()),
        }
    }
}

pub struct DeleteSecret;

#[async_trait]
impl ConnectorHandler for DeleteSecret {
    async fn call(
        &self,
        _http_client: &reqwest::Client,
        pool: &DbPool,
        _keyring: &dyn Keyring,
        linked_account: &LinkedAccount,
        _credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult {
        let (domain, _) = match domain_and_credentials(&input) {
            Ok(parsed) => parsed,
            Err(e) => return FunctionExecutionResult::failure(e),
        };

        match SecretRepository::delete(pool, linked_account.id, &domain).await {
            Ok(true) => FunctionExecutionResult::ok(json!({ "domain": domain, "deleted": true })),
            Ok(false) => FunctionExecutionResult::failure(format!("no credentials found for domain '{domain}'")),
            Err(e) => FunctionExecutionResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IdentityKeyring;
    #[async_trait]
    impl Keyring for IdentityKeyring {
        async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, shared::crypto::CryptoError> {
            Ok(plaintext.to_vec())
        }
        async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, shared::crypto::CryptoError> {
            Ok(ciphertext.to_vec())
        }
    }

    #[test]
    fn domain_and_credentials_requires_both_username_and_password() {
        let input = json!({"domain": "example.com", "username": "bob"});
        assert!(domain_and_credentials(&input).is_err());
    }

    #[test]
    fn domain_and_credentials_allows_domain_only_for_reads() {
        let input = json!({"domain": "example.com"});
        let (domain, credentials) = domain_and_credentials(&input).unwrap();
        assert_eq!(domain, "example.com");
        assert!(credentials.is_none());
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_secret_round_trips() {
        let keyring = IdentityKeyring;
        let value = SecretValue { username: "bob".into(), password: "hunter2".into() };
        let encrypted = encrypt_secret(&keyring, &value).await.unwrap();
        let decrypted = decrypt_secret(&keyring, &encrypted).await.unwrap();
        assert_eq!(decrypted.username, "bob");
        assert_eq!(decrypted.password, "hunter2");
    }
}
