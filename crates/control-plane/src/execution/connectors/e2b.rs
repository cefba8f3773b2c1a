//! E2B.dev sandbox connector. No E2B Rust SDK exists in the corpus, so this
//! calls E2B's code-execution REST API directly instead of faking an SDK
//! dependency. Grounded on `e2b.py`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::crypto::Keyring;
use shared::DbPool;

use crate::execution::connector_executor::ConnectorHandler;
use crate::execution::FunctionExecutionResult;
use crate::models::credentials::SecurityCredentialsDoc;
use crate::models::entities::LinkedAccount;

const E2B_API_BASE: &str = "https://api.e2b.dev";

pub struct RunCode;

#[derive(Debug, Deserialize)]
struct RunCodeResponse {
    text: Option<String>,
}

#[async_trait]
impl ConnectorHandler for RunCode {
    async fn call(
        &self,
        http_client: &reqwest::Client,
        _pool: &DbPool,
        _keyring: &dyn Keyring,
        _linked_account: &LinkedAccount,
        credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult {
        let api_key = match credentials {
            SecurityCredentialsDoc::ApiKey(creds) => creds.secret_key.clone(),
            _ => return FunctionExecutionResult::failure("e2b requires api_key credentials"),
        };

        let code = match input.get("code").and_then(Value::as_str) {
            Some(code) => code,
            None => return FunctionExecutionResult::failure("missing required field: code"),
        };

        let response = http_client
            .post(format!("{E2B_API_BASE}/execute"))
            .header("X-API-Key", api_key)
            .json(&json!({ "code": code }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return FunctionExecutionResult::failure(format!("e2b request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return FunctionExecutionResult::failure(format!("e2b returned HTTP {status}: {body}"));
        }

        match response.json::<RunCodeResponse>().await {
            Ok(parsed) => FunctionExecutionResult::ok(json!({ "text": parsed.text.unwrap_or_default() })),
            Err(e) => FunctionExecutionResult::failure(format!("malformed e2b response: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credentials::ApiKeyCredentials;
    use crate::models::enums::SecurityScheme;
    use chrono::Utc;
    use uuid::Uuid;

    struct Noop;
    #[async_trait]
    impl Keyring for Noop {
        async fn encrypt(&self, p: &[u8]) -> Result<Vec<u8>, shared::crypto::CryptoError> {
            Ok(p.to_vec())
        }
        async fn decrypt(&self, c: &[u8]) -> Result<Vec<u8>, shared::crypto::CryptoError> {
            Ok(c.to_vec())
        }
    }

    fn sample_linked_account() -> LinkedAccount {
        LinkedAccount {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            linked_account_owner_id: "owner".into(),
            security_scheme: SecurityScheme::ApiKey,
            security_credentials: json!({}),
            enabled: true,
            last_used_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn run_code_rejects_non_api_key_credentials() {
        let http_client = reqwest::Client::new();
        let pool = DbPool::connect_lazy("postgres://localhost/unused").unwrap();
        let linked_account = sample_linked_account();
        let result = RunCode
            .call(
                &http_client,
                &pool,
                &Noop,
                &linked_account,
                &SecurityCredentialsDoc::NoAuth,
                json!({"code": "1+1"}),
            )
            .await;
        assert!(!result.success);
    }

    #[test]
    fn missing_code_field_is_detected_before_any_request() {
        let input = json!({});
        assert!(input.get("code").and_then(Value::as_str).is_none());
    }

    #[test]
    fn api_key_credentials_extract_secret_key() {
        let creds = SecurityCredentialsDoc::ApiKey(ApiKeyCredentials { secret_key: "e2b_abc".into() });
        match creds {
            SecurityCredentialsDoc::ApiKey(c) => assert_eq!(c.secret_key, "e2b_abc"),
            _ => panic!("expected api_key credentials"),
        }
    }
}
