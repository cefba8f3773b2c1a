//! Test-only connectors used to exercise the connector executor without a
//! real upstream API. Grounded on `mock_app_connector.py`.

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::crypto::Keyring;
use shared::DbPool;

use crate::execution::connector_executor::ConnectorHandler;
use crate::execution::FunctionExecutionResult;
use crate::models::credentials::SecurityCredentialsDoc;
use crate::models::entities::LinkedAccount;

pub struct Echo;

#[async_trait]
impl ConnectorHandler for Echo {
    async fn call(
        &self,
        _http_client: &reqwest::Client,
        _pool: &DbPool,
        _keyring: &dyn Keyring,
        linked_account: &LinkedAccount,
        credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult {
        FunctionExecutionResult::ok(json!({
            "input_string": input.get("input_string"),
            "input_int": input.get("input_int"),
            "input_bool": input.get("input_bool"),
            "input_list": input.get("input_list"),
            "input_required_invisible_string": input.get("input_required_invisible_string"),
            "security_scheme": linked_account.security_scheme,
            "security_credentials_variant": match credentials {
                SecurityCredentialsDoc::NoAuth => "no_auth",
                SecurityCredentialsDoc::ApiKey(_) => "api_key",
                SecurityCredentialsDoc::Oauth2(_) => "oauth2",
            },
        }))
    }
}

pub struct Fail;

#[async_trait]
impl ConnectorHandler for Fail {
    async fn call(
        &self,
        _http_client: &reqwest::Client,
        _pool: &DbPool,
        _keyring: &dyn Keyring,
        _linked_account: &LinkedAccount,
        _credentials: &SecurityCredentialsDoc,
        _input: Value,
    ) -> FunctionExecutionResult {
        FunctionExecutionResult::failure("this function is designed to fail for testing purposes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::SecurityScheme;
    use chrono::Utc;
    use shared::crypto::CryptoError;
    use uuid::Uuid;

    struct NoopKeyring;

    #[async_trait]
    impl Keyring for NoopKeyring {
        async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
            Ok(plaintext.to_vec())
        }
        async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
            Ok(ciphertext.to_vec())
        }
    }

    fn sample_linked_account() -> LinkedAccount {
        LinkedAccount {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            linked_account_owner_id: "owner".into(),
            security_scheme: SecurityScheme::NoAuth,
            security_credentials: json!({}),
            enabled: true,
            last_used_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fail_always_returns_failure() {
        let http_client = reqwest::Client::new();
        let linked_account = sample_linked_account();
        // Lazy pool: never actually connects since Fail never touches it.
        let pool = DbPool::connect_lazy("postgres://localhost/unused").unwrap();
        let result = Fail
            .call(
                &http_client,
                &pool,
                &NoopKeyring,
                &linked_account,
                &SecurityCredentialsDoc::NoAuth,
                json!({}),
            )
            .await;
        assert!(!result.success);
    }
}
