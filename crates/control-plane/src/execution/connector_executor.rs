//! Connector executor (§4.8). The original dispatches by reflectively
//! importing `app_connectors.<app>` and looking up a class/method pair from
//! the Function name; this replaces that with an explicit compile-time
//! registry keyed by the full `APP__METHOD` function name (Design Notes §9).

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::Value;
use shared::crypto::Keyring;
use shared::DbPool;

use crate::execution::connectors::{agent_secrets_manager, e2b, gmail, mock};
use crate::execution::FunctionExecutionResult;
use crate::models::credentials::SecurityCredentialsDoc;
use crate::models::entities::{Function, LinkedAccount};

/// One connector implementation, called with the already-resolved
/// credentials for the Linked Account it's acting on behalf of. `pool` and
/// `keyring` are only exercised by connectors that keep their own state
/// (the Agent Secrets Manager); REST-backed connectors (E2B, Gmail) ignore
/// them.
#[async_trait]
pub trait ConnectorHandler: Send + Sync {
    async fn call(
        &self,
        http_client: &reqwest::Client,
        pool: &DbPool,
        keyring: &dyn Keyring,
        linked_account: &LinkedAccount,
        credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult;
}

type Registry = HashMap<&'static str, Box<dyn ConnectorHandler>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: Registry = HashMap::new();
        map.insert("AGENT_SECRETS_MANAGER__CREATE_SECRET", Box::new(agent_secrets_manager::CreateSecret));
        map.insert("AGENT_SECRETS_MANAGER__GET_SECRET", Box::new(agent_secrets_manager::GetSecret));
        map.insert("AGENT_SECRETS_MANAGER__UPDATE_SECRET", Box::new(agent_secrets_manager::UpdateSecret));
        map.insert("AGENT_SECRETS_MANAGER__DELETE_SECRET", Box::new(agent_secrets_manager::DeleteSecret));
        map.insert("E2B__RUN_CODE", Box::new(e2b::RunCode));
        map.insert("GMAIL__SEND_EMAIL", Box::new(gmail::SendEmail));
        map.insert("MOCK__ECHO", Box::new(mock::Echo));
        map.insert("MOCK__FAIL", Box::new(mock::Fail));
        map
    })
}

pub async fn execute(
    http_client: &reqwest::Client,
    pool: &DbPool,
    keyring: &dyn Keyring,
    function: &Function,
    linked_account: &LinkedAccount,
    credentials: &SecurityCredentialsDoc,
    input: Value,
) -> FunctionExecutionResult {
    match registry().get(function.name.as_str()) {
        Some(handler) => {
            handler
                .call(http_client, pool, keyring, linked_account, credentials, input)
                .await
        }
        None => FunctionExecutionResult::failure(format!(
            "no connector implementation registered for {}",
            function.name
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::SecurityScheme;
    use chrono::Utc;
    use mockall::mock;

    #[test]
    fn registry_contains_mock_connectors() {
        assert!(registry().contains_key("MOCK__ECHO"));
        assert!(registry().contains_key("MOCK__FAIL"));
    }

    mock! {
        pub Handler {}

        #[async_trait]
        impl ConnectorHandler for Handler {
            async fn call(
                &self,
                http_client: &reqwest::Client,
                pool: &DbPool,
                keyring: &dyn Keyring,
                linked_account: &LinkedAccount,
                credentials: &SecurityCredentialsDoc,
                input: Value,
            ) -> FunctionExecutionResult;
        }
    }

    fn sample_linked_account() -> LinkedAccount {
        LinkedAccount {
            id: uuid::Uuid::new_v4(),
            project_id: uuid::Uuid::new_v4(),
            app_id: uuid::Uuid::new_v4(),
            linked_account_owner_id: "user-1".to_string(),
            security_scheme: SecurityScheme::NoAuth,
            security_credentials: serde_json::json!({}),
            enabled: true,
            last_used_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn handler_receives_the_input_it_was_called_with() {
        let mut handler = MockHandler::new();
        handler
            .expect_call()
            .times(1)
            .returning(|_, _, _, _, _, _| FunctionExecutionResult::ok(serde_json::json!({"sent": true})));

        // Lazy pool: never actually dials out, since the mock handler never
        // touches it.
        let pool = sqlx::PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let keyring_impl = shared::crypto::local::LocalKeyring::from_base64_key(
            &shared::crypto::local::LocalKeyring::generate_key_b64(),
        )
        .unwrap();
        let result = handler
            .call(
                &reqwest::Client::new(),
                &pool,
                &keyring_impl,
                &sample_linked_account(),
                &SecurityCredentialsDoc::NoAuth,
                serde_json::json!({"to": "user@example.com"}),
            )
            .await;

        assert!(result.success);
    }
}
