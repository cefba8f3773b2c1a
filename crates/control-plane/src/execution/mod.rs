//! Function execution engine (§4.8): dispatches a resolved Function call to
//! either the generic REST executor or a connector from the compile-time
//! registry, based on the Function's `protocol`.

pub mod connector_executor;
pub mod connectors;
pub mod rest_executor;

use serde::Serialize;
use serde_json::Value;
use shared::crypto::Keyring;
use shared::DbPool;

use crate::models::credentials::{SecurityCredentialsDoc, SecuritySchemeDoc};
use crate::models::entities::{Function, LinkedAccount};
use crate::models::enums::Protocol;

/// Outcome of one Function call. Execution failures (a 4xx/5xx from the
/// upstream API, a connector error) are carried here rather than as the
/// hierarchical error type (§7) — only infrastructure failures (can't find
/// the Function, credentials won't resolve) use that path.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FunctionExecutionResult {
    pub fn ok(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }
}

/// Dispatches `function` with `input` against the resolved `credentials`.
pub async fn dispatch(
    http_client: &reqwest::Client,
    pool: &DbPool,
    keyring: &dyn Keyring,
    function: &Function,
    linked_account: &LinkedAccount,
    scheme_doc: &SecuritySchemeDoc,
    credentials: &SecurityCredentialsDoc,
    input: Value,
) -> FunctionExecutionResult {
    match function.protocol {
        Protocol::Rest => rest_executor::execute(http_client, function, scheme_doc, credentials, input).await,
        Protocol::Connector => {
            connector_executor::execute(http_client, pool, keyring, function, linked_account, credentials, input)
                .await
        }
    }
}
