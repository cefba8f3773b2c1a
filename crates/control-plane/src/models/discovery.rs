//! Discovery DTOs: App/Function search and function-definition rendering (§4.10, §6).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::common::PaginationParams;
use crate::models::entities::{App, Function};

/// `GET /apps/search` query parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AppSearchQuery {
    /// Free-text description of what the Agent wants to do; ranks results
    /// by embedding cosine distance when present.
    pub intent: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Restrict results to Apps the requesting Agent is allowed to call.
    #[serde(default)]
    pub allowed_apps_only: bool,
    #[serde(default)]
    pub include_functions: bool,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppSummary {
    pub name: String,
    pub display_name: String,
    pub provider: String,
    pub description: String,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionSummary>>,
}

impl AppSummary {
    pub fn from_app(app: &App, functions: Option<Vec<FunctionSummary>>) -> Self {
        Self {
            name: app.name.clone(),
            display_name: app.display_name.clone(),
            provider: app.provider.clone(),
            description: app.description.clone(),
            categories: app.categories.clone(),
            functions,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FunctionSummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl FunctionSummary {
    pub fn from_function(function: &Function) -> Self {
        Self {
            name: function.name.clone(),
            description: function.description.clone(),
            tags: function.tags.clone(),
        }
    }
}

/// `GET /functions/{name}/definition?format=...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FunctionDefinitionFormat {
    Basic,
    Openai,
    OpenaiResponses,
    Anthropic,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FunctionDefinitionQuery {
    #[serde(default = "default_format")]
    pub format: FunctionDefinitionFormat,
}

fn default_format() -> FunctionDefinitionFormat {
    FunctionDefinitionFormat::Basic
}

/// `POST /functions/{name}/execute` request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteFunctionRequest {
    #[serde(default)]
    pub function_input: serde_json::Value,
    pub linked_account_owner_id: String,
}

/// `POST /functions/{name}/execute` response body. Execution failures are
/// returned here, in-body, rather than as the hierarchical error type (§7).
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecuteFunctionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteFunctionResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_function_response_ok_serializes_data_only() {
        let response = ExecuteFunctionResponse::ok(serde_json::json!({"id": 1}));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn execute_function_response_failure_serializes_error_only() {
        let response = ExecuteFunctionResponse::failure("upstream timed out");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "upstream timed out");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn function_definition_format_defaults_to_basic() {
        let query: FunctionDefinitionQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.format, FunctionDefinitionFormat::Basic);
    }

    #[test]
    fn function_definition_format_parses_openai_responses() {
        let query: FunctionDefinitionQuery =
            serde_json::from_str(r#"{"format": "openai_responses"}"#).unwrap();
        assert_eq!(query.format, FunctionDefinitionFormat::OpenaiResponses);
    }
}
