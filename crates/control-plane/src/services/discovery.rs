//! Discovery layer (§4.10): semantic App/Function search and
//! function-definition rendering in the four formats Agents expect.

use serde_json::Value;
use shared::error::Result;
use shared::DbPool;
use uuid::Uuid;

use crate::models::discovery::FunctionDefinitionFormat;
use crate::models::entities::{App, Function};
use crate::repositories::{AppRepository, FunctionRepository};
use crate::services::embeddings::EmbeddingsClient;
use crate::services::processor::filter_visible_properties;

#[derive(Clone)]
pub struct DiscoveryService {
    embeddings: EmbeddingsClient,
}

impl DiscoveryService {
    pub fn new(embeddings: EmbeddingsClient) -> Self {
        Self { embeddings }
    }

    /// `intent` ranks by cosine distance when present; otherwise falls back
    /// to name order. `allowed_apps` narrows results to an Agent's allow-list
    /// client-side since the set is small and already loaded.
    pub async fn search_apps(
        &self,
        pool: &DbPool,
        intent: Option<&str>,
        categories: &[String],
        allowed_apps: Option<&[String]>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<App>> {
        let embedding = match intent {
            Some(text) if !text.is_empty() => self.embeddings.embed(text).await.ok(),
            _ => None,
        };

        let apps = AppRepository::search(pool, embedding.as_deref(), categories, true, limit, offset).await?;

        Ok(match allowed_apps {
            Some(allowed) => apps.into_iter().filter(|app| allowed.iter().any(|a| a == &app.name)).collect(),
            None => apps,
        })
    }

    pub async fn search_functions(
        &self,
        pool: &DbPool,
        intent: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Function>> {
        let embedding = match intent {
            Some(text) if !text.is_empty() => self.embeddings.embed(text).await.ok(),
            _ => None,
        };

        FunctionRepository::search(pool, embedding.as_deref(), limit, offset).await
    }

    pub async fn app_by_name(&self, pool: &DbPool, name: &str) -> Result<Option<App>> {
        AppRepository::find_by_name(pool, name).await
    }
}

/// Renders a Function's visible parameter schema as a tool/function
/// definition in the requested dialect. Each dialect nests the same
/// underlying JSON Schema differently; none change its content.
pub fn render_function_definition(function: &Function, format: FunctionDefinitionFormat) -> Value {
    let parameters = filter_visible_properties(&function.parameters);

    match format {
        FunctionDefinitionFormat::Basic => serde_json::json!({
            "name": function.name,
            "description": function.description,
            "parameters": parameters,
        }),
        FunctionDefinitionFormat::Openai => serde_json::json!({
            "type": "function",
            "function": {
                "name": function.name,
                "description": function.description,
                "parameters": parameters,
            }
        }),
        FunctionDefinitionFormat::OpenaiResponses => serde_json::json!({
            "type": "function",
            "name": function.name,
            "description": function.description,
            "parameters": parameters,
        }),
        FunctionDefinitionFormat::Anthropic => serde_json::json!({
            "name": function.name,
            "description": function.description,
            "input_schema": parameters,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{Protocol, Visibility};
    use chrono::Utc;

    fn sample_function() -> Function {
        Function {
            id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            name: "GMAIL__SEND_EMAIL".into(),
            description: "Send an email".into(),
            tags: vec!["email".into()],
            visibility: Visibility::Public,
            active: true,
            protocol: Protocol::Rest,
            protocol_data: serde_json::json!({}),
            parameters: serde_json::json!({
                "type": "object",
                "visible": ["to"],
                "required": ["to"],
                "properties": {"to": {"type": "string"}, "api_key": {"type": "string"}},
            }),
            response: serde_json::json!({}),
            embedding: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn openai_format_wraps_function_definition() {
        let function = sample_function();
        let rendered = render_function_definition(&function, FunctionDefinitionFormat::Openai);
        assert_eq!(rendered["type"], "function");
        assert_eq!(rendered["function"]["name"], "GMAIL__SEND_EMAIL");
        assert!(rendered["function"]["parameters"]["properties"].get("api_key").is_none());
    }

    #[test]
    fn anthropic_format_uses_input_schema_key() {
        let function = sample_function();
        let rendered = render_function_definition(&function, FunctionDefinitionFormat::Anthropic);
        assert!(rendered.get("input_schema").is_some());
        assert!(rendered.get("parameters").is_none());
    }
}
