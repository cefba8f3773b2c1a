//! OpenAPI Documentation Configuration
//!
//! This module configures the OpenAPI 3.0 specification for the control
//! plane API. It uses utoipa to generate documentation from Rust types and
//! handler annotations.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::handlers::health::HealthResponse;
use crate::models;

/// OpenAPI documentation for the agent-integration control plane API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Agent Control Plane API",
        version = "1.0.0",
        description = "Lets software agents discover third-party Apps, link \
            per-end-user credentials to them, and execute their Functions \
            under a per-project authorization and quota pipeline.\n\n## Authentication\n\n\
            Every agent-facing route requires an `X-API-KEY` header identifying \
            the calling Agent and its owning Project.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server")
    ),
    tags(
        (name = "Health", description = "Health check and service metadata"),
        (name = "Apps", description = "App discovery"),
        (name = "Functions", description = "Function discovery and execution"),
        (name = "App Configurations", description = "Per-project App opt-in"),
        (name = "Linked Accounts", description = "Per-end-user credential linking")
    ),
    modifiers(&SecurityAddon),
    paths(
        // Health
        handlers::health_check,
        handlers::openapi_json,
        // Apps
        handlers::search_apps,
        handlers::get_app,
        // Functions
        handlers::get_function_definition,
        handlers::execute_function,
        // App Configurations
        handlers::create_app_configuration,
        handlers::update_app_configuration,
        handlers::delete_app_configuration,
        // Linked Accounts
        handlers::link_api_key_account,
        handlers::link_no_auth_account,
        handlers::link_default_account,
        handlers::start_oauth2_link,
        handlers::oauth2_callback,
        handlers::update_linked_account,
        handlers::delete_linked_account,
    ),
    components(
        schemas(
            // Common
            models::ErrorResponse,
            models::SuccessResponse<serde_json::Value>,
            models::PaginationMeta,
            // Discovery
            models::AppSummary,
            models::FunctionSummary,
            models::ExecuteFunctionRequest,
            models::ExecuteFunctionResponse,
            // App Configurations
            models::CreateAppConfigurationRequest,
            models::UpdateAppConfigurationRequest,
            models::AppConfigurationResponse,
            // Linked Accounts
            models::LinkApiKeyAccountRequest,
            models::LinkNoAuthAccountRequest,
            models::LinkDefaultAccountRequest,
            models::StartOauth2LinkRequest,
            models::StartOauth2LinkResponse,
            models::UpdateLinkedAccountRequest,
            models::LinkedAccountResponse,
            // Health
            HealthResponse,
        )
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for adding authentication options
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "X-API-KEY",
                "API key identifying the calling Agent and its owning Project.",
            ))),
        );
    }
}
