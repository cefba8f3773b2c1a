//! Function discovery + execution handlers (§4.6-§4.9, §6):
//! `GET /functions/{name}/definition`, `POST /functions/{name}/execute`.

use actix_web::{web, HttpRequest, HttpResponse};
use shared::crypto::Keyring;
use shared::error::Error as AppError;
use shared::DbPool;

use crate::error::ApiResult;
use crate::middleware::auth_pipeline::RequestContext;
use crate::models::{
    ExecuteFunctionRequest, ExecuteFunctionResponse, FunctionDefinitionQuery,
};
use crate::repositories::{AppConfigurationRepository, AppRepository, FunctionRepository, LinkedAccountRepository};
use crate::services::oauth2::Oauth2Orchestrator;
use crate::services::policy_judge::{PolicyCheckRequest, PolicyJudge};
use crate::services::{credential_resolver, discovery, processor};
use crate::{execution, models::credentials::SecuritySchemeDoc};

/// Renders a Function's parameter schema in the requested tool-calling
/// dialect. Public endpoint: only requires that the Function and its App be
/// public and active.
#[utoipa::path(
    get,
    path = "/api/v1/functions/{name}/definition",
    tag = "Functions",
    params(
        ("name" = String, Path, description = "Function name"),
        FunctionDefinitionQuery,
    ),
    responses(
        (status = 200, description = "Function definition in the requested format"),
        (status = 404, description = "No such function")
    )
)]
pub async fn get_function_definition(
    name: web::Path<String>,
    query: web::Query<FunctionDefinitionQuery>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let function = FunctionRepository::find_public_active_by_name(pool.get_ref(), &name)
        .await?
        .ok_or_else(|| AppError::function_not_found(format!("no function named '{name}'")))?;

    let rendered = discovery::render_function_definition(&function, query.format);
    Ok(HttpResponse::Ok().json(rendered))
}

/// Executes a Function on behalf of a Linked Account, running the full
/// authorization/credential/policy pipeline first (§4.6-§4.9):
///
/// 1. Function + owning App must exist, be active, and the Agent must be
///    allowed to call the App.
/// 2. The project must carry an enabled App Configuration for the App that
///    allows this Function.
/// 3. The named Linked Account must exist, be enabled, and resolve to usable
///    credentials (refreshing an expired oauth2 token in place).
/// 4. Function input is narrowed to visible properties, invisible required
///    defaults are injected, and nulls are stripped.
/// 5. The Agent's custom instruction for this Function (if any) is checked
///    by the policy judge; a confirmed violation blocks execution but judge
///    failures never do (fail-open).
/// 6. The call is dispatched to the REST executor or a connector.
#[utoipa::path(
    post,
    path = "/api/v1/functions/{name}/execute",
    tag = "Functions",
    params(("name" = String, Path, description = "Function name")),
    request_body = ExecuteFunctionRequest,
    responses(
        (status = 200, description = "Execution outcome (success may be false)", body = ExecuteFunctionResponse),
        (status = 403, description = "Authorization, quota, or policy failure"),
        (status = 404, description = "Function, app configuration, or linked account not found")
    )
)]
#[allow(clippy::too_many_arguments)]
pub async fn execute_function(
    req: HttpRequest,
    name: web::Path<String>,
    body: web::Json<ExecuteFunctionRequest>,
    pool: web::Data<DbPool>,
    http_client: web::Data<reqwest::Client>,
    keyring: web::Data<dyn Keyring>,
    oauth2: web::Data<Oauth2Orchestrator>,
    policy_judge: web::Data<PolicyJudge>,
) -> ApiResult<HttpResponse> {
    let context = RequestContext::extract(&req)?;

    let function = FunctionRepository::find_by_name(pool.get_ref(), &name)
        .await?
        .ok_or_else(|| AppError::function_not_found(format!("no function named '{name}'")))?;
    if !function.active {
        return Err(AppError::function_not_found(format!("function '{name}' is not active")).into());
    }

    let app = AppRepository::find_by_id(pool.get_ref(), function.app_id)
        .await?
        .ok_or_else(|| AppError::app_not_found("function's owning app no longer exists"))?;
    if !context.agent.allows_app(&app.name) {
        return Err(AppError::app_not_allowed_for_this_agent(format!(
            "agent '{}' is not allowed to call app '{}'",
            context.agent.name, app.name
        ))
        .into());
    }

    let app_configuration = AppConfigurationRepository::find_by_project_and_app(pool.get_ref(), context.project.id, app.id)
        .await?
        .ok_or_else(|| AppError::app_configuration_not_found(format!("no app configuration for '{}'", app.name)))?;
    if !app_configuration.enabled {
        return Err(AppError::app_configuration_disabled(format!("app configuration for '{}' is disabled", app.name)).into());
    }
    if !app_configuration.allows_function(&function.name) {
        return Err(AppError::invalid_function_input(format!(
            "function '{}' is not enabled by the app configuration",
            function.name
        ))
        .into());
    }

    let linked_account = LinkedAccountRepository::find_by_project_app_owner(
        pool.get_ref(),
        context.project.id,
        app.id,
        &body.linked_account_owner_id,
    )
    .await?
    .ok_or_else(|| {
        AppError::linked_account_not_found(format!(
            "no linked account '{}' for app '{}'",
            body.linked_account_owner_id, app.name
        ))
    })?;
    if !linked_account.enabled {
        return Err(AppError::linked_account_disabled(format!(
            "linked account '{}' is disabled",
            body.linked_account_owner_id
        ))
        .into());
    }

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let resolved =
        credential_resolver::resolve(&mut tx, keyring.get_ref(), &oauth2, &app, &linked_account).await?;
    tx.commit().await.map_err(AppError::from)?;

    let scheme_doc = SecuritySchemeDoc::from_value(
        resolved.scheme,
        app.security_schemes.get(scheme_key(resolved.scheme)).unwrap_or(&serde_json::json!({})),
    )
    .map_err(|e| AppError::unexpected(format!("malformed security scheme config: {e}")))?;

    let visible_schema = processor::filter_visible_properties(&function.parameters);
    processor::validate_against_schema(&visible_schema, &body.function_input)
        .map_err(|e| AppError::invalid_function_input(format!("function_input failed validation: {e}")))?;

    let mut input = body.function_input.clone();
    processor::inject_invisible_required_defaults(&function.parameters, &mut input)
        .map_err(AppError::invalid_function_definition_format)?;
    let input = processor::remove_none_values(input);

    if let Some(instruction) = context.agent.custom_instruction_for(&function.name) {
        let verdict = policy_judge
            .check(PolicyCheckRequest {
                custom_instruction: instruction,
                function_name: &function.name,
                function_description: &function.description,
                function_input: &input,
            })
            .await;
        if let Some(verdict) = verdict {
            if verdict.is_violated {
                return Err(AppError::custom_instruction_violation(verdict.justification).into());
            }
        }
    }

    let result = execution::dispatch(
        &http_client,
        pool.get_ref(),
        keyring.get_ref(),
        &function,
        &linked_account,
        &scheme_doc,
        &resolved.document,
        input,
    )
    .await;

    LinkedAccountRepository::update_last_used_at(pool.get_ref(), linked_account.id).await?;

    let response = if result.success {
        ExecuteFunctionResponse::ok(result.data.unwrap_or(serde_json::Value::Null))
    } else {
        ExecuteFunctionResponse::failure(result.error.unwrap_or_else(|| "execution failed".into()))
    };

    Ok(HttpResponse::Ok().json(response))
}

fn scheme_key(scheme: crate::models::enums::SecurityScheme) -> &'static str {
    match scheme {
        crate::models::enums::SecurityScheme::NoAuth => "no_auth",
        crate::models::enums::SecurityScheme::ApiKey => "api_key",
        crate::models::enums::SecurityScheme::HttpBasic => "http_basic",
        crate::models::enums::SecurityScheme::HttpBearer => "http_bearer",
        crate::models::enums::SecurityScheme::Oauth2 => "oauth2",
    }
}
