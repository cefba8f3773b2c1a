//! App Configuration handlers (§6): `POST/PATCH/DELETE /app-configurations`.

use actix_web::{web, HttpRequest, HttpResponse};
use shared::error::Error as AppError;
use shared::DbPool;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::helpers::validate_request;
use crate::middleware::auth_pipeline::RequestContext;
use crate::models::{AppConfigurationResponse, CreateAppConfigurationRequest, UpdateAppConfigurationRequest};
use crate::repositories::{AppConfigurationRepository, AppRepository};

fn to_response(config: crate::models::entities::AppConfiguration, app_name: String) -> AppConfigurationResponse {
    AppConfigurationResponse {
        id: config.id,
        project_id: config.project_id,
        app_name,
        security_scheme: config.security_scheme,
        enabled: config.enabled,
        all_functions_enabled: config.all_functions_enabled,
        enabled_functions: config.enabled_functions,
        created_at: config.created_at,
        updated_at: config.updated_at,
    }
}

/// Opts a project into using an App, selecting which security scheme it
/// will present to Linked Accounts and which Functions are enabled.
#[utoipa::path(
    post,
    path = "/api/v1/app-configurations",
    tag = "App Configurations",
    request_body = CreateAppConfigurationRequest,
    responses(
        (status = 201, description = "Created", body = AppConfigurationResponse),
        (status = 409, description = "Configuration already exists for this app")
    )
)]
pub async fn create_app_configuration(
    req: HttpRequest,
    body: web::Json<CreateAppConfigurationRequest>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let context = RequestContext::extract(&req)?;
    if let Err(response) = validate_request(&*body) {
        return Ok(response);
    }
    body.validate_function_selection().map_err(AppError::invalid_function_input)?;

    let app = AppRepository::find_by_name(pool.get_ref(), &body.app_name)
        .await?
        .ok_or_else(|| AppError::app_not_found(format!("no app named '{}'", body.app_name)))?;
    if !app.supports_scheme(body.security_scheme) {
        return Err(AppError::app_security_scheme_not_supported(format!(
            "app '{}' does not support scheme {:?}",
            app.name, body.security_scheme
        ))
        .into());
    }

    let config = AppConfigurationRepository::create(
        pool.get_ref(),
        context.project.id,
        app.id,
        body.security_scheme,
        &body.security_scheme_overrides,
        body.all_functions_enabled,
        &body.enabled_functions,
    )
    .await?;

    Ok(HttpResponse::Created().json(to_response(config, app.name)))
}

/// Updates an existing App Configuration's enabled state, scheme overrides,
/// or Function allow-list.
#[utoipa::path(
    patch,
    path = "/api/v1/app-configurations/{id}",
    tag = "App Configurations",
    params(("id" = Uuid, Path, description = "App Configuration id")),
    request_body = UpdateAppConfigurationRequest,
    responses(
        (status = 200, description = "Updated", body = AppConfigurationResponse),
        (status = 404, description = "No such app configuration")
    )
)]
pub async fn update_app_configuration(
    req: HttpRequest,
    id: web::Path<Uuid>,
    body: web::Json<UpdateAppConfigurationRequest>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    RequestContext::extract(&req)?;

    let config = AppConfigurationRepository::update(
        pool.get_ref(),
        *id,
        body.enabled,
        body.security_scheme_overrides.as_ref(),
        body.all_functions_enabled,
        body.enabled_functions.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::app_configuration_not_found(format!("no app configuration '{id}'")))?;

    let app = AppRepository::find_by_id(pool.get_ref(), config.app_id)
        .await?
        .ok_or_else(|| AppError::app_not_found("app configuration's app no longer exists"))?;

    Ok(HttpResponse::Ok().json(to_response(config, app.name)))
}

/// Removes a project's opt-in to an App. Linked Accounts for that App are
/// left in place; they simply become unreachable until reconfigured.
#[utoipa::path(
    delete,
    path = "/api/v1/app-configurations/{id}",
    tag = "App Configurations",
    params(("id" = Uuid, Path, description = "App Configuration id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such app configuration")
    )
)]
pub async fn delete_app_configuration(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    RequestContext::extract(&req)?;

    let deleted = AppConfigurationRepository::delete(pool.get_ref(), *id).await?;
    if !deleted {
        return Err(AppError::app_configuration_not_found(format!("no app configuration '{id}'")).into());
    }

    Ok(HttpResponse::NoContent().finish())
}
