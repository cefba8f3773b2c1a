//! Linked Account handlers (§4.5, §6): api-key / no-auth / default linking,
//! the oauth2 authorize+callback dance, and update/delete.

use actix_web::{web, HttpRequest, HttpResponse};
use shared::crypto::Keyring;
use shared::error::Error as AppError;
use shared::DbPool;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::helpers::validate_request;
use crate::middleware::auth_pipeline::RequestContext;
use crate::models::credentials::{
    ApiKeyCredentials, OAuth2SchemeConfig, SecurityCredentialsDoc,
};
use crate::models::enums::SecurityScheme;
use crate::models::{
    LinkApiKeyAccountRequest, LinkDefaultAccountRequest, LinkNoAuthAccountRequest, LinkedAccountResponse,
    Oauth2CallbackQuery, StartOauth2LinkRequest, StartOauth2LinkResponse, UpdateLinkedAccountRequest,
};
use crate::repositories::{AppConfigurationRepository, AppRepository, LinkedAccountRepository};
use crate::services::credential_codec::encrypt_credentials;
use crate::services::oauth2::Oauth2Orchestrator;

fn to_response(account: crate::models::entities::LinkedAccount, app_name: String) -> LinkedAccountResponse {
    LinkedAccountResponse {
        id: account.id,
        project_id: account.project_id,
        app_name,
        linked_account_owner_id: account.linked_account_owner_id,
        security_scheme: account.security_scheme,
        enabled: account.enabled,
        last_used_at: account.last_used_at,
        created_at: account.created_at,
        updated_at: account.updated_at,
    }
}

async fn app_configured_for_project(
    pool: &DbPool,
    project_id: Uuid,
    app_name: &str,
) -> ApiResult<(crate::models::entities::App, crate::models::entities::AppConfiguration)> {
    let app = AppRepository::find_by_name(pool, app_name)
        .await?
        .ok_or_else(|| AppError::app_not_found(format!("no app named '{app_name}'")))?;

    let config = AppConfigurationRepository::find_by_project_and_app(pool, project_id, app.id)
        .await?
        .ok_or_else(|| AppError::app_configuration_not_found(format!("no app configuration for '{app_name}'")))?;
    if !config.enabled {
        return Err(AppError::app_configuration_disabled(format!("app configuration for '{app_name}' is disabled")).into());
    }

    Ok((app, config))
}

/// Derives the effective oauth2 scheme for an App Configuration: the App's
/// base `security_schemes["oauth2"]`, overlaid field-by-field with any
/// non-null fields from `app_configuration.security_scheme_overrides.oauth2`
/// (§4.5 step 1, §4.6). A project's own client id/secret, once set, always
/// wins over the App's default.
fn effective_oauth2_scheme(
    app: &crate::models::entities::App,
    app_configuration: &crate::models::entities::AppConfiguration,
) -> ApiResult<OAuth2SchemeConfig> {
    let base = app
        .security_schemes
        .get("oauth2")
        .ok_or_else(|| AppError::app_security_scheme_not_supported(format!("app '{}' has no oauth2 scheme", app.name)))?
        .clone();
    let mut config: OAuth2SchemeConfig =
        serde_json::from_value(base).map_err(|e| AppError::unexpected(format!("malformed oauth2 scheme config: {e}")))?;

    if let Some(overrides) = app_configuration.security_scheme_overrides.get("oauth2") {
        if let Some(client_id) = overrides.get("client_id").and_then(|v| v.as_str()) {
            config.client_id = client_id.to_string();
        }
        if let Some(client_secret) = overrides.get("client_secret").and_then(|v| v.as_str()) {
            config.client_secret = client_secret.to_string();
        }
        if let Some(scope) = overrides.get("scope").and_then(|v| v.as_str()) {
            config.scope = scope.to_string();
        }
        if let Some(authorize_url) = overrides.get("authorize_url").and_then(|v| v.as_str()) {
            config.authorize_url = authorize_url.to_string();
        }
        if let Some(token_url) = overrides.get("token_url").and_then(|v| v.as_str()) {
            config.token_url = token_url.to_string();
        }
    }

    Ok(config)
}

/// Links an account that authenticates with a bare API key (§3: api_key
/// scheme).
#[utoipa::path(
    post,
    path = "/api/v1/linked-accounts/api-key",
    tag = "Linked Accounts",
    request_body = LinkApiKeyAccountRequest,
    responses((status = 201, description = "Linked", body = LinkedAccountResponse))
)]
pub async fn link_api_key_account(
    req: HttpRequest,
    body: web::Json<LinkApiKeyAccountRequest>,
    pool: web::Data<DbPool>,
    keyring: web::Data<dyn Keyring>,
) -> ApiResult<HttpResponse> {
    let context = RequestContext::extract(&req)?;
    if let Err(response) = validate_request(&*body) {
        return Ok(response);
    }

    let (app, _config) = app_configured_for_project(&pool, context.project.id, &body.app_name).await?;

    let credentials = SecurityCredentialsDoc::ApiKey(ApiKeyCredentials { secret_key: body.secret_key.clone() });
    let encrypted = encrypt_credentials(keyring.get_ref(), SecurityScheme::ApiKey, credentials.to_value())
        .await
        .map_err(|e| AppError::crypto_error(e.to_string()))?;

    let account = LinkedAccountRepository::create(
        pool.get_ref(),
        context.project.id,
        app.id,
        &body.linked_account_owner_id,
        SecurityScheme::ApiKey,
        &encrypted,
    )
    .await?;

    Ok(HttpResponse::Created().json(to_response(account, app.name)))
}

/// Links an account with no credentials of its own (§3: no_auth scheme).
#[utoipa::path(
    post,
    path = "/api/v1/linked-accounts/no-auth",
    tag = "Linked Accounts",
    request_body = LinkNoAuthAccountRequest,
    responses((status = 201, description = "Linked", body = LinkedAccountResponse))
)]
pub async fn link_no_auth_account(
    req: HttpRequest,
    body: web::Json<LinkNoAuthAccountRequest>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let context = RequestContext::extract(&req)?;
    if let Err(response) = validate_request(&*body) {
        return Ok(response);
    }

    let (app, _config) = app_configured_for_project(&pool, context.project.id, &body.app_name).await?;

    let account = LinkedAccountRepository::create(
        pool.get_ref(),
        context.project.id,
        app.id,
        &body.linked_account_owner_id,
        SecurityScheme::NoAuth,
        &SecurityCredentialsDoc::NoAuth.to_value(),
    )
    .await?;

    Ok(HttpResponse::Created().json(to_response(account, app.name)))
}

/// Links an account that falls back entirely to the App's default
/// credentials for whatever scheme its App Configuration selected (§3: the
/// empty-object fallback marker).
#[utoipa::path(
    post,
    path = "/api/v1/linked-accounts/default",
    tag = "Linked Accounts",
    request_body = LinkDefaultAccountRequest,
    responses((status = 201, description = "Linked", body = LinkedAccountResponse))
)]
pub async fn link_default_account(
    req: HttpRequest,
    body: web::Json<LinkDefaultAccountRequest>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    let context = RequestContext::extract(&req)?;
    if let Err(response) = validate_request(&*body) {
        return Ok(response);
    }

    let app = AppRepository::find_by_name(&pool, &body.app_name)
        .await?
        .ok_or_else(|| AppError::app_not_found(format!("no app named '{}'", body.app_name)))?;
    let config = AppConfigurationRepository::find_by_project_and_app(&pool, context.project.id, app.id)
        .await?
        .ok_or_else(|| AppError::app_configuration_not_found(format!("no app configuration for '{}'", app.name)))?;
    if !config.enabled {
        return Err(AppError::app_configuration_disabled(format!("app configuration for '{}' is disabled", app.name)).into());
    }

    let account = LinkedAccountRepository::create(
        pool.get_ref(),
        context.project.id,
        app.id,
        &body.linked_account_owner_id,
        config.security_scheme,
        &serde_json::json!({}),
    )
    .await?;

    Ok(HttpResponse::Created().json(to_response(account, app.name)))
}

/// Starts an oauth2 linking flow: returns the provider authorization URL
/// the end user should be redirected to.
#[utoipa::path(
    post,
    path = "/api/v1/linked-accounts/oauth2",
    tag = "Linked Accounts",
    request_body = StartOauth2LinkRequest,
    responses((status = 200, description = "Authorization URL", body = StartOauth2LinkResponse))
)]
pub async fn start_oauth2_link(
    req: HttpRequest,
    body: web::Json<StartOauth2LinkRequest>,
    pool: web::Data<DbPool>,
    oauth2: web::Data<Oauth2Orchestrator>,
) -> ApiResult<HttpResponse> {
    let context = RequestContext::extract(&req)?;
    if let Err(response) = validate_request(&*body) {
        return Ok(response);
    }

    let (app, app_configuration) = app_configured_for_project(&pool, context.project.id, &body.app_name).await?;

    let config = effective_oauth2_scheme(&app, &app_configuration)?;

    let authorization_url = oauth2
        .authorization_url(
            &config,
            context.project.id,
            &app.name,
            &body.linked_account_owner_id,
            body.after_oauth2_link_redirect_url.clone(),
        )
        .map_err(|e| AppError::oauth2_error(e.to_string()))?;

    Ok(HttpResponse::Ok().json(StartOauth2LinkResponse { authorization_url }))
}

/// Completes an oauth2 linking flow: verifies the signed state token,
/// exchanges the authorization code, encrypts and stores the resulting
/// token set.
#[utoipa::path(
    get,
    path = "/api/v1/linked-accounts/oauth2/callback",
    tag = "Linked Accounts",
    params(Oauth2CallbackQuery),
    responses((status = 201, description = "Linked", body = LinkedAccountResponse))
)]
pub async fn oauth2_callback(
    query: web::Query<Oauth2CallbackQuery>,
    pool: web::Data<DbPool>,
    keyring: web::Data<dyn Keyring>,
    oauth2: web::Data<Oauth2Orchestrator>,
) -> ApiResult<HttpResponse> {
    let callback = oauth2.verify_callback_state(&query.state).map_err(|e| AppError::oauth2_error(e.to_string()))?;

    let app = AppRepository::find_by_name(&pool, &callback.app_name)
        .await?
        .ok_or_else(|| AppError::app_not_found(format!("no app named '{}'", callback.app_name)))?;

    let app_configuration = AppConfigurationRepository::find_by_project_and_app(&pool, callback.project_id, app.id)
        .await?
        .ok_or_else(|| AppError::app_configuration_not_found(format!("no app configuration for '{}'", app.name)))?;
    if !app_configuration.enabled {
        return Err(AppError::app_configuration_disabled(format!("app configuration for '{}' is disabled", app.name)).into());
    }

    let config = effective_oauth2_scheme(&app, &app_configuration)?;
    if callback.client_id != config.client_id {
        return Err(AppError::oauth2_error(
            "state client_id does not match the project's current oauth2 client_id",
        )
        .into());
    }

    let credentials = oauth2
        .exchange_code(&config, &app.name, &query.code, &callback.pkce_verifier)
        .await
        .map_err(|e| AppError::oauth2_error(e.to_string()))?;

    let encrypted = encrypt_credentials(
        keyring.get_ref(),
        SecurityScheme::Oauth2,
        SecurityCredentialsDoc::Oauth2(credentials).to_value(),
    )
    .await
    .map_err(|e| AppError::crypto_error(e.to_string()))?;

    let existing = LinkedAccountRepository::find_by_project_app_owner(
        pool.get_ref(),
        callback.project_id,
        app.id,
        &callback.linked_account_owner_id,
    )
    .await?;

    let account = match existing {
        Some(existing) => LinkedAccountRepository::update_credentials(pool.get_ref(), existing.id, &encrypted)
            .await?
            .ok_or_else(|| AppError::linked_account_not_found(format!("no linked account '{}'", existing.id)))?,
        None => {
            LinkedAccountRepository::create(
                pool.get_ref(),
                callback.project_id,
                app.id,
                &callback.linked_account_owner_id,
                SecurityScheme::Oauth2,
                &encrypted,
            )
            .await?
        }
    };

    if let Some(redirect_url) = &callback.redirect_after {
        return Ok(HttpResponse::Found().append_header(("Location", redirect_url.as_str())).finish());
    }

    Ok(HttpResponse::Created().json(to_response(account, app.name)))
}

/// Enables/disables a Linked Account, or rotates its api_key credential
/// directly (oauth2 credentials are only ever updated via the refresh
/// flow — see [`crate::services::credential_resolver`]).
#[utoipa::path(
    patch,
    path = "/api/v1/linked-accounts/{id}",
    tag = "Linked Accounts",
    params(("id" = Uuid, Path, description = "Linked Account id")),
    request_body = UpdateLinkedAccountRequest,
    responses((status = 200, description = "Updated", body = LinkedAccountResponse))
)]
pub async fn update_linked_account(
    req: HttpRequest,
    id: web::Path<Uuid>,
    body: web::Json<UpdateLinkedAccountRequest>,
    pool: web::Data<DbPool>,
    keyring: web::Data<dyn Keyring>,
) -> ApiResult<HttpResponse> {
    RequestContext::extract(&req)?;

    let mut account = LinkedAccountRepository::find_by_id(pool.get_ref(), *id)
        .await?
        .ok_or_else(|| AppError::linked_account_not_found(format!("no linked account '{id}'")))?;

    if let Some(credentials) = &body.security_credentials {
        if account.security_scheme != SecurityScheme::ApiKey {
            return Err(AppError::invalid_function_input(
                "security_credentials may only be rotated directly for api_key accounts",
            )
            .into());
        }
        let doc = SecurityCredentialsDoc::from_value(SecurityScheme::ApiKey, credentials)
            .map_err(|e| AppError::invalid_function_input(format!("malformed credentials: {e}")))?;
        let encrypted = encrypt_credentials(keyring.get_ref(), SecurityScheme::ApiKey, doc.to_value())
            .await
            .map_err(|e| AppError::crypto_error(e.to_string()))?;
        account = LinkedAccountRepository::update_credentials(pool.get_ref(), *id, &encrypted)
            .await?
            .ok_or_else(|| AppError::linked_account_not_found(format!("no linked account '{id}'")))?;
    }

    if let Some(enabled) = body.enabled {
        account = LinkedAccountRepository::set_enabled(pool.get_ref(), *id, enabled)
            .await?
            .ok_or_else(|| AppError::linked_account_not_found(format!("no linked account '{id}'")))?;
    }

    let app = AppRepository::find_by_id(pool.get_ref(), account.app_id)
        .await?
        .ok_or_else(|| AppError::app_not_found("linked account's app no longer exists"))?;

    Ok(HttpResponse::Ok().json(to_response(account, app.name)))
}

/// Removes a Linked Account. Does not revoke the upstream oauth2 grant;
/// the provider's own token revocation endpoint is out of scope (§4.5).
#[utoipa::path(
    delete,
    path = "/api/v1/linked-accounts/{id}",
    tag = "Linked Accounts",
    params(("id" = Uuid, Path, description = "Linked Account id")),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_linked_account(
    req: HttpRequest,
    id: web::Path<Uuid>,
    pool: web::Data<DbPool>,
) -> ApiResult<HttpResponse> {
    RequestContext::extract(&req)?;

    let deleted = LinkedAccountRepository::delete(pool.get_ref(), *id).await?;
    if !deleted {
        return Err(AppError::linked_account_not_found(format!("no linked account '{id}'")).into());
    }

    Ok(HttpResponse::NoContent().finish())
}
