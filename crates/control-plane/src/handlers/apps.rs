//! App discovery handlers (§4.10, §6): `GET /apps/search`, `GET /apps/{name}`.

use actix_web::{web, HttpRequest, HttpResponse};
use shared::DbPool;

use crate::error::ApiResult;
use crate::middleware::auth_pipeline::RequestContext;
use crate::models::{AppSearchQuery, AppSummary, FunctionSummary};
use crate::repositories::FunctionRepository;
use crate::services::DiscoveryService;

/// Searches Apps visible to the requesting Agent's project, optionally
/// ranked by embedding distance to `intent` and narrowed to the Agent's
/// `allowed_apps` allow-list.
#[utoipa::path(
    get,
    path = "/api/v1/apps/search",
    tag = "Apps",
    params(AppSearchQuery),
    responses((status = 200, description = "Matching apps", body = [AppSummary]))
)]
pub async fn search_apps(
    req: HttpRequest,
    query: web::Query<AppSearchQuery>,
    pool: web::Data<DbPool>,
    discovery: web::Data<DiscoveryService>,
) -> ApiResult<HttpResponse> {
    let context = RequestContext::extract(&req)?;
    query.pagination.validate().map_err(|e| shared::error::Error::invalid_function_input(e))?;

    let allowed_apps = if query.allowed_apps_only { Some(context.agent.allowed_apps.as_slice()) } else { None };

    let apps = discovery
        .search_apps(
            &pool,
            query.intent.as_deref(),
            &query.categories,
            allowed_apps,
            query.pagination.limit,
            query.pagination.offset,
        )
        .await?;

    let mut summaries = Vec::with_capacity(apps.len());
    for app in &apps {
        let functions = if query.include_functions {
            let functions = FunctionRepository::find_by_app_id(pool.get_ref(), app.id).await?;
            Some(functions.iter().map(FunctionSummary::from_function).collect())
        } else {
            None
        };
        summaries.push(AppSummary::from_app(app, functions));
    }

    Ok(HttpResponse::Ok().json(summaries))
}

/// Looks up a single App by name, for Agents that already know what they
/// want to call.
#[utoipa::path(
    get,
    path = "/api/v1/apps/{name}",
    tag = "Apps",
    params(("name" = String, Path, description = "App name")),
    responses(
        (status = 200, description = "The app", body = AppSummary),
        (status = 404, description = "No such app")
    )
)]
pub async fn get_app(
    req: HttpRequest,
    name: web::Path<String>,
    pool: web::Data<DbPool>,
    discovery: web::Data<DiscoveryService>,
) -> ApiResult<HttpResponse> {
    RequestContext::extract(&req)?;

    let app = discovery
        .app_by_name(&pool, &name)
        .await?
        .ok_or_else(|| shared::error::Error::app_not_found(format!("no app named '{name}'")))?;

    Ok(HttpResponse::Ok().json(AppSummary::from_app(&app, None)))
}
