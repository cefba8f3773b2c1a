//! Authorization pipeline middleware (§4.4) and request context (§4.11).
//!
//! Runs once per request behind the `X-API-KEY` header: resolves the key to
//! an Agent and Project, enforces the daily quota, and stashes the result in
//! the request extensions for handlers to read via
//! [`RequestContext::extract`]. Function-scoped checks (App Configuration,
//! Linked Account, allowed_apps) stay in the execute handler since only it
//! knows which Function is being called.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use shared::error::Error as AppError;
use shared::DbPool;
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use crate::models::entities::{Agent, Project};
use crate::repositories::{AgentRepository, ApiKeyRepository, ProjectRepository};

/// Resolved identity for one request, read by handlers from
/// `req.extensions()`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub api_key_id: uuid::Uuid,
    pub agent: Agent,
    pub project: Project,
}

#[derive(Clone)]
pub struct AuthPipeline {
    hmac_secret: Rc<String>,
    daily_quota_limit: i64,
}

impl AuthPipeline {
    pub fn new(hmac_secret: String, daily_quota_limit: i64) -> Self {
        Self {
            hmac_secret: Rc::new(hmac_secret),
            daily_quota_limit,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthPipeline
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthPipelineMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthPipelineMiddleware {
            service: Rc::new(service),
            hmac_secret: self.hmac_secret.clone(),
            daily_quota_limit: self.daily_quota_limit,
        }))
    }
}

pub struct AuthPipelineMiddleware<S> {
    service: Rc<S>,
    hmac_secret: Rc<String>,
    daily_quota_limit: i64,
}

impl<S, B> Service<ServiceRequest> for AuthPipelineMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let hmac_secret = self.hmac_secret.clone();
        let daily_quota_limit = self.daily_quota_limit;

        Box::pin(async move {
            let pool = req
                .app_data::<web::Data<DbPool>>()
                .expect("DbPool must be registered as app_data")
                .clone();

            match authorize(&pool, &req, &hmac_secret, daily_quota_limit).await {
                Ok(context) => {
                    req.extensions_mut().insert(context);
                    service.call(req).await
                }
                Err(err) => Err(crate::error::ApiError(err).into()),
            }
        })
    }
}

/// Steps 1-3 of §4.4: HMAC lookup, Agent resolution, Project quota.
async fn authorize(
    pool: &DbPool,
    req: &ServiceRequest,
    hmac_secret: &str,
    daily_quota_limit: i64,
) -> Result<RequestContext, AppError> {
    let presented_key = req
        .headers()
        .get("X-API-KEY")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::invalid_api_key("missing X-API-KEY header"))?;

    let api_key = ApiKeyRepository::find_by_plaintext(pool, presented_key, hmac_secret)
        .await?
        .ok_or_else(|| AppError::invalid_api_key("no matching API key"))?;

    if !api_key.is_active() {
        return Err(AppError::invalid_api_key("API key is disabled or deleted"));
    }

    let agent = AgentRepository::find_by_api_key_id(pool, api_key.id)
        .await?
        .ok_or_else(|| AppError::agent_not_found("API key has no owning agent"))?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;
    let project = ProjectRepository::find_for_update_by_api_key_id(&mut tx, api_key.id)
        .await?
        .ok_or_else(|| AppError::project_not_found("agent has no owning project"))?;
    let project =
        ProjectRepository::increase_quota_usage(&mut tx, &project, Utc::now(), daily_quota_limit).await?;
    tx.commit().await.map_err(AppError::from)?;

    Ok(RequestContext { api_key_id: api_key.id, agent, project })
}

impl RequestContext {
    /// Reads the context a prior call to [`AuthPipelineMiddleware`] stored on
    /// the request.
    pub fn extract(req: &actix_web::HttpRequest) -> Result<RequestContext, crate::error::ApiError> {
        req.extensions()
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| crate::error::ApiError(AppError::invalid_api_key("missing request context")))
    }
}
