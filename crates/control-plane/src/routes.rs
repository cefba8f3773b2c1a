//! Route configuration for the API (§6).
//!
//! `/health` and `/openapi.json` stay open for unauthenticated
//! discovery/monitoring; every other route sits behind the
//! [`AuthPipeline`](crate::middleware::auth_pipeline::AuthPipeline)
//! `X-API-KEY` gate.

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::middleware::auth_pipeline::AuthPipeline;
use crate::openapi::ApiDoc;

/// Configure all routes. `hmac_secret`/`daily_quota_limit` are threaded in
/// here (rather than wrapping the whole `App`) so the auth gate can be
/// scoped away from the unauthenticated health/discovery endpoints.
pub fn configure(cfg: &mut web::ServiceConfig, hmac_secret: String, daily_quota_limit: i64) {
    cfg.service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api/v1/openapi.json", ApiDoc::openapi()));

    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health::health_check))
            .route("/openapi.json", web::get().to(handlers::health::openapi_json))
            // The provider redirects the end user's browser straight here;
            // there is no X-API-KEY to present. Authenticity instead comes
            // from the signed state token `oauth2_callback` verifies itself.
            .route(
                "/linked-accounts/oauth2/callback",
                web::get().to(handlers::linked_accounts::oauth2_callback),
            )
            // Function definitions only require the function/app to be
            // public and active, same as a package registry's doc page.
            .route(
                "/functions/{name}/definition",
                web::get().to(handlers::functions::get_function_definition),
            ),
    );

    cfg.service(
        web::scope("/api/v1")
            .wrap(AuthPipeline::new(hmac_secret, daily_quota_limit))
            .service(
                web::scope("/apps")
                    .route("/search", web::get().to(handlers::apps::search_apps))
                    .route("/{name}", web::get().to(handlers::apps::get_app)),
            )
            .service(
                web::scope("/functions")
                    .route("/{name}/execute", web::post().to(handlers::functions::execute_function)),
            )
            .service(
                web::scope("/app-configurations")
                    .route("", web::post().to(handlers::app_configurations::create_app_configuration))
                    .route("/{id}", web::patch().to(handlers::app_configurations::update_app_configuration))
                    .route("/{id}", web::delete().to(handlers::app_configurations::delete_app_configuration)),
            )
            .service(
                web::scope("/linked-accounts")
                    .route("/api-key", web::post().to(handlers::linked_accounts::link_api_key_account))
                    .route("/no-auth", web::post().to(handlers::linked_accounts::link_no_auth_account))
                    .route("/default", web::post().to(handlers::linked_accounts::link_default_account))
                    .route("/oauth2", web::post().to(handlers::linked_accounts::start_oauth2_link))
                    .route("/{id}", web::patch().to(handlers::linked_accounts::update_linked_account))
                    .route("/{id}", web::delete().to(handlers::linked_accounts::delete_linked_account)),
            ),
    );
}
