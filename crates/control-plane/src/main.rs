//! Agent-integration control plane API
//!
//! REST API server letting software agents discover third-party Apps, link
//! per-end-user credentials to them, and execute their Functions.

// TODO: Fix Clippy warnings in follow-up PR
#![allow(clippy::all)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use shared::{db, redis::RateLimiter, Config};
use std::time::Duration;

use control_plane::middleware::metrics::{init_metrics, metrics_handler, PrometheusMetrics};
use control_plane::middleware::rate_limit::IpRateLimit;
use control_plane::middleware::request_id::RequestId;
use control_plane::middleware::security_headers::SecurityHeaders;
use control_plane::services::{DiscoveryService, EmbeddingsClient, Oauth2Orchestrator, PolicyJudge};
use control_plane::{middleware, routes};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    shared::init_tracing();

    tracing::info!("Starting control plane...");

    init_metrics();

    let config = Config::from_env().context("Failed to load configuration")?;

    let db_pool = db::create_pool(&config.database)
        .await
        .context("Failed to create database pool")?;

    db::run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    db::check_health(&db_pool)
        .await
        .context("Database health check failed")?;

    // Build the configured crypto backend and round-trip a known plaintext
    // through it before accepting traffic (§4.1) — a broken keyring must
    // never come up silently and start handling credential writes.
    let keyring = shared::crypto::build_and_self_test(&config.crypto)
        .await
        .context("Keyring self-test failed")?;
    let keyring: web::Data<dyn shared::crypto::Keyring> = web::Data::from(keyring.into());
    tracing::info!(backend = %config.crypto.backend, "Keyring self-test passed");

    let redis_client = shared::redis::create_client(&config.redis.connection_url())
        .await
        .context("Failed to create Redis client")?;
    tracing::info!("Redis client connected for rate limiting");

    let rate_limiter = RateLimiter::new(redis_client)
        .await
        .context("Failed to create rate limiter")?;

    // One connection-pooled client shared by the REST executor, the OAuth2
    // orchestrator's token exchange, and the embeddings/policy-judge calls
    // (§4.8, §5: 10s connect / 30s read timeout on every outbound call).
    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let oauth2 = Oauth2Orchestrator::new(
        config.oauth.state_secret.clone(),
        http_client.clone(),
        config.oauth.callback_base_url.clone(),
    );

    let embeddings = EmbeddingsClient::new(
        http_client.clone(),
        config.embeddings.api_base.clone(),
        config.embeddings.api_key.clone(),
        config.embeddings.model.clone(),
    );
    let discovery = DiscoveryService::new(embeddings);

    let policy_judge = PolicyJudge::new(
        http_client.clone(),
        config.policy_judge.api_base.clone(),
        config.policy_judge.api_key.clone(),
        config.policy_judge.model.clone(),
    );

    let hmac_secret = config.crypto.api_key_hashing_secret.clone();
    let daily_quota_limit = config.quota.project_daily_quota;
    let ip_per_second = config.rate_limit.ip_per_second as i64;
    let ip_per_day = config.rate_limit.ip_per_day as i64;

    let server_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Control plane listening on {}", server_addr);

    let server = HttpServer::new(move || {
        App::new()
            // Add security headers middleware (must be first to apply to all responses)
            .wrap(SecurityHeaders::for_api())
            .wrap(PrometheusMetrics::new())
            .wrap(RequestId::new())
            .wrap(Logger::default())
            .wrap(middleware::cors())
            .wrap(IpRateLimit::new(ip_per_second, ip_per_day))
            .route("/metrics", web::get().to(metrics_handler))
            .app_data(web::JsonConfig::default().limit(1_048_576))
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(rate_limiter.clone()))
            .app_data(web::Data::new(http_client.clone()))
            .app_data(keyring.clone())
            .app_data(web::Data::new(oauth2.clone()))
            .app_data(web::Data::new(discovery.clone()))
            .app_data(web::Data::new(policy_judge.clone()))
            .configure(|cfg| routes::configure(cfg, hmac_secret.clone(), daily_quota_limit))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind to {}", server_addr))?;

    let server_handle = server.run();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    server_handle.await.context("Server error")?;

    tracing::info!("Control plane shutdown complete");

    Ok(())
}
