//! Integration tests for the per-IP rate limiting middleware.
//!
//! These exercise [`IpRateLimit`] against a real Redis instance, since the
//! dual-window check-and-increment logic lives in a Lua script that only
//! `RateLimiter`'s own unit tests (pure arithmetic, no Redis) can't cover.
//!
//! # Running
//!
//! ```bash
//! export TEST_REDIS_URL="redis://localhost:6379"
//! cargo test -p control-plane --test rate_limiting_integration -- --ignored
//! ```

use actix_web::{test, web, App, HttpResponse};
use control_plane::middleware::rate_limit::IpRateLimit;
use shared::redis::{RateLimitScope, RateLimiter};

async fn create_test_redis() -> redis::aio::ConnectionManager {
    let redis_url = std::env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    shared::redis::create_client(&redis_url).await.expect("failed to connect to test redis")
}

async fn success_handler() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::test]
#[ignore] // requires TEST_REDIS_URL
async fn per_second_limit_rejects_the_request_that_exceeds_it() {
    let redis = create_test_redis().await;
    let limiter = RateLimiter::new(redis).await.expect("failed to build rate limiter");
    let ip = "198.51.100.10";
    limiter.reset(RateLimitScope::IpPerSecond, ip).await.unwrap();
    limiter.reset(RateLimitScope::IpPerDay, ip).await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(limiter))
            .wrap(IpRateLimit::new(3, 10_000))
            .route("/test", web::get().to(success_handler)),
    )
    .await;

    for i in 1..=3 {
        let req = test::TestRequest::get().uri("/test").insert_header(("X-Forwarded-For", ip)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "request {i} should succeed");
    }

    let req = test::TestRequest::get().uri("/test").insert_header(("X-Forwarded-For", ip)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);

    let headers = resp.headers();
    assert!(headers.contains_key("x-ratelimit-limit"));
    assert!(headers.contains_key("x-ratelimit-remaining"));
    assert!(headers.contains_key("retry-after"));
}

#[actix_web::test]
#[ignore] // requires TEST_REDIS_URL
async fn different_ips_have_independent_limits() {
    let redis = create_test_redis().await;
    let limiter = RateLimiter::new(redis).await.expect("failed to build rate limiter");
    for ip in ["198.51.100.20", "198.51.100.21"] {
        limiter.reset(RateLimitScope::IpPerSecond, ip).await.unwrap();
        limiter.reset(RateLimitScope::IpPerDay, ip).await.unwrap();
    }

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(limiter))
            .wrap(IpRateLimit::new(1, 10_000))
            .route("/test", web::get().to(success_handler)),
    )
    .await;

    for ip in ["198.51.100.20", "198.51.100.21"] {
        let req = test::TestRequest::get().uri("/test").insert_header(("X-Forwarded-For", ip)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "first request from {ip} should succeed");
    }
}

#[actix_web::test]
#[ignore] // requires TEST_REDIS_URL
async fn daily_limit_rejects_once_exhausted() {
    let redis = create_test_redis().await;
    let limiter = RateLimiter::new(redis).await.expect("failed to build rate limiter");
    let ip = "198.51.100.30";
    limiter.reset(RateLimitScope::IpPerSecond, ip).await.unwrap();
    limiter.reset(RateLimitScope::IpPerDay, ip).await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(limiter))
            .wrap(IpRateLimit::new(10_000, 2))
            .route("/test", web::get().to(success_handler)),
    )
    .await;

    for _ in 1..=2 {
        let req = test::TestRequest::get().uri("/test").insert_header(("X-Forwarded-For", ip)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    }

    let req = test::TestRequest::get().uri("/test").insert_header(("X-Forwarded-For", ip)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn missing_rate_limiter_app_data_lets_the_request_through() {
    // IpRateLimit degrades to a no-op when RateLimiter isn't registered,
    // the same as a missing Redis connection failing open.
    let app = test::init_service(
        App::new().wrap(IpRateLimit::new(1, 1)).route("/test", web::get().to(success_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
}
