//! Dual-window per-IP rate limiting middleware (§5).
//!
//! Wraps `shared::redis::RateLimiter` and rejects with 429 plus
//! `X-RateLimit-*`/`Retry-After` headers when either window is exceeded.

use actix_web::{
    body::BoxBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    web, Error, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use shared::redis::{RateLimitResult, RateLimiter};
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::middleware::ip_extractor::extract_ip;

#[derive(Clone)]
pub struct IpRateLimit {
    per_second_limit: i64,
    per_day_limit: i64,
}

impl IpRateLimit {
    pub fn new(per_second_limit: i64, per_day_limit: i64) -> Self {
        Self {
            per_second_limit,
            per_day_limit,
        }
    }
}

impl<S> Transform<S, ServiceRequest> for IpRateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = IpRateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IpRateLimitMiddleware {
            service: Rc::new(service),
            per_second_limit: self.per_second_limit,
            per_day_limit: self.per_day_limit,
        }))
    }
}

pub struct IpRateLimitMiddleware<S> {
    service: Rc<S>,
    per_second_limit: i64,
    per_day_limit: i64,
}

impl<S> Service<ServiceRequest> for IpRateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
    S::Future: 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let per_second_limit = self.per_second_limit;
        let per_day_limit = self.per_day_limit;

        Box::pin(async move {
            let limiter = req.app_data::<web::Data<RateLimiter>>().cloned();
            let ip = extract_ip(req.request());

            if let Some(limiter) = limiter {
                match limiter.check_both(&ip, per_second_limit, per_day_limit).await {
                    Ok((per_second, per_day)) => {
                        if !per_second.allowed || !per_day.allowed {
                            let limiting = if !per_second.allowed { &per_second } else { &per_day };
                            let response = rate_limited_response(limiting);
                            return Ok(req.into_response(response));
                        }
                    }
                    Err(_) => {
                        // RateLimiter fails open internally; a hard error here means
                        // something else is wrong, so let the request through.
                    }
                }
            }

            service.call(req).await
        })
    }
}

fn rate_limited_response(result: &RateLimitResult) -> HttpResponse {
    let mut response = HttpResponse::TooManyRequests().json(serde_json::json!({
        "error": "Rate limit exceeded",
        "message": format!("retry after {} seconds", result.retry_after),
    }));

    let headers = response.headers_mut();
    insert_header(headers, "x-ratelimit-limit", result.limit);
    insert_header(headers, "x-ratelimit-remaining", result.remaining);
    insert_header(headers, "x-ratelimit-reset", result.reset_at);
    insert_header(headers, "retry-after", result.retry_after);
    response
}

fn insert_header(headers: &mut actix_web::http::header::HeaderMap, name: &'static str, value: i64) {
    if let Ok(value) = HeaderValue::try_from(value.to_string()) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_response_sets_retry_after_header() {
        let result = RateLimitResult {
            allowed: false,
            current_usage: 10,
            limit: 5,
            reset_at: 1_700_000_000,
            retry_after: 42,
            remaining: 0,
        };
        let response = rate_limited_response(&result);
        assert_eq!(response.headers().get("retry-after").unwrap(), "42");
        assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "5");
    }
}
