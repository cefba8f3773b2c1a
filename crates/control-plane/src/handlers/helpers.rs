//! Common Handler Helpers
//!
//! Reusable helper functions that consolidate common patterns found across
//! handlers: request validation, error-to-response mapping, and audit
//! metadata extraction. Authorization identity lives in
//! [`crate::middleware::auth_pipeline::RequestContext`], not here.

use actix_web::{HttpRequest, HttpResponse};
use validator::Validate;

use crate::models::ErrorResponse;

/// Validate a request struct or return 400 Bad Request.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), HttpResponse> {
    req.validate().map_err(|e| {
        HttpResponse::BadRequest().json(ErrorResponse::new(
            "validation_error",
            format!("Validation failed: {}", e),
        ))
    })
}

/// Convert database errors to a 500 with consistent logging.
pub fn handle_db_error<T, E: std::fmt::Display>(
    result: Result<T, E>,
    context: &str,
) -> Result<T, HttpResponse> {
    result.map_err(|e| {
        tracing::error!("Database error during {}: {}", context, e);
        HttpResponse::InternalServerError().json(ErrorResponse::new(
            "internal_error",
            format!("Failed to {}", context),
        ))
    })
}

/// Convert Option<T> to T or return 404 Not Found.
pub fn require_found<T>(option: Option<T>, resource: &str) -> Result<T, HttpResponse> {
    option.ok_or_else(|| {
        HttpResponse::NotFound().json(ErrorResponse::new(
            "not_found",
            format!("{} not found", resource),
        ))
    })
}

pub fn forbidden(message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(ErrorResponse::new("forbidden", message))
}

pub fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new("bad_request", message))
}

/// A safe internal server error that never leaks the underlying cause.
pub fn safe_internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse::new(
        "internal_error",
        "An internal error occurred. Please try again later.",
    ))
}

/// Audit-log metadata pulled from the raw HTTP request (IP, user agent,
/// endpoint path). Distinct from the authorization identity carried in
/// [`crate::middleware::auth_pipeline::RequestContext`].
pub struct AuditContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub endpoint: String,
}

impl AuditContext {
    pub fn ip_str(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn user_agent_str(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn endpoint_str(&self) -> &str {
        &self.endpoint
    }
}

pub fn extract_audit_context(req: &HttpRequest) -> AuditContext {
    let ip = req.connection_info().realip_remote_addr().map(|s| s.to_string());

    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let endpoint = req.path().to_string();

    AuditContext {
        ip,
        user_agent,
        endpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationErrors;

    #[derive(Validate)]
    struct Dummy {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn validate_request_passes_through_valid_struct() {
        let dummy = Dummy { name: "x".into() };
        assert!(validate_request(&dummy).is_ok());
    }

    #[test]
    fn validate_request_rejects_invalid_struct() {
        let dummy = Dummy { name: "".into() };
        assert!(validate_request(&dummy).is_err());
    }

    #[test]
    fn require_found_maps_none_to_404() {
        let result: Result<i32, HttpResponse> = require_found(None::<i32>, "Widget");
        assert!(result.is_err());
    }

    #[test]
    fn handle_db_error_maps_err_to_500() {
        let result: Result<i32, ValidationErrors> = Err(ValidationErrors::new());
        assert!(handle_db_error(result, "do a thing").is_err());
    }
}
