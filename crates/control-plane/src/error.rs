//! Actix adapter for `shared::error::Error` (§7).
//!
//! Orphan rules forbid implementing the foreign `ResponseError` trait on the
//! foreign `shared::Error` type from here, so handlers return `ApiError` —
//! a thin newtype — and let `?` convert via `From<shared::Error>`.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::models::common::ErrorResponse;

#[derive(Debug)]
pub struct ApiError(pub shared::error::Error);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<shared::error::Error> for ApiError {
    fn from(err: shared::error::Error) -> Self {
        ApiError(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError(shared::error::Error::from(err))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.0.to_string();
        HttpResponse::build(self.status_code())
            .json(ErrorResponse::new(self.0.title(), message))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::Error;

    #[test]
    fn app_not_found_maps_to_404() {
        let err = ApiError(Error::app_not_found("GMAIL"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_api_key_maps_to_401() {
        let err = ApiError(Error::invalid_api_key("missing header"));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn app_configuration_already_exists_maps_to_409() {
        let err = ApiError(Error::app_configuration_already_exists("dup"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
