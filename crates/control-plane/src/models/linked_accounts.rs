//! Linked Account DTOs (§6: api-key / no-auth / default / oauth2 linking routes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::enums::SecurityScheme;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LinkApiKeyAccountRequest {
    #[validate(regex(path = "crate::validators::APP_NAME_REGEX"))]
    pub app_name: String,
    #[validate(length(min = 1))]
    pub linked_account_owner_id: String,
    #[validate(length(min = 1))]
    pub secret_key: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LinkNoAuthAccountRequest {
    #[validate(regex(path = "crate::validators::APP_NAME_REGEX"))]
    pub app_name: String,
    #[validate(length(min = 1))]
    pub linked_account_owner_id: String,
}

/// Links an account that falls back entirely to the App's default
/// credentials for the App Configuration's selected scheme.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LinkDefaultAccountRequest {
    #[validate(regex(path = "crate::validators::APP_NAME_REGEX"))]
    pub app_name: String,
    #[validate(length(min = 1))]
    pub linked_account_owner_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartOauth2LinkRequest {
    #[validate(regex(path = "crate::validators::APP_NAME_REGEX"))]
    pub app_name: String,
    #[validate(length(min = 1))]
    pub linked_account_owner_id: String,
    /// Where to send the end user back after the provider redirect.
    pub after_oauth2_link_redirect_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartOauth2LinkResponse {
    pub authorization_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct Oauth2CallbackQuery {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLinkedAccountRequest {
    pub enabled: Option<bool>,
    /// Present only for schemes whose credentials the caller may rotate
    /// directly (api_key); oauth2 credentials are only ever updated via the
    /// refresh flow.
    pub security_credentials: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkedAccountResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub app_name: String,
    pub linked_account_owner_id: String,
    pub security_scheme: SecurityScheme,
    pub enabled: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_api_key_account_rejects_empty_secret() {
        let req = LinkApiKeyAccountRequest {
            app_name: "GITHUB".into(),
            linked_account_owner_id: "user-1".into(),
            secret_key: "".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn start_oauth2_link_accepts_missing_redirect() {
        let req = StartOauth2LinkRequest {
            app_name: "SLACK".into(),
            linked_account_owner_id: "user-1".into(),
            after_oauth2_link_redirect_url: None,
        };
        assert!(req.validate().is_ok());
    }
}
