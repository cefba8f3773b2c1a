//! App Configuration DTOs (§6: `POST/PATCH/DELETE /app-configurations`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::enums::SecurityScheme;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAppConfigurationRequest {
    #[validate(regex(path = "crate::validators::APP_NAME_REGEX"))]
    pub app_name: String,
    pub security_scheme: SecurityScheme,
    #[serde(default)]
    pub security_scheme_overrides: serde_json::Value,
    #[serde(default = "default_true")]
    pub all_functions_enabled: bool,
    #[serde(default)]
    pub enabled_functions: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl CreateAppConfigurationRequest {
    /// `all_functions_enabled=true` implies `enabled_functions` must be empty.
    pub fn validate_function_selection(&self) -> Result<(), &'static str> {
        if self.all_functions_enabled && !self.enabled_functions.is_empty() {
            return Err("enabled_functions must be empty when all_functions_enabled is true");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAppConfigurationRequest {
    pub enabled: Option<bool>,
    pub security_scheme_overrides: Option<serde_json::Value>,
    pub all_functions_enabled: Option<bool>,
    pub enabled_functions: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppConfigurationResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub app_name: String,
    pub security_scheme: SecurityScheme,
    pub enabled: bool,
    pub all_functions_enabled: bool,
    pub enabled_functions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_enabled_functions_when_all_enabled() {
        let req = CreateAppConfigurationRequest {
            app_name: "GMAIL".into(),
            security_scheme: SecurityScheme::Oauth2,
            security_scheme_overrides: serde_json::json!({}),
            all_functions_enabled: true,
            enabled_functions: vec!["GMAIL__SEND_EMAIL".into()],
        };
        assert!(req.validate_function_selection().is_err());
    }

    #[test]
    fn accepts_explicit_function_list_when_not_all_enabled() {
        let req = CreateAppConfigurationRequest {
            app_name: "GMAIL".into(),
            security_scheme: SecurityScheme::Oauth2,
            security_scheme_overrides: serde_json::json!({}),
            all_functions_enabled: false,
            enabled_functions: vec!["GMAIL__SEND_EMAIL".into()],
        };
        assert!(req.validate_function_selection().is_ok());
    }
}
