//! Row types for the data model entities (§3).
//!
//! These mirror the Postgres schema column-for-column; JSON columns stay as
//! `serde_json::Value` here and get parsed into the richer
//! [`crate::models::credentials`] types at the point of use, since the
//! shape of `security_credentials` depends on the sibling `security_scheme`
//! column and can't be decided by `FromRow` alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::enums::{ApiKeyStatus, Protocol, SecurityScheme, Visibility};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub visibility_access: Visibility,
    pub daily_quota_used: i64,
    pub daily_quota_reset_at: DateTime<Utc>,
    pub total_quota_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    /// Ordered App names this Agent may call.
    pub allowed_apps: Vec<String>,
    /// Function name -> custom instruction text (<=5000 chars, non-empty).
    pub custom_instructions: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn custom_instruction_for(&self, function_name: &str) -> Option<&str> {
        self.custom_instructions.get(function_name).and_then(Value::as_str)
    }

    pub fn allows_app(&self, app_name: &str) -> bool {
        self.allowed_apps.iter().any(|a| a == app_name)
    }
}

/// Exactly one live row per Agent. `ciphertext`/`hmac` store the encrypted
/// API key and its lookup tag; the plaintext is returned to the caller only
/// once, at creation time, and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub ciphertext: Vec<u8>,
    /// Hex-encoded HMAC-SHA256 digest used for lookup (see `shared::crypto::hmac_sha256`).
    pub hmac: String,
    pub status: ApiKeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_active(&self) -> bool {
        self.status == ApiKeyStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct App {
    pub id: Uuid,
    /// Unique, uppercase, matches `^[A-Z0-9_]+$` with no consecutive underscores.
    pub name: String,
    pub display_name: String,
    pub provider: String,
    pub version: String,
    pub description: String,
    pub logo: Option<String>,
    pub categories: Vec<String>,
    pub visibility: Visibility,
    pub active: bool,
    /// Scheme kind -> scheme config, see [`crate::models::credentials::SecuritySchemeDoc`].
    pub security_schemes: Value,
    /// Scheme kind -> default credentials offered to every Linked Account
    /// that doesn't supply its own.
    pub default_security_credentials_by_scheme: Value,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl App {
    pub fn supports_scheme(&self, scheme: SecurityScheme) -> bool {
        let key = serde_json::to_value(scheme).ok();
        key.and_then(|k| k.as_str().map(|s| self.security_schemes.get(s).is_some()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Function {
    pub id: Uuid,
    pub app_id: Uuid,
    /// `<APP>__<OPERATION>`, matches `^[A-Z][A-Z0-9_]*__[A-Z0-9_]+$`.
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub active: bool,
    pub protocol: Protocol,
    pub protocol_data: Value,
    /// JSON Schema augmented with `visible` and `additionalProperties: false`.
    pub parameters: Value,
    pub response: Value,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Function {
    /// The App name this Function's name is namespaced under.
    pub fn app_name(&self) -> &str {
        self.name.split("__").next().unwrap_or(&self.name)
    }
}

/// A Project's opt-in to use one App, optionally narrowing which Functions
/// and which security scheme it exposes.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AppConfiguration {
    pub id: Uuid,
    pub project_id: Uuid,
    pub app_id: Uuid,
    pub security_scheme: SecurityScheme,
    pub security_scheme_overrides: Value,
    pub enabled: bool,
    pub all_functions_enabled: bool,
    /// Empty whenever `all_functions_enabled` is true (invariant).
    pub enabled_functions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppConfiguration {
    pub fn allows_function(&self, function_name: &str) -> bool {
        self.all_functions_enabled || self.enabled_functions.iter().any(|f| f == function_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LinkedAccount {
    pub id: Uuid,
    pub project_id: Uuid,
    pub app_id: Uuid,
    /// Unique per (project, app).
    pub linked_account_owner_id: String,
    pub security_scheme: SecurityScheme,
    /// Encrypted JSON; an empty object means fall back to the App's defaults.
    pub security_credentials: Value,
    pub enabled: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkedAccount {
    pub fn uses_app_defaults(&self) -> bool {
        crate::models::credentials::SecurityCredentialsDoc::is_empty_fallback(&self.security_credentials)
    }
}

/// Opaque value stored by the Agent Secrets Manager connector, keyed by
/// (linked_account, key name).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Secret {
    pub id: Uuid,
    pub linked_account_id: Uuid,
    pub key_name: String,
    pub encrypted_value: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_agent(allowed_apps: Vec<String>) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: "agent".into(),
            description: "".into(),
            allowed_apps,
            custom_instructions: serde_json::json!({"GMAIL__SEND_EMAIL": "always cc compliance"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn agent_allows_app_checks_membership() {
        let agent = sample_agent(vec!["GMAIL".into(), "SLACK".into()]);
        assert!(agent.allows_app("GMAIL"));
        assert!(!agent.allows_app("NOTION"));
    }

    #[test]
    fn agent_custom_instruction_lookup() {
        let agent = sample_agent(vec![]);
        assert_eq!(
            agent.custom_instruction_for("GMAIL__SEND_EMAIL"),
            Some("always cc compliance")
        );
        assert_eq!(agent.custom_instruction_for("GMAIL__LIST_EMAILS"), None);
    }

    #[test]
    fn function_app_name_splits_on_double_underscore() {
        let function = Function {
            id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            name: "GMAIL__SEND_EMAIL".into(),
            description: "".into(),
            tags: vec![],
            visibility: Visibility::Public,
            active: true,
            protocol: Protocol::Rest,
            protocol_data: serde_json::json!({}),
            parameters: serde_json::json!({}),
            response: serde_json::json!({}),
            embedding: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(function.app_name(), "GMAIL");
    }

    #[test]
    fn app_configuration_all_functions_enabled_allows_anything() {
        let config = AppConfiguration {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            security_scheme: SecurityScheme::Oauth2,
            security_scheme_overrides: serde_json::json!({}),
            enabled: true,
            all_functions_enabled: true,
            enabled_functions: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(config.allows_function("ANYTHING__AT_ALL"));
    }

    #[test]
    fn linked_account_detects_app_default_fallback() {
        let account = LinkedAccount {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            linked_account_owner_id: "user-1".into(),
            security_scheme: SecurityScheme::ApiKey,
            security_credentials: serde_json::json!({}),
            enabled: true,
            last_used_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(account.uses_app_defaults());
    }
}
