//! Security scheme configuration and credential document shapes (§3, §4.2).
//!
//! Apps declare which schemes they support (`SecuritySchemeDoc`, stored in
//! `apps.security_schemes`); Linked Accounts and App Configurations carry the
//! actual per-scheme credentials (`SecurityCredentialsDoc`, stored encrypted
//! in `linked_accounts.security_credentials` /
//! `app_configurations.security_scheme_overrides`). Neither document is
//! self-tagged on the wire — the owning row's `security_scheme` column picks
//! the variant, matching the unchanged credential shapes in the data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::enums::{HttpLocation, SecurityScheme};

/// Per-App configuration for one security scheme the App supports.
#[derive(Debug, Clone)]
pub enum SecuritySchemeDoc {
    NoAuth,
    ApiKey(ApiKeySchemeConfig),
    HttpBasic,
    HttpBearer,
    Oauth2(OAuth2SchemeConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeySchemeConfig {
    /// Header/query/cookie parameter name the key is injected under.
    pub name: String,
    pub location: HttpLocation,
    /// Optional prefix, e.g. `"Bearer "` for bearer-style API keys.
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2SchemeConfig {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl SecuritySchemeDoc {
    pub fn from_value(scheme: SecurityScheme, value: &Value) -> Result<Self, serde_json::Error> {
        match scheme {
            SecurityScheme::NoAuth => Ok(SecuritySchemeDoc::NoAuth),
            SecurityScheme::HttpBasic => Ok(SecuritySchemeDoc::HttpBasic),
            SecurityScheme::HttpBearer => Ok(SecuritySchemeDoc::HttpBearer),
            SecurityScheme::ApiKey => {
                Ok(SecuritySchemeDoc::ApiKey(serde_json::from_value(value.clone())?))
            }
            SecurityScheme::Oauth2 => {
                Ok(SecuritySchemeDoc::Oauth2(serde_json::from_value(value.clone())?))
            }
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            SecuritySchemeDoc::NoAuth | SecuritySchemeDoc::HttpBasic | SecuritySchemeDoc::HttpBearer => {
                serde_json::json!({})
            }
            SecuritySchemeDoc::ApiKey(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
            SecuritySchemeDoc::Oauth2(cfg) => serde_json::to_value(cfg).unwrap_or(Value::Null),
        }
    }
}

/// Credentials actually held for one Linked Account / App Configuration
/// override, shaped per the unchanged credential shapes in §3.
#[derive(Debug, Clone)]
pub enum SecurityCredentialsDoc {
    NoAuth,
    ApiKey(ApiKeyCredentials),
    Oauth2(OAuth2Credentials),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyCredentials {
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_token_response: Option<Value>,
}

impl OAuth2Credentials {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => chrono::Utc::now().timestamp() >= exp,
            None => false,
        }
    }
}

impl SecurityCredentialsDoc {
    /// Empty object means "fall back to the App's defaults" (§3) — callers
    /// should check this before resolving, not treat it as a parse failure.
    pub fn is_empty_fallback(value: &Value) -> bool {
        matches!(value, Value::Object(map) if map.is_empty())
    }

    pub fn from_value(scheme: SecurityScheme, value: &Value) -> Result<Self, serde_json::Error> {
        match scheme {
            SecurityScheme::NoAuth | SecurityScheme::HttpBasic | SecurityScheme::HttpBearer => {
                Ok(SecurityCredentialsDoc::NoAuth)
            }
            SecurityScheme::ApiKey => {
                Ok(SecurityCredentialsDoc::ApiKey(serde_json::from_value(value.clone())?))
            }
            SecurityScheme::Oauth2 => {
                Ok(SecurityCredentialsDoc::Oauth2(serde_json::from_value(value.clone())?))
            }
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            SecurityCredentialsDoc::NoAuth => serde_json::json!({}),
            SecurityCredentialsDoc::ApiKey(c) => serde_json::to_value(c).unwrap_or(Value::Null),
            SecurityCredentialsDoc::Oauth2(c) => serde_json::to_value(c).unwrap_or(Value::Null),
        }
    }

    /// Field names that the credential codec must encrypt at rest (invariant 6).
    pub fn encrypted_fields(scheme: SecurityScheme) -> &'static [&'static str] {
        match scheme {
            SecurityScheme::Oauth2 => {
                &["client_secret", "access_token", "refresh_token", "raw_token_response"]
            }
            SecurityScheme::ApiKey => &["secret_key"],
            SecurityScheme::NoAuth | SecurityScheme::HttpBasic | SecurityScheme::HttpBearer => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_fallback() {
        assert!(SecurityCredentialsDoc::is_empty_fallback(&serde_json::json!({})));
        assert!(!SecurityCredentialsDoc::is_empty_fallback(
            &serde_json::json!({"secret_key": "x"})
        ));
    }

    #[test]
    fn oauth2_encrypted_fields_match_invariant_6() {
        let fields = SecurityCredentialsDoc::encrypted_fields(SecurityScheme::Oauth2);
        assert_eq!(
            fields,
            &["client_secret", "access_token", "refresh_token", "raw_token_response"]
        );
    }

    #[test]
    fn api_key_encrypted_fields_match_invariant_6() {
        assert_eq!(
            SecurityCredentialsDoc::encrypted_fields(SecurityScheme::ApiKey),
            &["secret_key"]
        );
    }

    #[test]
    fn no_auth_round_trips_to_empty_object() {
        let doc = SecurityCredentialsDoc::NoAuth;
        assert_eq!(doc.to_value(), serde_json::json!({}));
    }

    #[test]
    fn oauth2_credentials_expiry() {
        let mut creds = OAuth2Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
            scope: "read".into(),
            access_token: "token".into(),
            token_type: None,
            expires_at: Some(0),
            refresh_token: None,
            raw_token_response: None,
        };
        assert!(creds.is_expired());
        creds.expires_at = Some(chrono::Utc::now().timestamp() + 3600);
        assert!(!creds.is_expired());
    }
}
