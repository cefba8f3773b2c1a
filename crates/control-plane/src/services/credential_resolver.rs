//! Credential resolver (§4.6): turns a Linked Account (or its App's
//! defaults) into usable, decrypted credentials for the execution engine,
//! refreshing an expired oauth2 access token in place first.
//!
//! Refresh uses the **linked-account-stored** client id/secret, not the
//! App Configuration's current override — an App's OAuth2 client
//! credentials can rotate without invalidating already-issued refresh
//! tokens tied to the original client.

use shared::crypto::Keyring;
use shared::error::{Error, Result};
use sqlx::{Postgres, Transaction};

use crate::models::credentials::{OAuth2Credentials, SecurityCredentialsDoc};
use crate::models::entities::{App, LinkedAccount};
use crate::models::enums::SecurityScheme;
use crate::repositories::LinkedAccountRepository;
use crate::services::credential_codec::{decrypt_credentials, encrypt_credentials};
use crate::services::oauth2::Oauth2Orchestrator;

/// Decrypted, ready-to-use credential document for one Function call.
pub struct ResolvedCredentials {
    pub scheme: SecurityScheme,
    pub document: SecurityCredentialsDoc,
}

/// Resolves and, if necessary, refreshes the credentials for `linked_account`.
/// Falls back to `app`'s defaults for the account's scheme when the account
/// carries the empty-object fallback marker (§3).
pub async fn resolve(
    tx: &mut Transaction<'_, Postgres>,
    keyring: &dyn Keyring,
    oauth2: &Oauth2Orchestrator,
    app: &App,
    linked_account: &LinkedAccount,
) -> Result<ResolvedCredentials> {
    let scheme = linked_account.security_scheme;

    let raw_encrypted = if linked_account.uses_app_defaults() {
        app.default_security_credentials_by_scheme
            .get(scheme_key(scheme))
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}))
    } else {
        linked_account.security_credentials.clone()
    };

    let decrypted = decrypt_credentials(keyring, scheme, raw_encrypted)
        .await
        .map_err(|e| Error::unexpected(format!("failed to decrypt credentials: {e}")))?;

    let document = SecurityCredentialsDoc::from_value(scheme, &decrypted)
        .map_err(|e| Error::unexpected(format!("malformed credential document: {e}")))?;

    let document = match document {
        SecurityCredentialsDoc::Oauth2(creds) if creds.is_expired() => {
            let refreshed = refresh(tx, keyring, oauth2, app, linked_account, &creds).await?;
            SecurityCredentialsDoc::Oauth2(refreshed)
        }
        other => other,
    };

    Ok(ResolvedCredentials { scheme, document })
}

async fn refresh(
    tx: &mut Transaction<'_, Postgres>,
    keyring: &dyn Keyring,
    oauth2: &Oauth2Orchestrator,
    app: &App,
    linked_account: &LinkedAccount,
    expired: &OAuth2Credentials,
) -> Result<OAuth2Credentials> {
    let refresh_token = expired
        .refresh_token
        .as_deref()
        .ok_or_else(|| Error::unexpected("oauth2 access token expired with no refresh token on file"))?;

    let scheme_doc = app
        .security_schemes
        .get(scheme_key(SecurityScheme::Oauth2))
        .ok_or_else(|| Error::unexpected("app has no oauth2 scheme configured"))?;
    let app_config: crate::models::credentials::OAuth2SchemeConfig =
        serde_json::from_value(scheme_doc.clone())
            .map_err(|e| Error::unexpected(format!("malformed oauth2 scheme config: {e}")))?;

    let config = crate::models::credentials::OAuth2SchemeConfig {
        client_id: expired.client_id.clone(),
        client_secret: expired.client_secret.clone(),
        scope: expired.scope.clone(),
        authorize_url: app_config.authorize_url,
        token_url: app_config.token_url,
    };

    let refreshed = oauth2
        .refresh(&config, &app.name, refresh_token)
        .await
        .map_err(|e| Error::unexpected(format!("oauth2 refresh failed: {e}")))?;

    // Providers sometimes omit refresh_token on refresh responses, meaning
    // "unchanged" — keep the one we already have in that case.
    let mut refreshed = refreshed;
    if refreshed.refresh_token.is_none() {
        refreshed.refresh_token = expired.refresh_token.clone();
    }

    let encrypted = encrypt_credentials(
        keyring,
        SecurityScheme::Oauth2,
        SecurityCredentialsDoc::Oauth2(refreshed.clone()).to_value(),
    )
    .await
    .map_err(|e| Error::unexpected(format!("failed to encrypt refreshed credentials: {e}")))?;

    LinkedAccountRepository::update_credentials(&mut **tx, linked_account.id, &encrypted).await?;

    Ok(refreshed)
}

fn scheme_key(scheme: SecurityScheme) -> &'static str {
    match scheme {
        SecurityScheme::NoAuth => "no_auth",
        SecurityScheme::ApiKey => "api_key",
        SecurityScheme::HttpBasic => "http_basic",
        SecurityScheme::HttpBearer => "http_bearer",
        SecurityScheme::Oauth2 => "oauth2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_key_matches_security_schemes_json_keys() {
        assert_eq!(scheme_key(SecurityScheme::Oauth2), "oauth2");
        assert_eq!(scheme_key(SecurityScheme::ApiKey), "api_key");
    }
}
