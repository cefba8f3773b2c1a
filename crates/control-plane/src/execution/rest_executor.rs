//! REST function executor (§4.8). Extracts path/query/header/cookie/body
//! parameters from the Function input by location, injects credentials
//! per scheme, and sends the request with the corpus-standard 10s connect /
//! 30s read timeout split.

use serde::Deserialize;
use serde_json::Value;

use crate::execution::FunctionExecutionResult;
use crate::models::credentials::{SecurityCredentialsDoc, SecuritySchemeDoc};
use crate::models::entities::Function;
use crate::models::enums::HttpLocation;

#[derive(Debug, Deserialize)]
struct RestMetadata {
    server_url: String,
    path: String,
    method: crate::models::enums::HttpMethod,
}

pub async fn execute(
    http_client: &reqwest::Client,
    function: &Function,
    scheme_doc: &SecuritySchemeDoc,
    credentials: &SecurityCredentialsDoc,
    function_input: Value,
) -> FunctionExecutionResult {
    let metadata: RestMetadata = match serde_json::from_value(function.protocol_data.clone()) {
        Ok(m) => m,
        Err(e) => return FunctionExecutionResult::failure(format!("malformed protocol_data: {e}")),
    };

    let mut path = object_field(&function_input, "path");
    let mut query = object_field(&function_input, "query");
    let mut headers = object_field(&function_input, "header");
    let mut cookies = object_field(&function_input, "cookie");
    let mut body = object_field(&function_input, "body");

    let mut url = format!("{}{}", metadata.server_url, metadata.path);
    for (name, value) in path.iter() {
        url = url.replace(&format!("{{{name}}}"), &value_to_string(value));
    }
    path.clear();

    if let Err(e) = inject_credentials(scheme_doc, credentials, &mut headers, &mut query, &mut body, &mut cookies) {
        return FunctionExecutionResult::failure(e);
    }

    let mut request = http_client.request(metadata.method.as_reqwest(), &url);
    if !query.is_empty() {
        request = request.query(&query);
    }
    for (name, value) in &headers {
        request = request.header(name, value_to_string(value));
    }
    if !cookies.is_empty() {
        let cookie_header = cookies.iter().map(|(k, v)| format!("{k}={}", value_to_string(v))).collect::<Vec<_>>().join("; ");
        request = request.header(reqwest::header::COOKIE, cookie_header);
    }
    if !body.is_empty() {
        request = request.json(&Value::Object(body));
    }

    tracing::info!(function_name = %function.name, method = %metadata.method.as_reqwest(), url = %url, "executing function via raw http request");

    send(request).await
}

async fn send(request: reqwest::RequestBuilder) -> FunctionExecutionResult {
    // Connect/read timeouts are set once on the shared client in main.rs.
    let response = request.send().await;

    let response = match response {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "failed to send function execution http request");
            return FunctionExecutionResult::failure(e.to_string());
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "http error occurred for function execution");
        return FunctionExecutionResult::failure(format!("HTTP {status}: {body}"));
    }

    let bytes = match response.bytes().await {
        Ok(b) => b,
        Err(e) => return FunctionExecutionResult::failure(e.to_string()),
    };

    if bytes.is_empty() {
        return FunctionExecutionResult::ok(Value::Object(Default::default()));
    }

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(data) => FunctionExecutionResult::ok(data),
        Err(_) => FunctionExecutionResult::ok(Value::String(String::from_utf8_lossy(&bytes).to_string())),
    }
}

fn object_field(input: &Value, key: &str) -> serde_json::Map<String, Value> {
    input.get(key).and_then(Value::as_object).cloned().unwrap_or_default()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Injects the resolved credentials into the outbound request per scheme.
/// OAuth2 always goes into the `Authorization: Bearer` header; api_key goes
/// into whichever bucket the App's scheme names (header/query/body/cookie);
/// no_auth/http_basic inject nothing (http_basic has no execution support,
/// see §3).
fn inject_credentials(
    scheme_doc: &SecuritySchemeDoc,
    credentials: &SecurityCredentialsDoc,
    headers: &mut serde_json::Map<String, Value>,
    query: &mut serde_json::Map<String, Value>,
    body: &mut serde_json::Map<String, Value>,
    cookies: &mut serde_json::Map<String, Value>,
) -> Result<(), String> {
    match (scheme_doc, credentials) {
        (SecuritySchemeDoc::Oauth2(_), SecurityCredentialsDoc::Oauth2(creds)) => {
            headers.insert(
                "Authorization".to_string(),
                Value::String(format!("Bearer {}", creds.access_token)),
            );
        }
        (SecuritySchemeDoc::ApiKey(config), SecurityCredentialsDoc::ApiKey(creds)) => {
            let value = match &config.prefix {
                Some(prefix) => format!("{prefix}{}", creds.secret_key),
                None => creds.secret_key.clone(),
            };
            match config.location {
                HttpLocation::Header => {
                    headers.insert(config.name.clone(), Value::String(value));
                }
                HttpLocation::Query => {
                    query.insert(config.name.clone(), Value::String(value));
                }
                HttpLocation::Body => {
                    body.insert(config.name.clone(), Value::String(value));
                }
                HttpLocation::Cookie => {
                    cookies.insert(config.name.clone(), Value::String(value));
                }
                HttpLocation::Path => {
                    tracing::error!(location = ?config.location, "unsupported api key location");
                    return Err(format!("unsupported api key location={:?}", config.location));
                }
            }
        }
        (SecuritySchemeDoc::HttpBearer, SecurityCredentialsDoc::ApiKey(creds)) => {
            headers.insert("Authorization".to_string(), Value::String(format!("Bearer {}", creds.secret_key)));
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credentials::{ApiKeyCredentials, ApiKeySchemeConfig};

    fn empty_buckets() -> (serde_json::Map<String, Value>, serde_json::Map<String, Value>, serde_json::Map<String, Value>, serde_json::Map<String, Value>) {
        (serde_json::Map::new(), serde_json::Map::new(), serde_json::Map::new(), serde_json::Map::new())
    }

    #[test]
    fn api_key_header_injection_applies_prefix() {
        let scheme = SecuritySchemeDoc::ApiKey(ApiKeySchemeConfig {
            name: "X-Api-Key".into(),
            location: HttpLocation::Header,
            prefix: Some("Token ".into()),
        });
        let creds = SecurityCredentialsDoc::ApiKey(ApiKeyCredentials { secret_key: "abc123".into() });
        let (mut headers, mut query, mut body, mut cookies) = empty_buckets();
        inject_credentials(&scheme, &creds, &mut headers, &mut query, &mut body, &mut cookies).unwrap();
        assert_eq!(headers.get("X-Api-Key").unwrap(), "Token abc123");
    }

    #[test]
    fn api_key_query_injection_goes_into_query_bucket() {
        let scheme = SecuritySchemeDoc::ApiKey(ApiKeySchemeConfig {
            name: "api_key".into(),
            location: HttpLocation::Query,
            prefix: None,
        });
        let creds = SecurityCredentialsDoc::ApiKey(ApiKeyCredentials { secret_key: "abc123".into() });
        let (mut headers, mut query, mut body, mut cookies) = empty_buckets();
        inject_credentials(&scheme, &creds, &mut headers, &mut query, &mut body, &mut cookies).unwrap();
        assert_eq!(query.get("api_key").unwrap(), "abc123");
        assert!(headers.is_empty());
    }

    #[test]
    fn api_key_body_injection_goes_into_body_bucket() {
        let scheme = SecuritySchemeDoc::ApiKey(ApiKeySchemeConfig {
            name: "api_key".into(),
            location: HttpLocation::Body,
            prefix: None,
        });
        let creds = SecurityCredentialsDoc::ApiKey(ApiKeyCredentials { secret_key: "abc123".into() });
        let (mut headers, mut query, mut body, mut cookies) = empty_buckets();
        inject_credentials(&scheme, &creds, &mut headers, &mut query, &mut body, &mut cookies).unwrap();
        assert_eq!(body.get("api_key").unwrap(), "abc123");
        assert!(headers.is_empty());
    }

    #[test]
    fn api_key_path_location_is_unsupported() {
        let scheme = SecuritySchemeDoc::ApiKey(ApiKeySchemeConfig {
            name: "api_key".into(),
            location: HttpLocation::Path,
            prefix: None,
        });
        let creds = SecurityCredentialsDoc::ApiKey(ApiKeyCredentials { secret_key: "abc123".into() });
        let (mut headers, mut query, mut body, mut cookies) = empty_buckets();
        assert!(inject_credentials(&scheme, &creds, &mut headers, &mut query, &mut body, &mut cookies).is_err());
    }

    #[test]
    fn oauth2_injects_bearer_authorization_header() {
        let scheme = SecuritySchemeDoc::Oauth2(crate::models::credentials::OAuth2SchemeConfig {
            client_id: "c".into(),
            client_secret: "s".into(),
            scope: "read".into(),
            authorize_url: "https://x/authorize".into(),
            token_url: "https://x/token".into(),
        });
        let creds = SecurityCredentialsDoc::Oauth2(crate::models::credentials::OAuth2Credentials {
            client_id: "c".into(),
            client_secret: "s".into(),
            scope: "read".into(),
            access_token: "tok".into(),
            token_type: None,
            expires_at: None,
            refresh_token: None,
            raw_token_response: None,
        });
        let (mut headers, mut query, mut body, mut cookies) = empty_buckets();
        inject_credentials(&scheme, &creds, &mut headers, &mut query, &mut body, &mut cookies).unwrap();
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer tok");
    }
}
