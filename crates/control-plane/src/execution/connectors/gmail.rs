//! Gmail connector. Builds a MIME message and sends it through the plain
//! Gmail REST API rather than the Python Google API client, which has no
//! Rust equivalent in the corpus. Grounded on `gmail.py`.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::crypto::Keyring;
use shared::DbPool;

use crate::execution::connector_executor::ConnectorHandler;
use crate::execution::FunctionExecutionResult;
use crate::models::credentials::SecurityCredentialsDoc;
use crate::models::entities::LinkedAccount;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

pub struct SendEmail;

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    id: Option<String>,
}

#[async_trait]
impl ConnectorHandler for SendEmail {
    async fn call(
        &self,
        http_client: &reqwest::Client,
        _pool: &DbPool,
        _keyring: &dyn Keyring,
        _linked_account: &LinkedAccount,
        credentials: &SecurityCredentialsDoc,
        input: Value,
    ) -> FunctionExecutionResult {
        let access_token = match credentials {
            SecurityCredentialsDoc::Oauth2(creds) => creds.access_token.clone(),
            _ => return FunctionExecutionResult::failure("gmail requires oauth2 credentials"),
        };

        let sender = match input.get("sender").and_then(Value::as_str) {
            Some(s) => s,
            None => return FunctionExecutionResult::failure("missing required field: sender"),
        };
        let recipient = match input.get("recipient").and_then(Value::as_str) {
            Some(r) => r,
            None => return FunctionExecutionResult::failure("missing required field: recipient"),
        };
        let body = match input.get("body").and_then(Value::as_str) {
            Some(b) => b,
            None => return FunctionExecutionResult::failure("missing required field: body"),
        };
        let subject = input.get("subject").and_then(Value::as_str);
        let cc = string_list(&input, "cc");
        let bcc = string_list(&input, "bcc");

        let raw = URL_SAFE_NO_PAD.encode(build_mime_message(recipient, subject, &cc, &bcc, body));

        let url = format!("{GMAIL_API_BASE}/gmail/v1/users/{sender}/messages/send");
        let response = http_client
            .post(url)
            .bearer_auth(access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return FunctionExecutionResult::failure(format!("gmail request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return FunctionExecutionResult::failure(format!("gmail returned HTTP {status}: {body}"));
        }

        match response.json::<SendMessageResponse>().await {
            Ok(parsed) => {
                FunctionExecutionResult::ok(json!({ "message_id": parsed.id.unwrap_or_else(|| "unknown".into()) }))
            }
            Err(e) => FunctionExecutionResult::failure(format!("malformed gmail response: {e}")),
        }
    }
}

fn string_list(input: &Value, key: &str) -> Vec<String> {
    input
        .get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Minimal RFC 5322 message, matching the headers `email.mime.text.MIMEText`
/// sets before base64url-encoding.
fn build_mime_message(recipient: &str, subject: Option<&str>, cc: &[String], bcc: &[String], body: &str) -> Vec<u8> {
    let mut message = format!("To: {recipient}\r\n");
    if let Some(subject) = subject {
        message.push_str(&format!("Subject: {subject}\r\n"));
    }
    if !cc.is_empty() {
        message.push_str(&format!("Cc: {}\r\n", cc.join(", ")));
    }
    if !bcc.is_empty() {
        message.push_str(&format!("Bcc: {}\r\n", bcc.join(", ")));
    }
    message.push_str("Content-Type: text/plain; charset=\"us-ascii\"\r\n");
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Transfer-Encoding: 7bit\r\n");
    message.push_str("\r\n");
    message.push_str(body);
    message.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_message_includes_recipient_and_body() {
        let message = String::from_utf8(build_mime_message("a@example.com", Some("hi"), &[], &[], "hello")).unwrap();
        assert!(message.contains("To: a@example.com"));
        assert!(message.contains("Subject: hi"));
        assert!(message.ends_with("hello"));
    }

    #[test]
    fn mime_message_omits_subject_when_absent() {
        let message = String::from_utf8(build_mime_message("a@example.com", None, &[], &[], "hello")).unwrap();
        assert!(!message.contains("Subject:"));
    }

    #[test]
    fn cc_and_bcc_join_multiple_recipients() {
        let message = String::from_utf8(build_mime_message(
            "a@example.com",
            None,
            &["b@example.com".into(), "c@example.com".into()],
            &["d@example.com".into()],
            "hello",
        ))
        .unwrap();
        assert!(message.contains("Cc: b@example.com, c@example.com"));
        assert!(message.contains("Bcc: d@example.com"));
    }
}
