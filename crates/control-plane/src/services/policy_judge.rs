//! Policy judge (§4.9): an LLM call that checks a Function invocation
//! against an Agent's custom instruction for that Function. Fails open —
//! an inference error never blocks execution, it only means the custom
//! instruction couldn't be enforced for this call.

use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You are assigned the role of a judge to determine whether a function \
request should be executed. Each function in our system is defined by a name, a description, and \
a custom instruction. When a user submits a request along with specific input arguments, your task \
is to evaluate the request against the custom instruction of the chosen function. Always follow the \
custom instruction, do not make any assumptions. If the custom instruction does not apply, let the \
request pass. Based on this evaluation, decide if the request violates the custom instruction, and \
provide a clear and concise justification for your decision.";

#[derive(Debug, Clone, Serialize)]
pub struct PolicyCheckRequest<'a> {
    pub custom_instruction: &'a str,
    pub function_name: &'a str,
    pub function_description: &'a str,
    pub function_input: &'a serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyVerdict {
    pub is_violated: bool,
    pub justification: String,
}

#[derive(Clone)]
pub struct PolicyJudge {
    http_client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl PolicyJudge {
    pub fn new(http_client: reqwest::Client, api_base: String, api_key: String, model: String) -> Self {
        Self { http_client, api_base, api_key, model }
    }

    /// Returns `None` (fail open) on any inference/transport/parse error,
    /// logging a warning rather than propagating — unchanged per §4.9.
    pub async fn check(&self, request: PolicyCheckRequest<'_>) -> Option<PolicyVerdict> {
        match self.check_inner(request).await {
            Ok(verdict) => Some(verdict),
            Err(err) => {
                tracing::warn!(error = %err, "policy judge inference failed, failing open");
                None
            }
        }
    }

    async fn check_inner(&self, request: PolicyCheckRequest<'_>) -> Result<PolicyVerdict, PolicyJudgeError> {
        let user_content = serde_json::json!({
            "function_name": request.function_name,
            "function_description": request.function_description,
            "function_input": request.function_input,
            "custom_instruction": request.custom_instruction,
        })
        .to_string();

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_content},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "policy_verdict",
                    "schema": {
                        "type": "object",
                        "properties": {
                            "is_violated": {"type": "boolean"},
                            "justification": {"type": "string"},
                        },
                        "required": ["is_violated", "justification"],
                        "additionalProperties": false,
                    }
                }
            }
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PolicyJudgeError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PolicyJudgeError(format!("HTTP {}", response.status())));
        }

        let raw: serde_json::Value =
            response.json().await.map_err(|e| PolicyJudgeError(e.to_string()))?;

        let content = raw["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PolicyJudgeError("missing message content".to_string()))?;

        serde_json::from_str(content).map_err(|e| PolicyJudgeError(e.to_string()))
    }
}

#[derive(Debug)]
struct PolicyJudgeError(String);

impl std::fmt::Display for PolicyJudgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PolicyJudgeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_verdict_deserializes_from_model_json() {
        let raw = r#"{"is_violated": true, "justification": "sends to an external domain"}"#;
        let verdict: PolicyVerdict = serde_json::from_str(raw).unwrap();
        assert!(verdict.is_violated);
    }
}
