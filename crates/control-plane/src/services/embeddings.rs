//! Embeddings adapter (§4.10): turns free-text intent into the fixed
//! dimension float vector the discovery layer ranks Apps/Functions by.

use serde::Deserialize;

#[derive(Clone)]
pub struct EmbeddingsClient {
    http_client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Debug)]
pub struct EmbeddingsError(String);

impl std::fmt::Display for EmbeddingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EmbeddingsError {}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsDatum {
    embedding: Vec<f32>,
}

impl EmbeddingsClient {
    pub fn new(http_client: reqwest::Client, api_base: String, api_key: String, model: String) -> Self {
        Self { http_client, api_base, api_key, model }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingsError> {
        let response = self
            .http_client
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({"model": self.model, "input": text}))
            .send()
            .await
            .map_err(|e| EmbeddingsError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingsError(format!("HTTP {}", response.status())));
        }

        let mut parsed: EmbeddingsResponse =
            response.json().await.map_err(|e| EmbeddingsError(e.to_string()))?;

        parsed
            .data
            .pop()
            .map(|datum| datum.embedding)
            .ok_or_else(|| EmbeddingsError("empty embeddings response".to_string()))
    }
}
