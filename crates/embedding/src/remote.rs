use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP embedding client for capability tier `advanced` (spec.md §4.7),
/// built the same way the teacher's `OpenRouterClient` builds its requests:
/// a shared `reqwest::Client`, a bearer-authed POST, and status-checked
/// JSON decoding.
#[derive(Debug, Clone)]
pub struct RemoteEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl RemoteEmbeddingProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingResult, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::EmptyContent);
        }

        let payload = EmbedRequest {
            model: &self.model,
            input: trimmed,
        };

        let mut builder = self.client.post(&self.endpoint).json(&payload);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, endpoint = %self.endpoint, "remote embedding request failed");
            return Err(EmbeddingError::ProviderFailure(format!(
                "remote embedding request failed with status {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        let dimension = parsed.embedding.len();
        Ok(EmbeddingResult {
            vector: parsed.embedding,
            model: self.model.clone(),
            dimension,
        })
    }
}
