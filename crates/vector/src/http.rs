use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use agentmem_model::{MemoryRecord, VectorQuery, VectorResult};

use crate::{VectorError, VectorStore};

/// Generic ANN HTTP client: `POST /collections/{name}/points` to upsert,
/// `POST /collections/{name}/search` to query. Qdrant's wire shape is the
/// concrete reference (spec.md §4.3, §9), but this client speaks plain
/// HTTP/JSON and carries no SDK dependency, so it works unmodified against
/// any index exposing the same two endpoints.
#[derive(Debug, Clone)]
pub struct HttpVectorStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest {
    points: Vec<UpsertPoint>,
}

#[derive(Debug, Serialize)]
struct UpsertPoint {
    id: String,
    vector: Vec<f32>,
    payload: MemoryRecord,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    score_threshold: f32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f32,
    payload: MemoryRecord,
}

#[derive(Debug, Serialize)]
struct DeleteRequest {
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: usize,
}

impl HttpVectorStore {
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>, api_key: Option<String>) -> Result<Self, VectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(VectorError::Http)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            collection: collection.into(),
            api_key,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url.trim_end_matches('/'), self.collection, suffix)
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn initialize(&self) -> Result<(), VectorError> {
        let url = self.collection_url("");
        let response = self
            .request(self.client.put(&url))
            .json(&json!({ "vectors": { "distance": "Cosine" } }))
            .send()
            .await?;
        if response.status().is_success() || response.status().as_u16() == 409 {
            Ok(())
        } else {
            Err(VectorError::Backend(format!(
                "initialize failed with status {}",
                response.status()
            )))
        }
    }

    async fn upsert(&self, record: &MemoryRecord, embedding: &[f32]) -> Result<(), VectorError> {
        let url = self.collection_url("/points");
        let body = UpsertRequest {
            points: vec![UpsertPoint {
                id: record.id.clone(),
                vector: embedding.to_vec(),
                payload: record.clone(),
            }],
        };
        let response = self.request(self.client.post(&url)).json(&body).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            tracing::warn!(id = %record.id, %status, "vector store upsert rejected by backend");
            Err(VectorError::Backend(format!("upsert failed with status {status}")))
        }
    }

    async fn search(
        &self,
        embedding: &[f32],
        query: &VectorQuery,
    ) -> Result<Vec<VectorResult>, VectorError> {
        let url = self.collection_url("/search");
        let body = SearchRequest {
            vector: embedding,
            limit: if query.limit == 0 { 10 } else { query.limit },
            score_threshold: query.threshold,
        };
        let response = self.request(self.client.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(VectorError::Backend(format!(
                "search failed with status {}",
                response.status()
            )));
        }
        let parsed: SearchResponse = response.json().await?;
        let results = parsed
            .result
            .into_iter()
            .filter(|hit| query.matches_filters(&hit.payload))
            .map(|hit| VectorResult {
                record: hit.payload,
                score: hit.score,
            })
            .collect();
        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, VectorError> {
        let url = self.collection_url("/points/delete");
        let body = DeleteRequest { ids: ids.to_vec() };
        let response = self.request(self.client.post(&url)).json(&body).send().await?;
        if response.status().is_success() {
            Ok(ids.len())
        } else {
            Err(VectorError::Backend(format!(
                "delete failed with status {}",
                response.status()
            )))
        }
    }

    async fn count(&self, tenant_id: Option<&str>) -> Result<usize, VectorError> {
        let url = self.collection_url("/count");
        let body = json!({ "filter": tenant_id.map(|t| json!({ "tenant_id": t })) });
        let response = self.request(self.client.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(VectorError::Backend(format!(
                "count failed with status {}",
                response.status()
            )));
        }
        let parsed: CountResponse = response.json().await?;
        Ok(parsed.count)
    }

    async fn health(&self) -> Result<bool, VectorError> {
        let url = format!("{}/healthz", self.base_url.trim_end_matches('/'));
        match self.request(self.client.get(&url)).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn close(&self) -> Result<(), VectorError> {
        Ok(())
    }
}
