//! Pinecone vector index client.
//!
//! The controller endpoint (`https://controller.<environment>.pinecone.io`)
//! lists indexes and describes them; each described index reports the data
//! plane host that answers `POST /query`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use slashgpt_core::error::IndexError;
use slashgpt_core::index::{IndexCatalog, IndexMatch, IndexQuery, VectorIndex};
use tracing::{debug, warn};

/// The Pinecone catalog: index listing and lookup.
pub struct PineconeCatalog {
    controller_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeCatalog {
    pub fn new(
        api_key: impl Into<String>,
        environment: &str,
    ) -> std::result::Result<Self, IndexError> {
        Self::with_controller(api_key, format!("https://controller.{environment}.pinecone.io"))
    }

    /// Use an explicit controller endpoint.
    pub fn with_controller(
        api_key: impl Into<String>,
        controller_url: impl Into<String>,
    ) -> std::result::Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| IndexError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            controller_url: controller_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    async fn get(&self, url: &str) -> std::result::Result<reqwest::Response, IndexError> {
        let response = self
            .client
            .get(url)
            .header("Api-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;
        check_status(response).await
    }
}

async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, IndexError> {
    let status = response.status().as_u16();

    if status == 401 || status == 403 {
        return Err(IndexError::AuthenticationFailed(
            "Invalid Pinecone API key".into(),
        ));
    }

    if !(200..300).contains(&status) {
        let error_body = response.text().await.unwrap_or_default();
        warn!(status, body = %error_body, "Pinecone returned error");
        return Err(IndexError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

#[async_trait]
impl IndexCatalog for PineconeCatalog {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn list_indexes(&self) -> std::result::Result<Vec<String>, IndexError> {
        let url = format!("{}/databases", self.controller_url);
        debug!(url = %url, "Listing Pinecone indexes");
        self.get(&url)
            .await?
            .json::<Vec<String>>()
            .await
            .map_err(|e| IndexError::MalformedResponse(e.to_string()))
    }

    async fn open(&self, name: &str) -> std::result::Result<Arc<dyn VectorIndex>, IndexError> {
        let url = format!("{}/databases/{}", self.controller_url, name);
        let response = match self.get(&url).await {
            Err(IndexError::ApiError { status_code: 404, .. }) => {
                return Err(IndexError::NotFound(name.to_string()));
            }
            other => other?,
        };

        let description: IndexDescription = response
            .json()
            .await
            .map_err(|e| IndexError::MalformedResponse(e.to_string()))?;

        let host = description.status.host.ok_or_else(|| {
            IndexError::MalformedResponse(format!("index {name} has no host yet"))
        })?;

        debug!(index = %name, host = %host, "Opened Pinecone index");

        Ok(Arc::new(PineconeIndex {
            name: name.to_string(),
            query_url: format!("{}/query", host_url(&host)),
            api_key: self.api_key.clone(),
            client: self.client.clone(),
        }))
    }
}

fn host_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

/// One opened Pinecone index.
pub struct PineconeIndex {
    name: String,
    query_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, query: IndexQuery) -> std::result::Result<Vec<IndexMatch>, IndexError> {
        let body = serde_json::json!({
            "vector": query.vector,
            "topK": query.top_k,
            "includeMetadata": query.include_metadata,
            "includeValues": false,
        });

        debug!(index = %self.name, top_k = query.top_k, "Querying Pinecone index");

        let response = self
            .client
            .post(&self.query_url)
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Network(e.to_string()))?;

        let parsed: QueryResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| IndexError::MalformedResponse(e.to_string()))?;

        Ok(parsed.matches)
    }
}

// --- Pinecone API types (internal) ---

#[derive(Debug, Deserialize)]
struct IndexDescription {
    status: IndexStatus,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    host: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_url_from_environment() {
        let catalog = PineconeCatalog::new("pc-test", "us-west1-gcp").unwrap();
        assert_eq!(catalog.controller_url, "https://controller.us-west1-gcp.pinecone.io");
        assert_eq!(catalog.name(), "pinecone");
    }

    #[test]
    fn host_url_adds_scheme() {
        assert_eq!(
            host_url("wiki-abc123.svc.us-west1-gcp.pinecone.io"),
            "https://wiki-abc123.svc.us-west1-gcp.pinecone.io"
        );
        assert_eq!(host_url("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn parse_index_description() {
        let data = r#"{
            "database": {"name": "wikipedia", "dimension": 1536, "metric": "cosine"},
            "status": {"ready": true, "state": "Ready", "host": "wikipedia-abc.svc.us-west1-gcp.pinecone.io"}
        }"#;
        let parsed: IndexDescription = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.status.host.as_deref(),
            Some("wikipedia-abc.svc.us-west1-gcp.pinecone.io")
        );
    }

    #[test]
    fn parse_query_response() {
        let data = r#"{
            "results": [],
            "matches": [
                {"id": "a", "score": 0.92, "values": [], "metadata": {"text": "Curling is a sport."}},
                {"id": "b", "score": 0.81, "values": [], "metadata": {"text": "Stones and brooms."}}
            ],
            "namespace": ""
        }"#;
        let parsed: QueryResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.matches.len(), 2);
        assert_eq!(parsed.matches[0].text(), Some("Curling is a sport."));
        assert!(parsed.matches[0].score > parsed.matches[1].score);
    }

    #[test]
    fn parse_query_response_without_matches() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"namespace": ""}"#).unwrap();
        assert!(parsed.matches.is_empty());
    }
}
