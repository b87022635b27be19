//! Elasticsearch HTTP client

use crate::search::clause::CompiledQuery;
use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// A matched incident record as returned by the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(rename = "_index", default)]
    pub index: String,

    #[serde(rename = "_id")]
    pub id: String,

    /// Relevance score; absent when the engine skips scoring
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    #[serde(rename = "_source", default)]
    pub source: Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
}

/// Ordered hits plus the engine's total count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,

    /// Total number of hits before pagination
    pub total_hits: u64,

    /// Engine-side execution time in milliseconds
    pub took_ms: u64,
}

/// Black-box document search engine
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a compiled query
    async fn search(&self, query: &CompiledQuery) -> SearchResult<SearchResponse>;

    /// Whether the engine is reachable
    async fn ping(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    took: u64,
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    #[serde(default)]
    total: Option<RawTotal>,
    #[serde(default)]
    hits: Vec<SearchHit>,
}

/// `hits.total` is a bare number before 7.x and an object after
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

impl RawTotal {
    fn value(&self) -> u64 {
        match self {
            RawTotal::Count(n) => *n,
            RawTotal::Object { value } => *value,
        }
    }
}

/// reqwest-backed client for a single Elasticsearch node
#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Client,
    endpoint: String,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchClient {
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(SearchError::InvalidConfiguration(
                "search.endpoint must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            username: config.username.clone(),
            password: config.password(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.endpoint, self.index)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.username {
            Some(ref username) => request.basic_auth(username, self.password.as_ref()),
            None => request,
        }
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn search(&self, query: &CompiledQuery) -> SearchResult<SearchResponse> {
        let url = self.search_url();
        let body = query.to_body();

        debug!(url = %url, body = %body, "Sending search request");

        let response = self
            .authorize(self.client.post(&url).json(&body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                url = %url,
                status = status.as_u16(),
                "Search engine rejected request"
            );
            return Err(SearchError::EngineError {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawSearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let total_hits = raw
            .hits
            .total
            .as_ref()
            .map(RawTotal::value)
            .unwrap_or(raw.hits.hits.len() as u64);

        Ok(SearchResponse {
            hits: raw.hits.hits,
            total_hits,
            took_ms: raw.took,
        })
    }

    async fn ping(&self) -> bool {
        let request = self.authorize(self.client.head(format!("{}/", self.endpoint)));
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Search engine ping failed");
                false
            }
        }
    }
}
