//! Search service: compile, execute, shape the response

use crate::metrics::{SEARCH_DURATION_SECONDS, SEARCH_MIN_SCORE, SEARCH_REQUESTS_TOTAL};
use crate::search::clause::CompiledQuery;
use crate::search::client::{ElasticsearchClient, SearchBackend, SearchHit, SearchResponse};
use crate::search::compiler::QueryCompiler;
use crate::search::config::SearchConfig;
use crate::search::error::SearchResult;
use crate::search::request::{FilterRequest, NestedFieldAllowList};
use crate::search::schema;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Main search service
#[derive(Clone)]
pub struct SearchService {
    compiler: QueryCompiler,
    backend: Arc<dyn SearchBackend>,
    allow_list: NestedFieldAllowList,
}

impl SearchService {
    /// Create a service talking to the configured Elasticsearch node
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        config.validate()?;
        let backend = Arc::new(ElasticsearchClient::new(config)?);
        Ok(Self::with_backend(config, backend))
    }

    /// Create a service over an arbitrary backend
    pub fn with_backend(config: &SearchConfig, backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            compiler: QueryCompiler::new(config.compiler_settings()),
            backend,
            allow_list: config.allow_list(),
        }
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn allow_list(&self) -> &NestedFieldAllowList {
        &self.allow_list
    }

    pub fn compile(&self, request: &FilterRequest) -> CompiledQuery {
        self.compiler.compile(request)
    }

    /// Search one series
    pub async fn search(&self, request: &FilterRequest) -> SearchResult<SearchResponse> {
        let start_time = Instant::now();
        let query = self.compile(request);
        SEARCH_MIN_SCORE.observe(query.min_score);

        let result = self.backend.search(&query).await;
        SEARCH_DURATION_SECONDS.observe(start_time.elapsed().as_secs_f64());

        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                SEARCH_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                warn!(series_id = %request.series_id, error = %e, "Series search failed");
                return Err(e);
            }
        };

        if let Some(threshold) = query.involved_post_filter {
            let before = response.hits.len();
            response
                .hits
                .retain(|hit| involved_count(hit) >= threshold as usize);
            info!(
                series_id = %request.series_id,
                threshold,
                dropped = before - response.hits.len(),
                "Applied involved-count post filter"
            );
        }

        SEARCH_REQUESTS_TOTAL.with_label_values(&["success"]).inc();
        info!(
            series_id = %request.series_id,
            hits = response.hits.len(),
            total_hits = response.total_hits,
            min_score = query.min_score,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Series search completed"
        );

        Ok(response)
    }

    pub async fn ping(&self) -> bool {
        self.backend.ping().await
    }
}

/// Number of graph entries in the hit's source that carry an age
pub fn involved_count(hit: &SearchHit) -> usize {
    match hit.source.get(schema::GRAPH_PATH) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter(|entry| has_age(entry))
            .count(),
        Some(entry @ Value::Object(_)) => usize::from(has_age(entry)),
        _ => 0,
    }
}

fn has_age(entry: &Value) -> bool {
    entry
        .get(schema::SOURCE_AGE_KEY)
        .is_some_and(|age| !age.is_null())
}
