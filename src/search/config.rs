//! Search configuration

use crate::search::compiler::{CompilerSettings, InvolvedCountMode};
use crate::search::error::{SearchError, SearchResult};
use crate::search::request::NestedFieldAllowList;
use crate::search::schema;
use serde::{Deserialize, Serialize};

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Elasticsearch base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Index holding the incident records
    #[serde(default = "default_index")]
    pub index: String,

    /// Basic auth username
    pub username: Option<String>,

    /// Environment variable holding the basic auth password
    pub password_env: Option<String>,

    /// Scope URI prefix for the series filter
    #[serde(default = "default_series_scope_prefix")]
    pub series_scope_prefix: String,

    /// Maximum page size returned per request, at most 1000
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How the minimum involved-count filter is enforced
    #[serde(default)]
    pub involved_count_mode: InvolvedCountMode,

    /// Nested fields callers may constrain through extra fields
    #[serde(default = "schema::default_nested_field_allow_list")]
    pub nested_field_allow_list: Vec<String>,
}

impl SearchConfig {
    pub fn compiler_settings(&self) -> CompilerSettings {
        CompilerSettings {
            series_scope_prefix: self.series_scope_prefix.clone(),
            max_page_size: self.max_page_size,
            involved_count_mode: self.involved_count_mode,
        }
    }

    /// Reject settings the compiler cannot honour
    pub fn validate(&self) -> SearchResult<()> {
        if self.max_page_size == 0 || self.max_page_size > schema::MAX_PAGE_SIZE {
            return Err(SearchError::InvalidConfiguration(format!(
                "search.max_page_size must be between 1 and {}, got {}",
                schema::MAX_PAGE_SIZE,
                self.max_page_size
            )));
        }
        Ok(())
    }

    pub fn allow_list(&self) -> NestedFieldAllowList {
        NestedFieldAllowList::new(self.nested_field_allow_list.iter().cloned())
    }

    /// Resolve the password from its environment variable, if configured
    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            index: default_index(),
            username: None,
            password_env: None,
            series_scope_prefix: default_series_scope_prefix(),
            max_page_size: default_max_page_size(),
            request_timeout_secs: default_request_timeout(),
            involved_count_mode: InvolvedCountMode::default(),
            nested_field_allow_list: schema::default_nested_field_allow_list(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "incidents".to_string()
}

fn default_series_scope_prefix() -> String {
    schema::DEFAULT_SERIES_SCOPE_PREFIX.to_string()
}

fn default_max_page_size() -> usize {
    schema::MAX_PAGE_SIZE
}

fn default_request_timeout() -> u64 {
    30
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.config.index = index.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    pub fn password_env(mut self, name: impl Into<String>) -> Self {
        self.config.password_env = Some(name.into());
        self
    }

    pub fn series_scope_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.series_scope_prefix = prefix.into();
        self
    }

    pub fn max_page_size(mut self, max: usize) -> Self {
        self.config.max_page_size = max;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn involved_count_mode(mut self, mode: InvolvedCountMode) -> Self {
        self.config.involved_count_mode = mode;
        self
    }

    pub fn nested_field_allow_list(mut self, fields: Vec<String>) -> Self {
        self.config.nested_field_allow_list = fields;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
