//! Filtered search over incident series backed by Elasticsearch
//!
//! The heart of this module is the [`QueryCompiler`], which turns a typed
//! [`FilterRequest`] into a single boolean Elasticsearch query:
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 FilterRequest                     │
//! └──────────────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌──────────────────────────────────────────────────┐
//! │  Clause builders                                  │
//! │  - location       - involved count                │
//! │  - date range     - extra fields / demographics   │
//! └──────────────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌──────────────────────────────────────────────────┐
//! │  Nested aggregator → one `nested` block on graph  │
//! │  Score policy      → min_score = categories fired │
//! │  Assembler         → scope filter, sort, paging   │
//! └──────────────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌──────────────────────────────────────────────────┐
//! │  CompiledQuery → SearchBackend (Elasticsearch)    │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use incident_series_search::search::{FilterRequest, SearchConfig, SearchService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SearchConfig::default();
//!     let search = SearchService::new(&config)?;
//!
//!     let request = FilterRequest::new("123")
//!         .with_location("Kathmandu")
//!         .with_limit(50);
//!
//!     let results = search.search(&request).await?;
//!     println!("Found {} incidents", results.total_hits);
//!
//!     Ok(())
//! }
//! ```

mod builders;
mod clause;
mod client;
mod compiler;
mod config;
mod error;
mod request;
pub mod schema;
mod service;

pub use builders::{
    date_range_clause, demographic_leaves, event_flag_leaves, extra_field_leaves,
    involved_count_clause, location_clause,
};
pub use clause::{Clause, CompiledQuery, RangeBounds, SortSpec};
pub use client::{ElasticsearchClient, SearchBackend, SearchHit, SearchResponse};
pub use compiler::{
    nested_block, CompilerSettings, InvolvedCountMode, QueryCompiler, ScoreCategory, ScorePolicy,
};
pub use config::{SearchConfig, SearchConfigBuilder};
pub use error::{SearchError, SearchResult};
pub use request::{ExtraFields, FieldValue, FilterRequest, NestedFieldAllowList, SortOrder};
pub use service::{involved_count, SearchService};
