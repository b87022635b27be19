//! Filter request → Elasticsearch query compilation
//!
//! Compilation is a single pure pass:
//!
//! 1. the clause builders each contribute zero or one fragment,
//! 2. every nested leaf is folded into one `nested` block on `graph`,
//! 3. the score policy raises `min_score` by one per category that fired,
//! 4. the assembler adds the series scope filter, sort and pagination.
//!
//! ```
//! use incident_series_search::search::{CompilerSettings, FilterRequest, QueryCompiler};
//!
//! let compiler = QueryCompiler::new(CompilerSettings::default());
//! let request = FilterRequest::new("123")
//!     .with_location("Kathmandu")
//!     .with_date_range(Some("2017-01-01".into()), None)
//!     .with_limit(50);
//!
//! let query = compiler.compile(&request);
//! assert_eq!(query.min_score, 2.0);
//! assert_eq!(query.size, 50);
//! ```

use crate::search::builders;
use crate::search::clause::{Clause, CompiledQuery, SortSpec};
use crate::search::request::{FieldValue, FilterRequest, SortOrder};
use crate::search::schema;
use serde::{Deserialize, Serialize};

/// How the involved-count threshold is enforced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvolvedCountMode {
    /// Inline `script_score` step function (requires engine scripting)
    #[default]
    Script,

    /// No script clause; hits are filtered after the engine responds
    PostFilter,
}

/// Optional filter groups that each add one unit to `min_score`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreCategory {
    Location,
    InvolvedCount,
    DateRange,
    NestedAttributes,
}

/// Minimum relevance threshold derived from the categories that fired
pub struct ScorePolicy;

impl ScorePolicy {
    /// One point per distinct category, regardless of leaf count
    pub fn min_score(fired: &[ScoreCategory]) -> f64 {
        let mut distinct: Vec<ScoreCategory> = Vec::with_capacity(fired.len());
        for category in fired {
            if !distinct.contains(category) {
                distinct.push(*category);
            }
        }
        distinct.len() as f64
    }
}

/// Fixed inputs of the compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    /// Scope URI prefix; the filter term is `<prefix>/<series_id>`
    pub series_scope_prefix: String,

    /// Upper bound on the page size; never above [`schema::MAX_PAGE_SIZE`]
    pub max_page_size: usize,

    pub involved_count_mode: InvolvedCountMode,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            series_scope_prefix: schema::DEFAULT_SERIES_SCOPE_PREFIX.to_string(),
            max_page_size: schema::MAX_PAGE_SIZE,
            involved_count_mode: InvolvedCountMode::default(),
        }
    }
}

/// Stateless query compiler; safe to share across tasks
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    settings: CompilerSettings,
}

impl QueryCompiler {
    pub fn new(settings: CompilerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Compile a request; total over every input
    pub fn compile(&self, request: &FilterRequest) -> CompiledQuery {
        let mut must = Vec::new();
        let mut fired = Vec::new();
        let mut involved_post_filter = None;

        if let Some(clause) = builders::location_clause(request) {
            must.push(clause);
            fired.push(ScoreCategory::Location);
        }

        match self.settings.involved_count_mode {
            InvolvedCountMode::Script => {
                if let Some(clause) = builders::involved_count_clause(request) {
                    must.push(clause);
                    fired.push(ScoreCategory::InvolvedCount);
                }
            }
            InvolvedCountMode::PostFilter => {
                involved_post_filter = request.min_involved;
            }
        }

        if let Some(clause) = builders::date_range_clause(request) {
            must.push(clause);
            fired.push(ScoreCategory::DateRange);
        }

        if let Some(clause) = nested_block(request) {
            must.push(clause);
            fired.push(ScoreCategory::NestedAttributes);
        }

        let compiled = CompiledQuery {
            must,
            filter: self.scope_filter(&request.series_id),
            sort: SortSpec {
                field: schema::PUBLISHED_AT.to_string(),
                order: SortOrder::from_descending(request.descending),
            },
            from: request.start,
            size: self.effective_size(request.limit),
            min_score: ScorePolicy::min_score(&fired),
            involved_post_filter,
        };

        tracing::debug!(
            series_id = %request.series_id,
            clauses = compiled.must.len(),
            min_score = compiled.min_score,
            size = compiled.size,
            "Compiled series query"
        );

        compiled
    }

    pub fn effective_size(&self, limit: usize) -> usize {
        limit.min(self.settings.max_page_size.min(schema::MAX_PAGE_SIZE))
    }

    /// Term on the scope URI; the series id is passed through unvalidated
    pub fn scope_filter(&self, series_id: &str) -> Clause {
        Clause::Term {
            field: schema::SERIES_SCOPE_FIELD.to_string(),
            value: FieldValue::Text(format!(
                "{}/{}",
                self.settings.series_scope_prefix.trim_end_matches('/'),
                series_id
            )),
        }
    }
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(CompilerSettings::default())
    }
}

/// Fold every nested leaf into a single block, or nothing when there are none
pub fn nested_block(request: &FilterRequest) -> Option<Clause> {
    let mut leaves = builders::extra_field_leaves(request);
    leaves.extend(builders::demographic_leaves(request));
    leaves.extend(builders::event_flag_leaves(request));

    if leaves.is_empty() {
        return None;
    }

    Some(Clause::Nested {
        path: schema::GRAPH_PATH.to_string(),
        must: leaves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_policy_counts_distinct() {
        assert_eq!(ScorePolicy::min_score(&[]), 0.0);
        assert_eq!(
            ScorePolicy::min_score(&[
                ScoreCategory::Location,
                ScoreCategory::NestedAttributes,
                ScoreCategory::NestedAttributes,
            ]),
            2.0
        );
    }

    #[test]
    fn test_empty_request() {
        let query = QueryCompiler::default().compile(&FilterRequest::new("42"));

        assert!(query.must.is_empty());
        assert_eq!(query.min_score, 0.0);
        assert_eq!(query.size, 100);
        assert_eq!(
            query.filter.to_json(),
            json!({ "term": { "lineage.series": "http://series/42" } })
        );
    }

    #[test]
    fn test_scope_prefix_trailing_slash() {
        let compiler = QueryCompiler::new(CompilerSettings {
            series_scope_prefix: "https://data.example.org/series/".to_string(),
            ..Default::default()
        });

        assert_eq!(
            compiler.scope_filter("7").to_json(),
            json!({ "term": { "lineage.series": "https://data.example.org/series/7" } })
        );
    }

    #[test]
    fn test_fixed_clause_order() {
        let request = FilterRequest::new("1")
            .with_gender("M")
            .with_date_range(Some("2017-01-01".to_string()), None)
            .with_min_involved(2)
            .with_location("Pokhara");

        let query = QueryCompiler::default().compile(&request);

        assert_eq!(query.must.len(), 4);
        assert!(matches!(query.must[0], Clause::MultiMatch { .. }));
        assert!(matches!(query.must[1], Clause::ScriptScore { .. }));
        assert!(matches!(query.must[2], Clause::Range { .. }));
        assert!(matches!(query.must[3], Clause::Nested { .. }));
        assert_eq!(query.min_score, 4.0);
        assert_eq!(query.involved_post_filter, None);
    }

    #[test]
    fn test_post_filter_mode_skips_script() {
        let compiler = QueryCompiler::new(CompilerSettings {
            involved_count_mode: InvolvedCountMode::PostFilter,
            ..Default::default()
        });
        let query = compiler.compile(&FilterRequest::new("1").with_min_involved(3));

        assert!(query.must.is_empty());
        assert_eq!(query.min_score, 0.0);
        assert_eq!(query.involved_post_filter, Some(3));
    }

    #[test]
    fn test_page_cap_never_exceeds_hard_limit() {
        let compiler = QueryCompiler::new(CompilerSettings {
            max_page_size: 5000,
            ..Default::default()
        });

        assert_eq!(compiler.effective_size(4000), 1000);
        assert_eq!(compiler.effective_size(999), 999);
    }

    #[test]
    fn test_flags_share_nested_block() {
        let request = FilterRequest::new("1")
            .with_driver_fled(true)
            .with_caused_death(true)
            .with_age_range(None, Some(30));

        let query = QueryCompiler::default().compile(&request);

        assert_eq!(query.nested_blocks().count(), 1);
        assert_eq!(query.must[0].nested_leaves().len(), 3);
        assert_eq!(query.min_score, 1.0);
    }
}
