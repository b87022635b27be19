//! Typed Elasticsearch query DSL fragments
//!
//! The compiler works on [`Clause`] values and only renders JSON at the edge,
//! so tests can inspect the tree structurally.

use crate::search::request::{FieldValue, SortOrder};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Inclusive bounds of a range clause; unset bounds are omitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeBounds {
    pub gte: Option<FieldValue>,
    pub lte: Option<FieldValue>,
}

impl RangeBounds {
    pub fn at_least(value: impl Into<FieldValue>) -> Self {
        Self {
            gte: Some(value.into()),
            lte: None,
        }
    }

    pub fn at_most(value: impl Into<FieldValue>) -> Self {
        Self {
            gte: None,
            lte: Some(value.into()),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }
}

/// One node of the compiled query tree
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Text match across several fields
    MultiMatch { query: String, fields: Vec<String> },

    Range { field: String, bounds: RangeBounds },

    /// Analysed single-field match
    Match { field: String, value: FieldValue },

    /// Exact, non-analysed term
    Term { field: String, value: FieldValue },

    /// Conjunction evaluated per nested sub-document under `path`
    Nested { path: String, must: Vec<Clause> },

    /// Replaces the document score with the result of a Painless script
    ScriptScore {
        source: String,
        params: BTreeMap<String, Value>,
    },
}

impl Clause {
    pub fn to_json(&self) -> Value {
        match self {
            Clause::MultiMatch { query, fields } => json!({
                "multi_match": {
                    "query": query,
                    "fields": fields,
                }
            }),
            Clause::Range { field, bounds } => {
                let mut range = Map::new();
                if let Some(ref gte) = bounds.gte {
                    range.insert("gte".to_string(), json!(gte));
                }
                if let Some(ref lte) = bounds.lte {
                    range.insert("lte".to_string(), json!(lte));
                }
                json!({ "range": { field.clone(): Value::Object(range) } })
            }
            Clause::Match { field, value } => json!({ "match": { field.clone(): value } }),
            Clause::Term { field, value } => json!({ "term": { field.clone(): value } }),
            Clause::Nested { path, must } => json!({
                "nested": {
                    "path": path,
                    "query": {
                        "bool": {
                            "must": must.iter().map(Clause::to_json).collect::<Vec<_>>(),
                        }
                    }
                }
            }),
            Clause::ScriptScore { source, params } => json!({
                "function_score": {
                    "query": { "match_all": {} },
                    "script_score": {
                        "script": {
                            "source": source,
                            "params": params,
                        }
                    },
                    "boost_mode": "replace",
                }
            }),
        }
    }

    /// Leaves of a nested clause, empty for every other kind
    pub fn nested_leaves(&self) -> &[Clause] {
        match self {
            Clause::Nested { must, .. } => must,
            _ => &[],
        }
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Single-field sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn to_json(&self) -> Value {
        json!([{ self.field.clone(): { "order": self.order.as_str() } }])
    }
}

/// Search request document plus response-shaping parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Scoring clauses, in fixed category order
    pub must: Vec<Clause>,

    /// Non-scoring series scope
    pub filter: Clause,

    pub sort: SortSpec,
    pub from: usize,
    pub size: usize,
    pub min_score: f64,

    /// Involved-count threshold left for the caller to enforce on hits
    pub involved_post_filter: Option<u32>,
}

impl CompiledQuery {
    /// Render the `_search` request body
    pub fn to_body(&self) -> Value {
        json!({
            "query": {
                "bool": {
                    "must": self.must.iter().map(Clause::to_json).collect::<Vec<_>>(),
                    "filter": self.filter.to_json(),
                }
            },
            "sort": self.sort.to_json(),
            "from": self.from,
            "size": self.size,
            "min_score": self.min_score,
        })
    }

    pub fn nested_blocks(&self) -> impl Iterator<Item = &Clause> {
        self.must
            .iter()
            .filter(|clause| matches!(clause, Clause::Nested { .. }))
    }
}

impl Serialize for CompiledQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_body().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_omits_unset_bounds() {
        let clause = Clause::Range {
            field: "published_at".to_string(),
            bounds: RangeBounds::at_least("2017-01-01"),
        };

        assert_eq!(
            clause.to_json(),
            json!({ "range": { "published_at": { "gte": "2017-01-01" } } })
        );
    }

    #[test]
    fn test_nested_renders_bool_must() {
        let clause = Clause::Nested {
            path: "graph".to_string(),
            must: vec![Clause::Match {
                field: "graph.onto:gender".to_string(),
                value: FieldValue::from("M"),
            }],
        };

        assert_eq!(
            clause.to_json(),
            json!({
                "nested": {
                    "path": "graph",
                    "query": { "bool": { "must": [ { "match": { "graph.onto:gender": "M" } } ] } }
                }
            })
        );
        assert_eq!(clause.nested_leaves().len(), 1);
    }

    #[test]
    fn test_script_score_replaces_score() {
        let mut params = BTreeMap::new();
        params.insert("threshold".to_string(), json!(2));
        let clause = Clause::ScriptScore {
            source: "return 1;".to_string(),
            params,
        };

        let rendered = clause.to_json();
        assert_eq!(rendered["function_score"]["boost_mode"], "replace");
        assert_eq!(
            rendered["function_score"]["script_score"]["script"]["params"]["threshold"],
            2
        );
    }

    #[test]
    fn test_sort_spec_json() {
        let sort = SortSpec {
            field: "published_at".to_string(),
            order: SortOrder::Desc,
        };
        assert_eq!(sort.to_json(), json!([{ "published_at": { "order": "desc" } }]));
    }
}
