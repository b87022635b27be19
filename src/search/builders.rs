//! Per-category clause builders
//!
//! Each builder reads only the filter request and yields at most one
//! top-level clause, or a list of leaves destined for the nested block.

use crate::search::clause::{Clause, RangeBounds};
use crate::search::request::{FieldValue, FilterRequest};
use crate::search::schema;
use serde_json::json;
use std::collections::BTreeMap;

/// Painless step function: 1 when enough graph entries carry an age, else 0
pub(crate) const INVOLVED_COUNT_SCRIPT: &str = "\
int count = 0; \
def graph = params._source['graph']; \
if (graph != null) { \
  for (def entry : graph) { \
    if (entry != null && entry['onto:age'] != null) { count++; } \
  } \
} \
return count >= params.min_involved ? 1 : 0;";

/// Multi-field text match over the location hierarchy
pub fn location_clause(request: &FilterRequest) -> Option<Clause> {
    let location = request.location.as_deref().filter(|l| !l.is_empty())?;

    Some(Clause::MultiMatch {
        query: location.to_string(),
        fields: schema::LOCATION_FIELDS.iter().map(|f| f.to_string()).collect(),
    })
}

/// Publication timestamp range with only the supplied bounds
pub fn date_range_clause(request: &FilterRequest) -> Option<Clause> {
    let bounds = RangeBounds {
        gte: request.date_start.clone().map(FieldValue::Text),
        lte: request.date_end.clone().map(FieldValue::Text),
    };

    if bounds.is_unbounded() {
        return None;
    }

    Some(Clause::Range {
        field: schema::PUBLISHED_AT.to_string(),
        bounds,
    })
}

/// Script re-scoring documents on how many graph entries have an age
pub fn involved_count_clause(request: &FilterRequest) -> Option<Clause> {
    let min_involved = request.min_involved?;

    let mut params = BTreeMap::new();
    params.insert("min_involved".to_string(), json!(min_involved));

    Some(Clause::ScriptScore {
        source: INVOLVED_COUNT_SCRIPT.to_string(),
        params,
    })
}

/// One match leaf per extra field, in key order
pub fn extra_field_leaves(request: &FilterRequest) -> Vec<Clause> {
    request
        .extra_fields
        .iter()
        .map(|(field, value)| Clause::Match {
            field: field.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Age bounds and gender, one leaf per supplied value
pub fn demographic_leaves(request: &FilterRequest) -> Vec<Clause> {
    let mut leaves = Vec::new();

    if let Some(age_start) = request.age_start {
        leaves.push(Clause::Range {
            field: schema::GRAPH_AGE.to_string(),
            bounds: RangeBounds::at_least(i64::from(age_start)),
        });
    }

    if let Some(age_end) = request.age_end {
        leaves.push(Clause::Range {
            field: schema::GRAPH_AGE.to_string(),
            bounds: RangeBounds::at_most(i64::from(age_end)),
        });
    }

    if let Some(gender) = request.gender.as_deref().filter(|g| !g.is_empty()) {
        leaves.push(Clause::Match {
            field: schema::GRAPH_GENDER.to_string(),
            value: FieldValue::from(gender),
        });
    }

    leaves
}

/// Driver-fled and caused-death flags
pub fn event_flag_leaves(request: &FilterRequest) -> Vec<Clause> {
    let mut leaves = Vec::new();

    if request.driver_fled {
        leaves.push(Clause::Match {
            field: schema::GRAPH_DRIVER_FLED.to_string(),
            value: FieldValue::Flag(true),
        });
    }

    if request.caused_death {
        leaves.push(Clause::Match {
            field: schema::GRAPH_CAUSED.to_string(),
            value: FieldValue::from(schema::CAUSED_DEATH_VALUE),
        });
    }

    leaves
}
