//! Filter request model

use crate::search::error::{SearchError, SearchResult};
use crate::search::schema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Sort direction on the publication timestamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar value of an exact-match constraint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Integer(i64),
    Text(String),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Set of nested field names callers may constrain directly
#[derive(Debug, Clone)]
pub struct NestedFieldAllowList {
    fields: HashSet<String>,
}

impl NestedFieldAllowList {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Reject names outside the nested path or missing from the list
    pub fn check(&self, field: &str) -> SearchResult<()> {
        if !schema::is_nested_field(field) {
            return Err(SearchError::InvalidFilter(format!(
                "field '{}' is not under the '{}' path",
                field,
                schema::GRAPH_PATH
            )));
        }
        if !self.fields.contains(field) {
            return Err(SearchError::InvalidFilter(format!(
                "field '{}' is not a searchable nested attribute",
                field
            )));
        }
        Ok(())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

impl Default for NestedFieldAllowList {
    fn default() -> Self {
        Self::new(schema::default_nested_field_allow_list())
    }
}

/// Validated field→value constraints destined for the nested block
///
/// Only obtainable through [`ExtraFields::from_pairs`], so every key has
/// passed the allow-list. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtraFields(BTreeMap<String, FieldValue>);

impl ExtraFields {
    pub fn from_pairs<K, V>(
        pairs: impl IntoIterator<Item = (K, V)>,
        allow_list: &NestedFieldAllowList,
    ) -> SearchResult<Self>
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut fields = BTreeMap::new();
        for (name, value) in pairs {
            let name = name.into();
            allow_list.check(&name)?;
            fields.insert(name, value.into());
        }
        Ok(Self(fields))
    }

    /// Combine two validated sets; entries of `other` win on key collisions
    pub fn merged(mut self, other: ExtraFields) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Typed, optional filter parameters for one series search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    /// Series scope identifier
    pub series_id: String,

    /// Pagination offset
    pub start: usize,

    /// Requested page size, capped when compiled
    pub limit: usize,

    /// Free-text location
    pub location: Option<String>,

    /// Inclusive lower bound on the publication timestamp
    pub date_start: Option<String>,

    /// Inclusive upper bound on the publication timestamp
    pub date_end: Option<String>,

    pub age_start: Option<u32>,
    pub age_end: Option<u32>,
    pub gender: Option<String>,

    /// Minimum number of graph entries carrying an age
    pub min_involved: Option<u32>,

    pub driver_fled: bool,
    pub caused_death: bool,

    /// Additional exact-match constraints on nested fields
    pub extra_fields: ExtraFields,

    /// Reverse-chronological order when true
    pub descending: bool,
}

impl FilterRequest {
    pub const DEFAULT_LIMIT: usize = 100;

    /// Create a request with every optional filter absent
    pub fn new(series_id: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            start: 0,
            limit: Self::DEFAULT_LIMIT,
            location: None,
            date_start: None,
            date_end: None,
            age_start: None,
            age_end: None,
            gender: None,
            min_involved: None,
            driver_fled: false,
            caused_death: false,
            extra_fields: ExtraFields::default(),
            descending: true,
        }
    }

    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Empty text counts as absent
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = non_empty(location.into());
        self
    }

    pub fn with_date_range(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.date_start = start.and_then(non_empty);
        self.date_end = end.and_then(non_empty);
        self
    }

    pub fn with_age_range(mut self, start: Option<u32>, end: Option<u32>) -> Self {
        self.age_start = start;
        self.age_end = end;
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = non_empty(gender.into());
        self
    }

    /// Accepts a bare threshold or an optional one straight from decoding
    pub fn with_min_involved(mut self, min_involved: impl Into<Option<u32>>) -> Self {
        self.min_involved = min_involved.into();
        self
    }

    pub fn with_driver_fled(mut self, driver_fled: bool) -> Self {
        self.driver_fled = driver_fled;
        self
    }

    pub fn with_caused_death(mut self, caused_death: bool) -> Self {
        self.caused_death = caused_death;
        self
    }

    pub fn with_extra_fields(mut self, extra_fields: ExtraFields) -> Self {
        self.extra_fields = extra_fields;
        self
    }

    pub fn with_descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_request_defaults() {
        let request = FilterRequest::new("123");

        assert_eq!(request.series_id, "123");
        assert_eq!(request.start, 0);
        assert_eq!(request.limit, 100);
        assert!(request.descending);
        assert!(request.location.is_none());
        assert!(request.extra_fields.is_empty());
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let request = FilterRequest::new("123")
            .with_location("")
            .with_gender("")
            .with_date_range(Some(String::new()), Some("2018-01-01".to_string()));

        assert!(request.location.is_none());
        assert!(request.gender.is_none());
        assert!(request.date_start.is_none());
        assert_eq!(request.date_end.as_deref(), Some("2018-01-01"));
    }

    #[test]
    fn test_min_involved_bare_or_optional() {
        assert_eq!(FilterRequest::new("1").with_min_involved(3).min_involved, Some(3));
        assert_eq!(
            FilterRequest::new("1").with_min_involved(Some(2)).min_involved,
            Some(2)
        );
        assert_eq!(
            FilterRequest::new("1")
                .with_min_involved(3)
                .with_min_involved(None)
                .min_involved,
            None
        );
    }

    #[test]
    fn test_extra_fields_allow_list() {
        let allow_list = NestedFieldAllowList::default();

        let fields = ExtraFields::from_pairs([("graph.onto:role", "driver")], &allow_list).unwrap();
        assert_eq!(fields.len(), 1);

        let err = ExtraFields::from_pairs([("graph.onto:secret", "x")], &allow_list).unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilter(_)));

        let err = ExtraFields::from_pairs([("lineage.series", "x")], &allow_list).unwrap_err();
        assert!(matches!(err, SearchError::InvalidFilter(_)));
    }

    #[test]
    fn test_extra_fields_merge_prefers_later() {
        let allow_list = NestedFieldAllowList::default();
        let query = ExtraFields::from_pairs([("graph.onto:role", "driver")], &allow_list).unwrap();
        let body = ExtraFields::from_pairs([("graph.onto:role", "pedestrian")], &allow_list).unwrap();

        let merged = query.merged(body);
        let (_, value) = merged.iter().next().unwrap();
        assert_eq!(value, &FieldValue::Text("pedestrian".to_string()));
    }

    #[test]
    fn test_field_value_untagged() {
        let values: Vec<FieldValue> = serde_json::from_str(r#"[true, 42, "M"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::Flag(true),
                FieldValue::Integer(42),
                FieldValue::Text("M".to_string())
            ]
        );
    }

    #[test]
    fn test_sort_order_from_flag() {
        assert_eq!(SortOrder::from_descending(true), SortOrder::Desc);
        assert_eq!(SortOrder::from_descending(false).as_str(), "asc");
    }
}
