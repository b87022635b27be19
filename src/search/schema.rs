//! Field names of the incident index mapping
//!
//! These must match the mapping of the Elasticsearch index exactly; the query
//! compiler embeds them verbatim.

/// Publication timestamp, used for the date range and for sorting
pub const PUBLISHED_AT: &str = "published_at";

/// Location name fields searched by the free-text location filter
pub const LOCATION_FIELDS: [&str; 3] = [
    "locations.primary.name",
    "locations.primary.province.name",
    "locations.primary.district.name",
];

/// Series lineage field carrying the scope URI
pub const SERIES_SCOPE_FIELD: &str = "lineage.series";

/// Path of the nested attribute graph
pub const GRAPH_PATH: &str = "graph";

pub const GRAPH_AGE: &str = "graph.onto:age";
pub const GRAPH_GENDER: &str = "graph.onto:gender";
pub const GRAPH_ROLE: &str = "graph.onto:role";
pub const GRAPH_DRIVER_FLED: &str = "graph.onto:driverFled";
pub const GRAPH_CAUSED: &str = "graph.onto:caused";

/// Outcome value matched by the `causedDeath` flag
pub const CAUSED_DEATH_VALUE: &str = "srota:Death";

/// Key of the age attribute inside a `_source.graph` entry
pub const SOURCE_AGE_KEY: &str = "onto:age";

/// Default series scope prefix; the scope URI is `<prefix>/<series_id>`
pub const DEFAULT_SERIES_SCOPE_PREFIX: &str = "http://series";

/// Largest page the engine is ever asked for
pub const MAX_PAGE_SIZE: usize = 1000;

/// Nested fields callers may constrain through extra fields unless the
/// configuration overrides the list
pub fn default_nested_field_allow_list() -> Vec<String> {
    [
        GRAPH_AGE,
        GRAPH_GENDER,
        GRAPH_ROLE,
        GRAPH_DRIVER_FLED,
        GRAPH_CAUSED,
        "graph.onto:vehicle",
        "graph.onto:injury",
        "graph.onto:outcome",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Whether `field` lies under the nested graph path
pub fn is_nested_field(field: &str) -> bool {
    field
        .strip_prefix(GRAPH_PATH)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|rest| !rest.is_empty())
}
