//! Properties of the filter-to-query compilation

use incident_series_search::search::{
    schema, Clause, CompilerSettings, ExtraFields, FieldValue, FilterRequest,
    InvolvedCountMode, NestedFieldAllowList, QueryCompiler, SortOrder,
};
use serde_json::json;

fn compiler() -> QueryCompiler {
    QueryCompiler::default()
}

fn extra(pairs: &[(&str, &str)]) -> ExtraFields {
    ExtraFields::from_pairs(
        pairs.iter().map(|(k, v)| (*k, *v)),
        &NestedFieldAllowList::default(),
    )
    .unwrap()
}

#[test]
fn test_no_filters_yields_scope_only() {
    let query = compiler().compile(&FilterRequest::new("123"));

    assert!(query.must.is_empty());
    assert_eq!(query.min_score, 0.0);
    assert_eq!(
        query.filter,
        Clause::Term {
            field: "lineage.series".to_string(),
            value: FieldValue::from("http://series/123"),
        }
    );
    assert_eq!(query.from, 0);
    assert_eq!(query.size, 100);
    assert_eq!(query.sort.order, SortOrder::Desc);
}

#[test]
fn test_page_size_is_capped() {
    let compiler = compiler();

    for limit in [0, 1, 50, 999, 1000] {
        let query = compiler.compile(&FilterRequest::new("s").with_limit(limit));
        assert_eq!(query.size, limit);
    }

    for limit in [1001, 5000, usize::MAX] {
        let query = compiler.compile(&FilterRequest::new("s").with_limit(limit));
        assert_eq!(query.size, 1000);
    }
}

#[test]
fn test_start_passes_through() {
    let query = compiler().compile(&FilterRequest::new("s").with_start(250));
    assert_eq!(query.from, 250);
}

#[test]
fn test_compilation_is_deterministic() {
    let request = FilterRequest::new("42")
        .with_location("Lalitpur")
        .with_date_range(Some("2018-01-01".to_string()), None)
        .with_age_range(Some(18), Some(40))
        .with_gender("F")
        .with_min_involved(2)
        .with_extra_fields(extra(&[("graph.onto:role", "passenger")]));

    let compiler = compiler();
    let first = compiler.compile(&request);
    let second = compiler.compile(&request);

    assert_eq!(first, second);
    assert_eq!(first.to_body(), second.to_body());
}

#[test]
fn test_min_score_counts_categories() {
    let compiler = compiler();

    let location = FilterRequest::new("s").with_location("Kathmandu");
    assert_eq!(compiler.compile(&location).min_score, 1.0);

    let location_and_date = location
        .clone()
        .with_date_range(Some("2017-01-01".to_string()), None);
    assert_eq!(compiler.compile(&location_and_date).min_score, 2.0);

    let every_category = location_and_date.with_min_involved(3).with_gender("M");
    assert_eq!(compiler.compile(&every_category).min_score, 4.0);
}

#[test]
fn test_nested_leaves_share_one_category() {
    let request = FilterRequest::new("s")
        .with_age_range(Some(10), Some(20))
        .with_gender("M")
        .with_driver_fled(true)
        .with_caused_death(true);

    let query = compiler().compile(&request);

    assert_eq!(query.min_score, 1.0);
    assert_eq!(query.must.len(), 1);
    assert_eq!(query.must[0].nested_leaves().len(), 5);
}

#[test]
fn test_extra_fields_and_gender_merge_into_one_nested_block() {
    let request = FilterRequest::new("s")
        .with_gender("M")
        .with_extra_fields(extra(&[("graph.onto:role", "driver")]));

    let query = compiler().compile(&request);
    let blocks: Vec<_> = query.nested_blocks().collect();

    assert_eq!(blocks.len(), 1);
    assert_eq!(
        blocks[0].nested_leaves(),
        &[
            Clause::Match {
                field: "graph.onto:role".to_string(),
                value: FieldValue::from("driver"),
            },
            Clause::Match {
                field: schema::GRAPH_GENDER.to_string(),
                value: FieldValue::from("M"),
            },
        ]
    );
    assert_eq!(query.min_score, 1.0);
}

#[test]
fn test_extra_fields_outside_allow_list_are_rejected() {
    let result = ExtraFields::from_pairs(
        [("lineage.series", "http://series/other")],
        &NestedFieldAllowList::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_sort_direction() {
    let compiler = compiler();

    let desc = compiler.compile(&FilterRequest::new("s").with_descending(true));
    assert_eq!(desc.to_body()["sort"], json!([{ "published_at": { "order": "desc" } }]));

    let asc = compiler.compile(&FilterRequest::new("s").with_descending(false));
    assert_eq!(asc.to_body()["sort"], json!([{ "published_at": { "order": "asc" } }]));
}

#[test]
fn test_must_clause_order() {
    let request = FilterRequest::new("s")
        .with_gender("F")
        .with_date_range(None, Some("2020-12-31".to_string()))
        .with_min_involved(1)
        .with_location("Pokhara");

    let body = compiler().compile(&request).to_body();
    let must = body["query"]["bool"]["must"].as_array().unwrap();

    assert_eq!(must.len(), 4);
    assert!(must[0].get("multi_match").is_some());
    assert!(must[1].get("function_score").is_some());
    assert!(must[2].get("range").is_some());
    assert!(must[3].get("nested").is_some());
}

#[test]
fn test_kathmandu_request_body() {
    let request = FilterRequest::new("123")
        .with_location("Kathmandu")
        .with_date_range(Some("2017-01-01".to_string()), None)
        .with_limit(50);

    let body = compiler().compile(&request).to_body();

    assert_eq!(
        body,
        json!({
            "query": {
                "bool": {
                    "must": [
                        {
                            "multi_match": {
                                "query": "Kathmandu",
                                "fields": [
                                    "locations.primary.name",
                                    "locations.primary.province.name",
                                    "locations.primary.district.name"
                                ]
                            }
                        },
                        { "range": { "published_at": { "gte": "2017-01-01" } } }
                    ],
                    "filter": { "term": { "lineage.series": "http://series/123" } }
                }
            },
            "sort": [{ "published_at": { "order": "desc" } }],
            "from": 0,
            "size": 50,
            "min_score": 2.0
        })
    );
}

#[test]
fn test_involved_count_script_params() {
    let body = compiler()
        .compile(&FilterRequest::new("s").with_min_involved(3))
        .to_body();

    let function_score = &body["query"]["bool"]["must"][0]["function_score"];
    assert_eq!(function_score["boost_mode"], "replace");
    assert_eq!(function_score["script_score"]["script"]["params"]["min_involved"], 3);
    assert_eq!(body["min_score"], 1.0);
}

#[test]
fn test_post_filter_mode_moves_involved_count_out_of_query() {
    let compiler = QueryCompiler::new(CompilerSettings {
        involved_count_mode: InvolvedCountMode::PostFilter,
        ..CompilerSettings::default()
    });

    let query = compiler.compile(&FilterRequest::new("s").with_location("Bhaktapur").with_min_involved(2));

    assert_eq!(query.must.len(), 1);
    assert_eq!(query.min_score, 1.0);
    assert_eq!(query.involved_post_filter, Some(2));
}

#[test]
fn test_custom_scope_prefix() {
    let compiler = QueryCompiler::new(CompilerSettings {
        series_scope_prefix: "https://data.example.org/series/".to_string(),
        ..CompilerSettings::default()
    });

    let body = compiler.compile(&FilterRequest::new("7")).to_body();
    assert_eq!(
        body["query"]["bool"]["filter"],
        json!({ "term": { "lineage.series": "https://data.example.org/series/7" } })
    );
}

#[test]
fn test_empty_strings_count_as_absent() {
    let request = FilterRequest::new("s")
        .with_location("")
        .with_gender("")
        .with_date_range(Some(String::new()), Some(String::new()));

    let query = compiler().compile(&request);
    assert!(query.must.is_empty());
    assert_eq!(query.min_score, 0.0);
}
