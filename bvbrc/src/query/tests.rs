//! Cross-dialect tests for the query builders.

use std::collections::BTreeMap;

use super::*;

#[test]
fn test_single_part_groups_unwrap_in_both_dialects() {
    let r = rql::eq("genome_id", "208964.12");
    assert_eq!(rql::and([r.clone()]).render(), r.render());
    assert_eq!(rql::or([r.clone()]).render(), r.render());

    let l = lucene::eq("genome_id", "208964.12");
    assert_eq!(lucene::and([l.clone()]).render(), l.render());
    assert_eq!(lucene::or([l.clone()]).render(), l.render());
}

#[test]
fn test_zero_part_groups_are_empty_in_both_dialects() {
    assert_eq!(rql::and([]).render(), "");
    assert_eq!(rql::or([]).render(), "");
    assert_eq!(lucene::and([]).render(), "");
    assert_eq!(lucene::or([]).render(), "");
}

#[test]
fn test_empty_in_differs_between_dialects() {
    // RQL drops the clause, Solr matches everything
    assert_eq!(rql::in_::<&str>("genome_id", []).render(), "");
    assert_eq!(lucene::in_::<&str>("genome_id", []).render(), "*:*");
}

#[test]
fn test_single_key_mapping_is_plain_eq() {
    let mut filters = BTreeMap::new();
    filters.insert("genome_id".to_string(), Value::from("208964.12"));
    assert_eq!(rql::build_and_from(&filters), rql::and([rql::eq("genome_id", "208964.12")]));
    assert_eq!(
        rql::build_and_from(&filters).render(),
        rql::eq("genome_id", "208964.12").render()
    );
}

#[test]
fn test_numeric_id_stays_bare_in_lucene() {
    assert_eq!(encode_lucene(&Value::from("208964.12")), "208964.12");
    assert_eq!(encode_lucene(&Value::from("E. coli")), "\"E. coli\"");
}

#[test]
fn test_rql_plus_is_never_bare() {
    let encoded = encode_rql(&Value::from("+"));
    assert_eq!(encoded, "%22%2B%22");
    assert!(!encoded.contains('+'));
    assert_eq!(rql::eq("strand", "+").render(), "eq(strand,%22%2B%22)");
}

#[test]
fn test_lucene_fragments_feed_params() {
    let fq = lucene::and([
        lucene::eq("genome_id", "208964.12"),
        lucene::in_("feature_type", ["CDS", "tRNA"]),
    ]);
    let params = ParamsBuilder::new().fq(fq.render()).build();
    assert_eq!(
        params.get("fq"),
        Some(&ParamValue::Multi(vec![
            "(genome_id:208964.12 AND feature_type:(\"CDS\" OR \"tRNA\"))".to_string()
        ]))
    );
}

#[test]
fn test_nested_groups_skip_empty_children() {
    let r = rql::and([rql::or([]), rql::eq("a", 1), rql::in_::<i64>("b", [])]);
    assert_eq!(r.render(), "eq(a,1)");

    let l = lucene::or([lucene::and([]), lucene::eq("a", 1)]);
    assert_eq!(l.render(), "a:1");
}
