// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Schema parsing, canonical form and fingerprint behavior.

use avrolite::{ErrorCategory, Schema};
use pretty_assertions::assert_eq;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_int_canonical_form_and_md5() -> TestResult {
    let schema = Schema::parse_str("\"int\"")?;
    assert_eq!(schema.canonical_form(), "\"int\"");
    assert_eq!(
        schema.md5_fingerprint().to_string(),
        "ef524ea1b91e73173d938ade36c1db32"
    );

    Ok(())
}

#[test]
fn test_canonical_form_fixed_key_order() -> TestResult {
    let schema = Schema::parse_str(
        r#"
    {
        "fields": [{"name": "id", "type": {"type": "fixed", "size": 2, "name": "Id"}}],
        "name": "Rec",
        "type": "record"
    }"#,
    )?;

    assert_eq!(
        schema.canonical_form(),
        r#"{"name":"Rec","type":"record","fields":[{"name":"id","type":{"name":"Id","type":"fixed","size":2}}]}"#
    );

    Ok(())
}

#[test]
fn test_canonical_form_strips_aliases_doc_and_defaults() -> TestResult {
    let bare = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "ns.Rec",
        "fields": [{"name": "a", "type": "int"}]
    }"#,
    )?;
    let decorated = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Rec",
        "namespace": "ns",
        "doc": "documented",
        "aliases": ["Old"],
        "extra": true,
        "fields": [{"name": "a", "type": "int", "default": 7, "doc": "a field"}]
    }"#,
    )?;

    assert_eq!(bare.canonical_form(), decorated.canonical_form());
    assert_eq!(
        bare.md5_fingerprint().to_string(),
        decorated.md5_fingerprint().to_string()
    );

    Ok(())
}

#[test]
fn test_custom_attributes_are_preserved_on_the_node() -> TestResult {
    let schema = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Rec",
        "extra": "kept",
        "fields": [{"name": "a", "type": "int"}]
    }"#,
    )?;

    let attributes = schema.custom_attributes().expect("A record has attributes");
    assert_eq!(
        attributes.get("extra"),
        Some(&serde_json::Value::String("kept".to_string()))
    );

    Ok(())
}

#[test]
fn test_recursive_schema_canonical_form_uses_name_reference() -> TestResult {
    let schema = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "LongList",
        "fields": [
            {"name": "value", "type": "long"},
            {"name": "next", "type": ["null", "LongList"]}
        ]
    }"#,
    )?;

    assert_eq!(
        schema.canonical_form(),
        r#"{"name":"LongList","type":"record","fields":[{"name":"value","type":"long"},{"name":"next","type":["null","LongList"]}]}"#
    );

    Ok(())
}

#[test]
fn test_union_invariants() {
    // A union may not be empty.
    assert!(Schema::parse_str("[]").is_err());
    // The same unnamed kind may not appear twice.
    assert!(Schema::parse_str(r#"["int", "string", "int"]"#).is_err());
    // "null" appears at most once.
    assert!(Schema::parse_str(r#"["null", "null"]"#).is_err());
    // A union may not directly contain a union.
    assert!(Schema::parse_str(r#"["null", ["int", "string"]]"#).is_err());
    // Two named types with distinct fullnames are fine.
    assert!(
        Schema::parse_str(
            r#"[{"type": "fixed", "name": "A", "size": 1},
                {"type": "fixed", "name": "B", "size": 1}]"#
        )
        .is_ok()
    );
}

#[test]
fn test_schema_error_categories() -> TestResult {
    for text in [
        r#"{"type": "enum", "name": "E", "symbols": ["a", "a"]}"#,
        r#"{"type": "enum", "name": "E", "symbols": ["1bad"]}"#,
        r#"{"type": "fixed", "name": "F", "size": -2}"#,
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "x", "type": "int"}, {"name": "x", "type": "long"}]}"#,
        r#"{"type": "record", "name": "R", "fields": [{"name": "x", "type": "Unknown"}]}"#,
        r#"{"type": "record", "name": "string", "fields": []}"#,
        r#"{"type": "record", "name": "R", "fields": [
            {"name": "x", "type": "int", "default": "nope"}]}"#,
        r#"{"type": "fixed", "name": "F", "size": 2, "aliases": ["bad alias"]}"#,
        r#"{"type": "record", "name": "R", "aliases": ["1bad"], "fields": []}"#,
    ] {
        let err = Schema::parse_str(text).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Schema, "for schema: {text}");
    }

    Ok(())
}

#[test]
fn test_union_field_default_must_match_first_branch() -> TestResult {
    // Valid: the default matches the first branch (null).
    Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "R",
        "fields": [{"name": "x", "type": ["null", "int"], "default": null}]
    }"#,
    )?;

    // Invalid: the default matches the second branch, not the first.
    assert!(
        Schema::parse_str(
            r#"
    {
        "type": "record",
        "name": "R",
        "fields": [{"name": "x", "type": ["null", "int"], "default": 3}]
    }"#,
        )
        .is_err()
    );

    Ok(())
}

#[test]
fn test_schema_display_is_canonical() -> TestResult {
    let schema = Schema::parse_str(r#"{"type": "array", "items": "string"}"#)?;
    assert_eq!(schema.to_string(), r#"{"type":"array","items":"string"}"#);

    Ok(())
}

#[test]
fn test_schema_equality_by_canonical_form() -> TestResult {
    let a = Schema::parse_str(r#"{"type": "map", "values": "int"}"#)?;
    let b = Schema::parse_str(r#"{"type": "map", "values": "int", "doc-ish": 1}"#)?;
    assert_eq!(a, b);

    let c = Schema::parse_str(r#"{"type": "map", "values": "long"}"#)?;
    assert_ne!(a, c);

    Ok(())
}

#[test]
fn test_sha256_fingerprint_is_available() -> TestResult {
    let schema = Schema::parse_str("\"null\"")?;
    let fingerprint = schema.fingerprint::<sha2::Sha256>();
    assert_eq!(fingerprint.bytes.len(), 32);

    Ok(())
}
