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

//! Writer/reader schema resolution scenarios.

use avrolite::{ErrorCategory, Schema, Value};
use pretty_assertions::assert_eq;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_int_writer_nullable_int_reader() -> TestResult {
    let writer = Schema::parse_str("\"int\"")?;
    let reader = Schema::parse_str(r#"["null", "int"]"#)?;

    let resolver = reader.create_resolver(&writer)?;
    let buffer = writer.to_buffer(&Value::Int(123))?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Union(1, Box::new(Value::Int(123)))
    );

    Ok(())
}

#[test]
fn test_reader_drops_writer_field() -> TestResult {
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [
            {"name": "age", "type": "int"},
            {"name": "name", "type": "string"}
        ]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [{"name": "name", "type": "string"}]
    }"#,
    )?;

    let value = Value::Record(vec![
        ("age".into(), Value::Int(41)),
        ("name".into(), Value::String("ann".into())),
    ]);
    let buffer = writer.to_buffer(&value)?;

    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Record(vec![("name".into(), Value::String("ann".into()))])
    );

    Ok(())
}

#[test]
fn test_reader_fills_default_for_missing_writer_field() -> TestResult {
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [{"name": "name", "type": "string"}]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [
            {"name": "age", "type": "int", "default": 25},
            {"name": "name", "type": "string"}
        ]
    }"#,
    )?;

    let buffer = writer.to_buffer(&Value::Record(vec![(
        "name".into(),
        Value::String("ann".into()),
    )]))?;

    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Record(vec![
            ("age".into(), Value::Int(25)),
            ("name".into(), Value::String("ann".into())),
        ])
    );

    Ok(())
}

#[test]
fn test_missing_default_fails_at_create_resolver() -> TestResult {
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [{"name": "name", "type": "string"}]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [
            {"name": "age", "type": "int"},
            {"name": "name", "type": "string"}
        ]
    }"#,
    )?;

    let err = reader.create_resolver(&writer).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resolve);

    Ok(())
}

#[test]
fn test_field_reordering() -> TestResult {
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Pair",
        "fields": [
            {"name": "a", "type": "int"},
            {"name": "b", "type": "string"}
        ]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Pair",
        "fields": [
            {"name": "b", "type": "string"},
            {"name": "a", "type": "int"}
        ]
    }"#,
    )?;

    let buffer = writer.to_buffer(&Value::Record(vec![
        ("a".into(), Value::Int(1)),
        ("b".into(), Value::String("x".into())),
    ]))?;

    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Record(vec![
            ("b".into(), Value::String("x".into())),
            ("a".into(), Value::Int(1)),
        ])
    );

    Ok(())
}

#[test]
fn test_enum_resolution_with_aliases() -> TestResult {
    let writer = Schema::parse_str(
        r#"{"type": "enum", "name": "Foo", "symbols": ["bar", "baz"]}"#,
    )?;
    let reader = Schema::parse_str(
        r#"{"type": "enum", "name": "Foo2", "aliases": ["Foo"],
            "symbols": ["foo", "baz", "bar"]}"#,
    )?;

    let buffer = writer.to_buffer(&Value::Enum(0, "bar".into()))?;
    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Enum(2, "bar".into())
    );

    Ok(())
}

#[test]
fn test_unknown_enum_symbol_is_a_decode_error() -> TestResult {
    let writer = Schema::parse_str(
        r#"{"type": "enum", "name": "Foo", "symbols": ["bar", "baz"]}"#,
    )?;
    let reader = Schema::parse_str(
        r#"{"type": "enum", "name": "Foo", "symbols": ["baz"]}"#,
    )?;

    // The resolver compiles: only the `bar` ordinal is unreadable.
    let resolver = reader.create_resolver(&writer)?;

    let buffer = writer.to_buffer(&Value::Enum(1, "baz".into()))?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Enum(0, "baz".into())
    );

    let buffer = writer.to_buffer(&Value::Enum(0, "bar".into()))?;
    let err = reader.from_buffer_resolved(&buffer, &resolver).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Decode);

    Ok(())
}

#[test]
fn test_unknown_enum_symbol_falls_back_to_reader_default() -> TestResult {
    let writer = Schema::parse_str(
        r#"{"type": "enum", "name": "Foo", "symbols": ["bar", "baz"]}"#,
    )?;
    let reader = Schema::parse_str(
        r#"{"type": "enum", "name": "Foo", "symbols": ["baz", "other"],
            "default": "other"}"#,
    )?;

    let resolver = reader.create_resolver(&writer)?;
    let buffer = writer.to_buffer(&Value::Enum(0, "bar".into()))?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Enum(1, "other".into())
    );

    Ok(())
}

#[test]
fn test_union_widening() -> TestResult {
    let writer = Schema::parse_str(r#"["string", "int"]"#)?;
    let reader = Schema::parse_str(r#"["int", "bytes"]"#)?;

    let resolver = reader.create_resolver(&writer)?;

    let buffer = writer.to_buffer(&Value::Union(0, Box::new(Value::String("hi".into()))))?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Union(1, Box::new(Value::Bytes(b"hi".to_vec())))
    );

    let buffer = writer.to_buffer(&Value::Union(1, Box::new(Value::Int(1))))?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Union(0, Box::new(Value::Int(1)))
    );

    Ok(())
}

#[test]
fn test_promotions_in_record_fields() -> TestResult {
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Nums",
        "fields": [
            {"name": "a", "type": "int"},
            {"name": "b", "type": "long"},
            {"name": "c", "type": "float"}
        ]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Nums",
        "fields": [
            {"name": "a", "type": "long"},
            {"name": "b", "type": "double"},
            {"name": "c", "type": "double"}
        ]
    }"#,
    )?;

    let buffer = writer.to_buffer(&Value::Record(vec![
        ("a".into(), Value::Int(7)),
        ("b".into(), Value::Long(1 << 40)),
        ("c".into(), Value::Float(0.5)),
    ]))?;

    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Record(vec![
            ("a".into(), Value::Long(7)),
            ("b".into(), Value::Double((1u64 << 40) as f64)),
            ("c".into(), Value::Double(0.5)),
        ])
    );

    Ok(())
}

#[test]
fn test_record_field_alias_matching() -> TestResult {
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [{"name": "fullName", "type": "string"}]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [{"name": "name", "type": "string", "aliases": ["fullName"]}]
    }"#,
    )?;

    let buffer = writer.to_buffer(&Value::Record(vec![(
        "fullName".into(),
        Value::String("ann".into()),
    )]))?;

    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Record(vec![("name".into(), Value::String("ann".into()))])
    );

    Ok(())
}

#[test]
fn test_ambiguous_field_alias_fails() -> TestResult {
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [
            {"name": "name", "type": "string"},
            {"name": "fullName", "type": "string"}
        ]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Person",
        "fields": [{"name": "name", "type": "string", "aliases": ["fullName"]}]
    }"#,
    )?;

    let err = reader.create_resolver(&writer).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resolve);

    Ok(())
}

#[test]
fn test_fixed_size_mismatch_fails() -> TestResult {
    let writer = Schema::parse_str(r#"{"type": "fixed", "name": "Id", "size": 4}"#)?;
    let reader = Schema::parse_str(r#"{"type": "fixed", "name": "Id", "size": 8}"#)?;

    let err = reader.create_resolver(&writer).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resolve);

    Ok(())
}

#[test]
fn test_record_name_mismatch_fails_without_alias() -> TestResult {
    let writer = Schema::parse_str(
        r#"{"type": "record", "name": "A", "fields": [{"name": "x", "type": "int"}]}"#,
    )?;
    let reader = Schema::parse_str(
        r#"{"type": "record", "name": "B", "fields": [{"name": "x", "type": "int"}]}"#,
    )?;
    assert!(reader.create_resolver(&writer).is_err());

    let aliased = Schema::parse_str(
        r#"{"type": "record", "name": "B", "aliases": ["A"],
            "fields": [{"name": "x", "type": "int"}]}"#,
    )?;
    assert!(aliased.create_resolver(&writer).is_ok());

    Ok(())
}

#[test]
fn test_array_and_map_recursion() -> TestResult {
    let writer = Schema::parse_str(r#"{"type": "array", "items": "int"}"#)?;
    let reader = Schema::parse_str(r#"{"type": "array", "items": "double"}"#)?;

    let buffer = writer.to_buffer(&Value::Array(vec![Value::Int(1), Value::Int(2)]))?;
    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Array(vec![Value::Double(1.0), Value::Double(2.0)])
    );

    let writer = Schema::parse_str(r#"{"type": "map", "values": "string"}"#)?;
    let reader = Schema::parse_str(r#"{"type": "map", "values": "bytes"}"#)?;

    let buffer = writer.to_buffer(&Value::Map(
        [("k".to_string(), Value::String("v".into()))]
            .into_iter()
            .collect(),
    ))?;
    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Map(
            [("k".to_string(), Value::Bytes(b"v".to_vec()))]
                .into_iter()
                .collect(),
        )
    );

    Ok(())
}

#[test]
fn test_mutually_recursive_records() -> TestResult {
    let text = r#"
    {
        "type": "record",
        "name": "Tree",
        "fields": [
            {"name": "label", "type": "string"},
            {"name": "children", "type": {"type": "array", "items": "Tree"}}
        ]
    }"#;
    let writer = Schema::parse_str(text)?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Tree",
        "fields": [
            {"name": "label", "type": "string"},
            {"name": "weight", "type": "double", "default": 1.0},
            {"name": "children", "type": {"type": "array", "items": "Tree"}}
        ]
    }"#,
    )?;

    let leaf = Value::Record(vec![
        ("label".into(), Value::String("leaf".into())),
        ("children".into(), Value::Array(vec![])),
    ]);
    let root = Value::Record(vec![
        ("label".into(), Value::String("root".into())),
        ("children".into(), Value::Array(vec![leaf])),
    ]);
    let buffer = writer.to_buffer(&root)?;

    let resolver = reader.create_resolver(&writer)?;
    let expected_leaf = Value::Record(vec![
        ("label".into(), Value::String("leaf".into())),
        ("weight".into(), Value::Double(1.0)),
        ("children".into(), Value::Array(vec![])),
    ]);
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Record(vec![
            ("label".into(), Value::String("root".into())),
            ("weight".into(), Value::Double(1.0)),
            ("children".into(), Value::Array(vec![expected_leaf])),
        ])
    );

    Ok(())
}

#[test]
fn test_skipped_field_with_recursive_type() -> TestResult {
    // The reader ignores a writer field whose type is a recursive record;
    // skipping must advance over the whole subtree.
    let writer = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Outer",
        "fields": [
            {"name": "tree", "type": {
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "v", "type": "int"},
                    {"name": "kids", "type": {"type": "array", "items": "Node"}}
                ]
            }},
            {"name": "keep", "type": "string"}
        ]
    }"#,
    )?;
    let reader = Schema::parse_str(
        r#"
    {
        "type": "record",
        "name": "Outer",
        "fields": [{"name": "keep", "type": "string"}]
    }"#,
    )?;

    let tree = Value::Record(vec![
        ("v".into(), Value::Int(1)),
        (
            "kids".into(),
            Value::Array(vec![Value::Record(vec![
                ("v".into(), Value::Int(2)),
                ("kids".into(), Value::Array(vec![])),
            ])]),
        ),
    ]);
    let buffer = writer.to_buffer(&Value::Record(vec![
        ("tree".into(), tree),
        ("keep".into(), Value::String("kept".into())),
    ]))?;

    let resolver = reader.create_resolver(&writer)?;
    assert_eq!(
        reader.from_buffer_resolved(&buffer, &resolver)?,
        Value::Record(vec![("keep".into(), Value::String("kept".into()))])
    );

    Ok(())
}

#[test]
fn test_identity_resolver_on_every_kind() -> TestResult {
    for text in [
        "\"null\"",
        "\"boolean\"",
        "\"int\"",
        "\"long\"",
        "\"float\"",
        "\"double\"",
        "\"bytes\"",
        "\"string\"",
        r#"{"type": "fixed", "name": "Id", "size": 2}"#,
        r#"{"type": "enum", "name": "Suit", "symbols": ["H", "S"]}"#,
        r#"{"type": "array", "items": "long"}"#,
        r#"{"type": "map", "values": "string"}"#,
        r#"["null", "long"]"#,
        r#"{"type": "record", "name": "R", "fields": [{"name": "x", "type": "int"}]}"#,
    ] {
        let schema = Schema::parse_str(text)?;
        let resolver = schema.create_resolver(&schema)?;
        let value = schema.random()?;
        let buffer = schema.to_buffer(&value)?;
        assert_eq!(schema.from_buffer_resolved(&buffer, &resolver)?, value);
    }

    Ok(())
}
