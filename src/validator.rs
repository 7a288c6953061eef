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

//! Validation of the identifiers that appear in schemas: type names,
//! namespaces, enum symbols and record field names.
//!
//! All four rules boil down to the Avro identifier shape
//! `[A-Za-z_][A-Za-z0-9_]*`; full names additionally allow a dotted
//! namespace prefix. The compiled regexes are cached for the lifetime of the
//! process.

use crate::{AvroResult, error::Details};
use regex_lite::Regex;
use std::sync::OnceLock;

/// An optional dotted namespace followed by a short name without dots.
///
/// The `name` capture group marks where the short name starts within the
/// full name.
fn full_name_regex() -> &'static Regex {
    static FULL_NAME: OnceLock<Regex> = OnceLock::new();
    FULL_NAME.get_or_init(|| {
        Regex::new(
            r"^((?P<namespace>([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?)\.)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)$",
        )
        .unwrap()
    })
}

/// Zero or more dot-separated identifiers. The empty namespace is allowed
/// and treated as no namespace.
fn namespace_regex() -> &'static Regex {
    static NAMESPACE: OnceLock<Regex> = OnceLock::new();
    NAMESPACE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?$").unwrap()
    })
}

/// A single identifier, as used by enum symbols and record field names.
fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

/// Validate a schema name (or alias) and return the start byte of its short
/// name part.
pub(crate) fn validate_schema_name(schema_name: &str) -> AvroResult<usize> {
    let regex = full_name_regex();
    let caps = regex
        .captures(schema_name)
        .ok_or_else(|| Details::InvalidSchemaName(schema_name.to_string(), regex.as_str()))?;
    Ok(caps
        .name("name")
        .expect("The full-name pattern has a `name` group")
        .start())
}

pub(crate) fn validate_namespace(ns: &str) -> AvroResult<()> {
    let regex = namespace_regex();
    if regex.is_match(ns) {
        Ok(())
    } else {
        Err(Details::InvalidNamespace(ns.to_string(), regex.as_str()).into())
    }
}

pub(crate) fn validate_enum_symbol_name(symbol: &str) -> AvroResult<()> {
    if identifier_regex().is_match(symbol) {
        Ok(())
    } else {
        Err(Details::EnumSymbolName(symbol.to_string()).into())
    }
}

pub(crate) fn validate_record_field_name(name: &str) -> AvroResult<()> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(Details::FieldName(name.to_string()).into())
    }
}
