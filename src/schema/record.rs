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

use crate::AvroResult;
use crate::error::Details;
use crate::schema::{Aliases, Documentation, Name, Parser, Schema};
use crate::types::{self, ValueReadOptions};
use crate::util::MapHelper;
use crate::validator::validate_record_field_name;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// A description of a Record schema.
#[derive(bon::Builder, Clone)]
pub struct RecordSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    #[builder(default)]
    pub aliases: Aliases,
    /// The documentation of the schema
    #[builder(default)]
    pub doc: Documentation,
    /// The set of fields of the schema
    #[builder(default)]
    pub fields: Vec<RecordField>,
    /// The `lookup` table maps field names (and field aliases) to their
    /// position in the `Vec` of `fields`.
    #[builder(skip = calculate_lookup_table(&fields))]
    pub lookup: BTreeMap<String, usize>,
    /// The custom attributes of the schema
    #[builder(default)]
    pub attributes: BTreeMap<String, JsonValue>,
}

impl RecordSchema {
    /// The position of the field matching `name`, either directly or through
    /// one of the field's aliases.
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }
}

impl Debug for RecordSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("RecordSchema");
        debug.field("name", &self.name);
        if let Some(ref aliases) = self.aliases {
            debug.field("aliases", aliases);
        }
        if let Some(ref doc) = self.doc {
            debug.field("doc", doc);
        }
        debug.field("fields", &self.fields);
        if !self.attributes.is_empty() {
            debug.field("attributes", &self.attributes);
        }
        debug.finish_non_exhaustive()
    }
}

/// Calculate the lookup table for the given fields.
fn calculate_lookup_table(fields: &[RecordField]) -> BTreeMap<String, usize> {
    let mut lookup = BTreeMap::new();
    for (i, field) in fields.iter().enumerate() {
        lookup.insert(field.name.clone(), i);
        for alias in &field.aliases {
            lookup.insert(alias.clone(), i);
        }
    }
    lookup
}

/// Represents a `field` in a `record` Avro schema.
#[derive(bon::Builder, Clone, PartialEq)]
pub struct RecordField {
    /// Name of the field.
    #[builder(into)]
    pub name: String,
    /// Documentation of the field.
    #[builder(default)]
    pub doc: Documentation,
    /// Aliases of the field's name. They have no namespace and are used only
    /// during schema resolution.
    #[builder(default)]
    pub aliases: Vec<String>,
    /// Default value of the field, pre-validated and stored in the in-memory
    /// shape the field's schema consumes. For a union field the default is
    /// already wrapped into the first branch.
    pub default: Option<types::Value>,
    /// The raw JSON form of the default, kept for schema serialization.
    pub default_json: Option<JsonValue>,
    /// Schema of the field.
    pub schema: Schema,
    /// A collection of all unknown keys in the record field.
    #[builder(default)]
    pub custom_attributes: BTreeMap<String, JsonValue>,
}

impl Debug for RecordField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("RecordField");
        debug.field("name", &self.name);
        if let Some(ref doc) = self.doc {
            debug.field("doc", doc);
        }
        if !self.aliases.is_empty() {
            debug.field("aliases", &self.aliases);
        }
        if let Some(ref default) = self.default {
            debug.field("default", default);
        }
        debug.field("schema", &self.schema);
        if !self.custom_attributes.is_empty() {
            debug.field("custom_attributes", &self.custom_attributes);
        }
        debug.finish_non_exhaustive()
    }
}

impl RecordField {
    /// Parse a `serde_json::Value` into a `RecordField`.
    pub(crate) fn parse(
        field: &Map<String, JsonValue>,
        parser: &mut Parser,
        enclosing_record: &Name,
    ) -> AvroResult<Self> {
        let name = field.name().ok_or(Details::GetNameFieldFromRecord)?;

        validate_record_field_name(&name)?;

        let ty = field.get("type").ok_or(Details::GetRecordFieldTypeField)?;
        let schema = parser.parse(ty, &enclosing_record.namespace)?;

        let default_json = field.get("default").cloned();
        let default = match default_json {
            Some(ref json) => Some(Self::parse_default_value(
                json,
                &schema,
                &name,
                enclosing_record,
                parser,
            )?),
            None => None,
        };

        let aliases = field
            .get("aliases")
            .and_then(|aliases| {
                aliases.as_array().map(|aliases| {
                    aliases
                        .iter()
                        .flat_map(|alias| alias.as_str())
                        .map(|alias| alias.to_string())
                        .collect::<Vec<String>>()
                })
            })
            .unwrap_or_default();

        Ok(RecordField {
            name,
            doc: field.doc(),
            default,
            default_json,
            aliases,
            custom_attributes: RecordField::get_field_custom_attributes(field),
            schema,
        })
    }

    /// Validate and decode a JSON default against the field schema.
    ///
    /// For a union field the JSON form is the plain encoding of the first
    /// branch; the decoded value is wrapped into that branch.
    fn parse_default_value(
        json: &JsonValue,
        field_schema: &Schema,
        field_name: &str,
        enclosing_record: &Name,
        parser: &Parser,
    ) -> AvroResult<types::Value> {
        // Defaults follow the Avro JSON encoding, where bytes and fixed data
        // are code-point strings.
        let opts = ValueReadOptions {
            coerce_buffers: true,
        };
        let namespace = enclosing_record.namespace.clone();

        match field_schema {
            Schema::Union(union_schema) => {
                let first = union_schema
                    .variants()
                    .first()
                    .ok_or(Details::EmptyUnion)?
                    .clone();
                let names = parser.get_parsed_schemas();
                types::value_from_json(json, &first, names, &namespace, &opts)
                    .map(|value| types::Value::Union(0, Box::new(value)))
                    .map_err(|_| {
                        Details::GetDefaultUnion {
                            field: field_name.to_string(),
                            kind: (&first).into(),
                        }
                        .into()
                    })
            }
            _ => {
                let names = parser.get_parsed_schemas();
                types::value_from_json(json, field_schema, names, &namespace, &opts).map_err(|_| {
                    Details::GetDefaultRecordField {
                        field: field_name.to_string(),
                        record: enclosing_record.fullname(&None),
                        value: json.clone(),
                    }
                    .into()
                })
            }
        }
    }

    fn get_field_custom_attributes(field: &Map<String, JsonValue>) -> BTreeMap<String, JsonValue> {
        let mut custom_attributes: BTreeMap<String, JsonValue> = BTreeMap::new();
        for (key, value) in field {
            match key.as_str() {
                "type" | "name" | "doc" | "default" | "aliases" => continue,
                _ => custom_attributes.insert(key.clone(), value.clone()),
            };
        }
        custom_attributes
    }

    /// Returns true if this field is nullable, meaning its schema is a union
    /// whose first branch is `Null`.
    pub fn is_nullable(&self) -> bool {
        match self.schema {
            Schema::Union(ref inner) => {
                matches!(inner.variants().first(), Some(Schema::Null))
            }
            _ => false,
        }
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;

        if let Some(ref default) = self.default_json {
            map.serialize_entry("default", default)?;
        }

        if let Some(ref doc) = self.doc {
            map.serialize_entry("doc", doc)?;
        }

        if !self.aliases.is_empty() {
            map.serialize_entry("aliases", &self.aliases)?;
        }

        for attr in &self.custom_attributes {
            map.serialize_entry(attr.0, attr.1)?;
        }

        map.end()
    }
}
