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

//! Logic for parsing and interacting with schemas in Avro format.

mod name;
mod parser;
mod record;
mod resolve;
mod union;

pub(crate) use crate::schema::parser::Parser;
pub use crate::schema::{
    name::{Alias, Aliases, Documentation, Name, Names, NamesRef, Namespace},
    parser::{ParserConfig, TypeHook},
    record::{RecordField, RecordFieldBuilder, RecordSchema, RecordSchemaBuilder},
    resolve::ResolvedSchema,
    union::UnionSchema,
};
use crate::{AvroResult, error::Details};
use digest::Digest;
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use serde_json::{Map, Value as JsonValue};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};
use strum::{Display, EnumDiscriminants};

/// Represents an Avro schema fingerprint.
pub struct SchemaFingerprint {
    pub bytes: Vec<u8>,
}

impl fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in &self.bytes {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Represents any valid Avro schema.
///
/// A schema is parsed once (see [`Schema::parse_str`]) and immutable
/// afterwards. Named types are always stored with their fully qualified name;
/// repeated references to a named type appear as [`Schema::Ref`] nodes, so a
/// record may be recursive.
#[derive(Clone, Debug, EnumDiscriminants)]
#[strum_discriminants(
    name(SchemaKind),
    derive(Display, Hash, Ord, PartialOrd),
    strum(serialize_all = "lowercase")
)]
pub enum Schema {
    /// A `null` Avro schema.
    Null,
    /// A `boolean` Avro schema.
    Boolean,
    /// An `int` Avro schema.
    Int,
    /// A `long` Avro schema.
    Long,
    /// A `float` Avro schema.
    Float,
    /// A `double` Avro schema.
    Double,
    /// A `bytes` Avro schema.
    ///
    /// `Bytes` represents a sequence of 8-bit unsigned bytes.
    Bytes,
    /// A `string` Avro schema.
    ///
    /// `String` represents a unicode character sequence.
    String,
    /// An `array` Avro schema.
    ///
    /// All items have the same schema.
    Array(ArraySchema),
    /// A `map` Avro schema.
    ///
    /// Keys are always strings and all values have the same schema.
    Map(MapSchema),
    /// A `union` Avro schema.
    Union(UnionSchema),
    /// A `record` Avro schema.
    Record(RecordSchema),
    /// An `enum` Avro schema.
    Enum(EnumSchema),
    /// A `fixed` Avro schema.
    Fixed(FixedSchema),
    /// A reference to another named schema.
    Ref { name: Name },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArraySchema {
    pub items: Box<Schema>,
    pub attributes: BTreeMap<String, JsonValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapSchema {
    pub values: Box<Schema>,
    pub attributes: BTreeMap<String, JsonValue>,
}

/// A description of an Enum schema.
#[derive(bon::Builder, Debug, Clone)]
pub struct EnumSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    #[builder(default)]
    pub aliases: Aliases,
    /// The documentation of the schema
    #[builder(default)]
    pub doc: Documentation,
    /// The ordered set of symbols of the schema
    pub symbols: Vec<String>,
    /// An optional default symbol used for compatibility
    pub default: Option<String>,
    /// The custom attributes of the schema
    #[builder(default)]
    pub attributes: BTreeMap<String, JsonValue>,
}

/// A description of a Fixed schema.
#[derive(bon::Builder, Debug, Clone)]
pub struct FixedSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    #[builder(default)]
    pub aliases: Aliases,
    /// The documentation of the schema
    #[builder(default)]
    pub doc: Documentation,
    /// The size of the fixed schema
    pub size: usize,
    /// The custom attributes of the schema
    #[builder(default)]
    pub attributes: BTreeMap<String, JsonValue>,
}

impl FixedSchema {
    fn serialize_to_map<S>(&self, mut map: S::SerializeMap) -> Result<S::SerializeMap, S::Error>
    where
        S: Serializer,
    {
        map.serialize_entry("type", "fixed")?;
        if let Some(ref n) = self.name.namespace {
            map.serialize_entry("namespace", n)?;
        }
        map.serialize_entry("name", &self.name.name)?;
        if let Some(ref docstr) = self.doc {
            map.serialize_entry("doc", docstr)?;
        }
        map.serialize_entry("size", &self.size)?;

        if let Some(ref aliases) = self.aliases {
            map.serialize_entry("aliases", aliases)?;
        }

        for attr in &self.attributes {
            map.serialize_entry(attr.0, attr.1)?;
        }

        Ok(map)
    }
}

impl SchemaKind {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Double
                | SchemaKind::Float
                | SchemaKind::Bytes
                | SchemaKind::String,
        )
    }
}

impl PartialEq for Schema {
    /// Assess equality of two `Schema` based on their canonical form.
    fn eq(&self, other: &Self) -> bool {
        self.canonical_form() == other.canonical_form()
    }
}

impl Schema {
    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub fn parse_str(input: &str) -> AvroResult<Schema> {
        let mut parser = Parser::default();
        parser.parse_str(input)
    }

    /// Create a `Schema` from a string representing a JSON Avro schema, with
    /// a custom parser configuration (initial namespace, type hook).
    pub fn parse_str_with(input: &str, config: ParserConfig) -> AvroResult<Schema> {
        let mut parser = Parser::with_config(config);
        parser.parse_str(input)
    }

    /// Create an array of `Schema`s from a list of named JSON Avro schemas
    /// (record, enum, and fixed).
    ///
    /// It is allowed that the schemas have cross-dependencies; these will be
    /// resolved during parsing.
    ///
    /// If two of the input schemas have the same fullname, an error is
    /// returned.
    pub fn parse_list(input: impl IntoIterator<Item = impl AsRef<str>>) -> AvroResult<Vec<Schema>> {
        let input = input.into_iter();
        let input_len = input.size_hint().0;
        let mut input_schemas: HashMap<Name, JsonValue> = HashMap::with_capacity(input_len);
        let mut input_order: Vec<Name> = Vec::with_capacity(input_len);
        for json in input {
            let json = json.as_ref();
            let schema: JsonValue = serde_json::from_str(json).map_err(Details::ParseSchemaJson)?;
            if let JsonValue::Object(inner) = &schema {
                let name = Name::parse(inner, &None)?;
                let previous_value = input_schemas.insert(name.clone(), schema);
                if previous_value.is_some() {
                    return Err(Details::NameCollision(name.fullname(&None)).into());
                }
                input_order.push(name);
            } else {
                return Err(Details::GetNameField.into());
            }
        }
        let mut parser = Parser::new(
            input_schemas,
            input_order,
            HashMap::with_capacity(input_len),
        );
        parser.parse_list()
    }

    /// Parses an Avro schema from JSON.
    pub fn parse(value: &JsonValue) -> AvroResult<Schema> {
        let mut parser = Parser::default();
        parser.parse(value, &None)
    }

    /// An `array` schema with the given items schema.
    pub fn array(items: Schema) -> Schema {
        Schema::Array(ArraySchema {
            items: Box::new(items),
            attributes: BTreeMap::new(),
        })
    }

    /// A `map` schema with the given values schema.
    pub fn map(values: Schema) -> Schema {
        Schema::Map(MapSchema {
            values: Box::new(values),
            attributes: BTreeMap::new(),
        })
    }

    /// A `union` schema with the given branches.
    pub fn union(branches: Vec<Schema>) -> AvroResult<Schema> {
        Ok(Schema::Union(UnionSchema::new(branches)?))
    }

    /// Returns whether the schema represents a named type.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            Schema::Ref { .. } | Schema::Record(_) | Schema::Enum(_) | Schema::Fixed(_)
        )
    }

    /// Returns the name of the schema, if it has one.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Ref { name, .. }
            | Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// Returns the namespace of the schema, if it has one.
    pub fn namespace(&self) -> Namespace {
        self.name().and_then(|n| n.namespace.clone())
    }

    /// Returns the aliases of the schema, if it has any.
    pub fn aliases(&self) -> Option<&Vec<Alias>> {
        match self {
            Schema::Record(RecordSchema { aliases, .. })
            | Schema::Enum(EnumSchema { aliases, .. })
            | Schema::Fixed(FixedSchema { aliases, .. }) => aliases.as_ref(),
            _ => None,
        }
    }

    /// Returns the doc of the schema, if it has one.
    pub fn doc(&self) -> Option<&String> {
        match self {
            Schema::Record(RecordSchema { doc, .. })
            | Schema::Enum(EnumSchema { doc, .. })
            | Schema::Fixed(FixedSchema { doc, .. }) => doc.as_ref(),
            _ => None,
        }
    }

    /// Returns the custom attributes (metadata) if the schema supports them.
    pub fn custom_attributes(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            Schema::Record(RecordSchema { attributes, .. })
            | Schema::Enum(EnumSchema { attributes, .. })
            | Schema::Fixed(FixedSchema { attributes, .. })
            | Schema::Array(ArraySchema { attributes, .. })
            | Schema::Map(MapSchema { attributes, .. }) => Some(attributes),
            _ => None,
        }
    }

    /// Converts `self` into its canonical form: a whitespace-free JSON
    /// rendering with a fixed key order, fully qualified names, primitives in
    /// bare string form, and `doc`, `aliases`, default values and custom
    /// attributes removed.
    pub fn canonical_form(&self) -> String {
        let json = serde_json::to_value(self)
            .unwrap_or_else(|e| panic!("Cannot serialize Schema to JSON: {e}"));
        let mut defined_names = HashSet::new();
        parsing_canonical_form(&json, &mut defined_names)
    }

    /// Generate the fingerprint of the schema's canonical form.
    ///
    /// # Example
    /// ```
    /// use avrolite::Schema;
    /// use md5::Md5;
    /// use sha2::Sha256;
    ///
    /// # fn main() -> Result<(), avrolite::Error> {
    /// let schema = Schema::parse_str(r#"{"type": "fixed", "name": "Id", "size": 4}"#)?;
    /// println!("{}", schema.fingerprint::<Md5>());
    /// println!("{}", schema.fingerprint::<Sha256>());
    /// # Ok(())
    /// # }
    /// ```
    pub fn fingerprint<D: Digest>(&self) -> SchemaFingerprint {
        let mut d = D::new();
        d.update(self.canonical_form());
        SchemaFingerprint {
            bytes: d.finalize().to_vec(),
        }
    }

    /// Generate the fingerprint of the schema's canonical form with the
    /// default (MD5) algorithm.
    pub fn md5_fingerprint(&self) -> SchemaFingerprint {
        self.fingerprint::<md5::Md5>()
    }
}

/// The canonical form is also the schema's display form.
impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_form())
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self {
            Schema::Ref { name } => serializer.serialize_str(&name.fullname(&None)),
            Schema::Null => serializer.serialize_str("null"),
            Schema::Boolean => serializer.serialize_str("boolean"),
            Schema::Int => serializer.serialize_str("int"),
            Schema::Long => serializer.serialize_str("long"),
            Schema::Float => serializer.serialize_str("float"),
            Schema::Double => serializer.serialize_str("double"),
            Schema::Bytes => serializer.serialize_str("bytes"),
            Schema::String => serializer.serialize_str("string"),
            Schema::Array(ArraySchema { items, attributes }) => {
                let mut map = serializer.serialize_map(Some(2 + attributes.len()))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
                for (key, value) in attributes {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Schema::Map(MapSchema { values, attributes }) => {
                let mut map = serializer.serialize_map(Some(2 + attributes.len()))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", values)?;
                for (key, value) in attributes {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Schema::Union(inner) => {
                let variants = inner.variants();
                let mut seq = serializer.serialize_seq(Some(variants.len()))?;
                for v in variants {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Schema::Record(RecordSchema {
                name,
                aliases,
                doc,
                fields,
                attributes,
                lookup: _lookup,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "record")?;
                if let Some(ref n) = name.namespace {
                    map.serialize_entry("namespace", n)?;
                }
                map.serialize_entry("name", &name.name)?;
                if let Some(docstr) = doc {
                    map.serialize_entry("doc", docstr)?;
                }
                if let Some(aliases) = aliases {
                    map.serialize_entry("aliases", aliases)?;
                }
                map.serialize_entry("fields", fields)?;
                for attr in attributes {
                    map.serialize_entry(attr.0, attr.1)?;
                }
                map.end()
            }
            Schema::Enum(EnumSchema {
                name,
                symbols,
                aliases,
                attributes,
                default,
                doc,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "enum")?;
                if let Some(ref n) = name.namespace {
                    map.serialize_entry("namespace", n)?;
                }
                map.serialize_entry("name", &name.name)?;
                map.serialize_entry("symbols", symbols)?;

                if let Some(aliases) = aliases {
                    map.serialize_entry("aliases", aliases)?;
                }
                if let Some(default) = default {
                    map.serialize_entry("default", default)?;
                }
                if let Some(doc) = doc {
                    map.serialize_entry("doc", doc)?;
                }
                for attr in attributes {
                    map.serialize_entry(attr.0, attr.1)?;
                }
                map.end()
            }
            Schema::Fixed(fixed_schema) => {
                let mut map = serializer.serialize_map(None)?;
                map = fixed_schema.serialize_to_map::<S>(map)?;
                map.end()
            }
        }
    }
}

/// Renders a valid Avro schema into its canonical form.
fn parsing_canonical_form(schema: &JsonValue, defined_names: &mut HashSet<String>) -> String {
    match schema {
        JsonValue::Object(map) => pcf_map(map, defined_names),
        JsonValue::String(s) => pcf_string(s),
        JsonValue::Array(v) => pcf_array(v, defined_names),
        json => panic!("got invalid JSON value for canonical form of schema: {json}"),
    }
}

fn pcf_map(schema: &Map<String, JsonValue>, defined_names: &mut HashSet<String>) -> String {
    let typ = schema.get("type").and_then(|v| v.as_str());
    let name = if is_named_type(typ) {
        let ns = schema.get("namespace").and_then(|v| v.as_str());
        let raw_name = schema.get("name").and_then(|v| v.as_str());
        Some(format!(
            "{}{}",
            ns.map_or("".to_string(), |n| { format!("{n}.") }),
            raw_name.unwrap_or_default()
        ))
    } else {
        None
    };

    // If this is already a defined type, early return with its name.
    if let Some(ref n) = name {
        if defined_names.contains(n) {
            return pcf_string(n);
        } else {
            defined_names.insert(n.clone());
        }
    }

    let mut fields = Vec::new();
    for (k, v) in schema {
        // Reduce primitive types to their simple form. ([PRIMITIVE] rule)
        if schema.len() == 1 && k == "type" {
            // Invariant: function is only callable from a valid schema, so this is acceptable.
            if let JsonValue::String(s) = v {
                return pcf_string(s);
            }
        }

        // Strip out unused fields ([STRIP] rule)
        if field_ordering_position(k).is_none()
            || k == "default"
            || k == "doc"
            || k == "aliases"
        {
            continue;
        }

        // Fully qualify the name, if it isn't already ([FULLNAMES] rule).
        if k == "name"
            && let Some(ref n) = name
        {
            fields.push(("name", format!("{}:{}", pcf_string(k), pcf_string(n))));
            continue;
        }

        // Strip off quotes surrounding "size" type, if they exist ([INTEGERS] rule).
        if k == "size" {
            let i = match v.as_str() {
                Some(s) => s.parse::<i64>().expect("Only valid schemas are accepted!"),
                None => v.as_i64().unwrap(),
            };
            fields.push((k, format!("{}:{}", pcf_string(k), i)));
            continue;
        }

        // For anything else, recursively process the result.
        fields.push((
            k,
            format!(
                "{}:{}",
                pcf_string(k),
                parsing_canonical_form(v, defined_names)
            ),
        ));
    }

    // Sort the fields by their canonical ordering ([ORDER] rule).
    fields.sort_unstable_by_key(|(k, _)| field_ordering_position(k).unwrap());
    let inter = fields
        .into_iter()
        .map(|(_, v)| v)
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{inter}}}")
}

fn is_named_type(typ: Option<&str>) -> bool {
    matches!(typ, Some("record") | Some("enum") | Some("fixed"))
}

fn pcf_array(arr: &[JsonValue], defined_names: &mut HashSet<String>) -> String {
    let inter = arr
        .iter()
        .map(|a| parsing_canonical_form(a, defined_names))
        .collect::<Vec<String>>()
        .join(",");
    format!("[{inter}]")
}

fn pcf_string(s: &str) -> String {
    format!(r#""{s}""#)
}

/// The canonical key order: `name, type, fields, symbols, items, values,
/// size`. Every other key is dropped from the canonical form.
const RESERVED_FIELDS: &[&str] = &[
    "name", "type", "fields", "symbols", "items", "values", "size",
];

// Used to define the ordering and inclusion of fields.
fn field_ordering_position(field: &str) -> Option<usize> {
    RESERVED_FIELDS
        .iter()
        .position(|&f| f == field)
        .map(|pos| pos + 1)
}
