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

//! In-memory representation of Avro values, with validation, deep cloning and
//! the JSON value encoding.

use crate::error::Details;
use crate::schema::{
    Name, Namespace, RecordField, RecordSchema, ResolvedSchema, Schema, SchemaKind, UnionSchema,
};
use crate::{AvroResult, Error};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use strum_macros::EnumDiscriminants;

/// Represents any valid Avro value.
///
/// Records are mappings keyed by field name; maps are mappings with string
/// keys. Unions are a discriminated sum of the branch position and the branch
/// value; the `{branchTag: value}` mapping shape of the JSON encoding is
/// materialized at the JSON boundary only.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(
    name(ValueKind),
    derive(strum::Display, Hash, Ord, PartialOrd),
    strum(serialize_all = "lowercase")
)]
pub enum Value {
    /// A `null` Avro value.
    Null,
    /// A `boolean` Avro value.
    Boolean(bool),
    /// An `int` Avro value.
    Int(i32),
    /// A `long` Avro value.
    Long(i64),
    /// A `float` Avro value.
    Float(f32),
    /// A `double` Avro value.
    Double(f64),
    /// A `bytes` Avro value.
    Bytes(Vec<u8>),
    /// A `string` Avro value.
    String(String),
    /// A `fixed` Avro value: the expected size and the bytes.
    Fixed(usize, Vec<u8>),
    /// An `enum` Avro value: the zero-based ordinal and its symbol.
    Enum(u32, String),
    /// A `union` Avro value: the zero-based branch position and the branch
    /// value.
    Union(u32, Box<Value>),
    /// An `array` Avro value.
    Array(Vec<Value>),
    /// A `map` Avro value.
    Map(HashMap<String, Value>),
    /// A `record` Avro value, keyed by field name in field order.
    Record(Vec<(String, Value)>),
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        // The common `["null", T]` shape.
        match value {
            None => Self::Union(0, Box::new(Self::Null)),
            Some(v) => Self::Union(1, Box::new(v.into())),
        }
    }
}

/// Options for reading values from their JSON encoding.
#[derive(Debug, Default, Clone)]
pub struct ValueReadOptions {
    /// Accept JSON strings (code points 0-255) and arrays of byte numbers
    /// where `bytes` or `fixed` data is expected.
    pub coerce_buffers: bool,
}

/// Options for [`Schema::clone_value`].
#[derive(Default)]
pub struct CloneOptions<'a> {
    /// Accept strings (code points 0-255) and arrays of byte-valued integers
    /// where `bytes` or `fixed` data is expected.
    pub coerce_buffers: bool,
    /// For a union schema, accept the bare value of any branch whose type
    /// unambiguously matches and wrap it into that branch. Ambiguous matches
    /// fail.
    pub wrap_unions: bool,
    /// Invoked on each record field during cloning; the return value replaces
    /// the cloned field value.
    #[allow(clippy::type_complexity)]
    pub field_hook: Option<&'a dyn Fn(&RecordField, Value, &RecordSchema) -> Value>,
}

/// A helper for building a record value against a schema.
///
/// Fields start out holding their schema default (or `Null` when there is
/// none) and are filled in by name with [`put`](Self::put) or positionally
/// with [`from_values`](Self::from_values).
#[derive(Debug, Clone)]
pub struct Record<'a> {
    /// List of fields and their values, in field order.
    pub fields: Vec<(String, Value)>,
    schema: &'a Schema,
    schema_lookup: &'a BTreeMap<String, usize>,
}

impl<'a> Record<'a> {
    /// Create a `Record` given a `Schema`.
    ///
    /// If the `Schema` is not a record variant, `None` will be returned.
    pub fn new(schema: &Schema) -> Option<Record<'_>> {
        match *schema {
            Schema::Record(RecordSchema {
                ref fields,
                ref lookup,
                ..
            }) => {
                let mut record_fields = Vec::with_capacity(fields.len());
                for field in fields {
                    let value = match field.default {
                        Some(ref default) => default.clone(),
                        None => Value::Null,
                    };
                    record_fields.push((field.name.clone(), value));
                }
                Some(Record {
                    fields: record_fields,
                    schema,
                    schema_lookup: lookup,
                })
            }
            _ => None,
        }
    }

    /// Create a `Record` from positional values matching the field order.
    pub fn from_values(
        schema: &'a Schema,
        values: impl IntoIterator<Item = Value>,
    ) -> Option<Record<'a>> {
        let mut record = Record::new(schema)?;
        for (slot, value) in record.fields.iter_mut().zip(values) {
            slot.1 = value;
        }
        Some(record)
    }

    /// Put a value for a given field name. Does nothing for unknown fields.
    pub fn put<V: Into<Value>>(&mut self, field: &str, value: V) {
        if let Some(&position) = self.schema_lookup.get(field) {
            self.fields[position].1 = value.into();
        }
    }

    /// Whether the record value is valid against its schema.
    pub fn is_valid(&self) -> bool {
        self.schema.is_valid(&Value::Record(self.fields.clone()))
    }

    /// Encode the record value to its binary form.
    pub fn to_buffer(&self) -> AvroResult<Vec<u8>> {
        self.schema.to_buffer(&Value::Record(self.fields.clone()))
    }

    /// Render the record value in the JSON value encoding.
    pub fn to_json(&self) -> AvroResult<JsonValue> {
        self.schema.value_to_json(&Value::Record(self.fields.clone()))
    }
}

impl From<Record<'_>> for Value {
    fn from(value: Record<'_>) -> Self {
        Self::Record(value.fields)
    }
}

impl Schema {
    /// Whether `value` is a valid value of this schema.
    pub fn is_valid(&self, value: &Value) -> bool {
        match ResolvedSchema::try_from(self) {
            Ok(rs) => value
                .validate_internal(self, rs.get_names(), &self.namespace())
                .is_none(),
            Err(_) => false,
        }
    }

    /// Validate `value` against this schema, reporting the first mismatch.
    pub fn validate(&self, value: &Value) -> AvroResult<()> {
        let rs = ResolvedSchema::try_from(self)?;
        match value.validate_internal(self, rs.get_names(), &self.namespace()) {
            None => Ok(()),
            Some(reason) => Err(Details::ValidationWithReason {
                value_kind: value.into(),
                schema_kind: self.into(),
                reason,
            }
            .into()),
        }
    }

    /// Parse a value of this schema from its JSON encoding.
    ///
    /// Unions are encoded as `{branchTag: value}` except for `null`, which is
    /// bare. Bytes and fixed data are strings whose code points (0-255) are
    /// the byte values; accepting those requires
    /// [`ValueReadOptions::coerce_buffers`].
    pub fn value_from_str(&self, input: &str, opts: &ValueReadOptions) -> AvroResult<Value> {
        let json = serde_json::from_str(input).map_err(Details::ParseSchemaJson)?;
        let rs = ResolvedSchema::try_from(self)?;
        value_from_json(&json, self, rs.get_names(), &self.namespace(), opts)
    }

    /// Render `value` in the JSON value encoding.
    pub fn value_to_json(&self, value: &Value) -> AvroResult<JsonValue> {
        let rs = ResolvedSchema::try_from(self)?;
        value_to_json(value, self, rs.get_names(), &self.namespace())
    }

    /// Render `value` in the JSON value encoding, as a compact string.
    pub fn value_to_string(&self, value: &Value) -> AvroResult<String> {
        let json = self.value_to_json(value)?;
        serde_json::to_string(&json).map_err(|e| Details::ParseSchemaJson(e).into())
    }

    /// Validate and deep-copy `value`.
    ///
    /// Mutating the returned value never mutates `value`. See
    /// [`CloneOptions`] for the supported coercions.
    pub fn clone_value(&self, value: &Value, opts: &CloneOptions) -> AvroResult<Value> {
        let rs = ResolvedSchema::try_from(self)?;
        clone_internal(value, self, rs.get_names(), &self.namespace(), opts)
    }
}

fn resolve_ref<'s, S: Borrow<Schema>>(
    name: &Name,
    names: &'s HashMap<Name, S>,
    enclosing_namespace: &Namespace,
) -> AvroResult<(&'s Schema, Namespace)> {
    let fully_qualified_name = name.fully_qualified_name(enclosing_namespace);
    match names.get(&fully_qualified_name) {
        Some(resolved) => {
            let namespace = fully_qualified_name.namespace;
            Ok((resolved.borrow(), namespace))
        }
        None => Err(Details::SchemaResolutionError(fully_qualified_name).into()),
    }
}

/// The canonical branch tag of a union branch: the primitive name, the fully
/// qualified name for named types, or `array`/`map`.
pub(crate) fn branch_tag(schema: &Schema, enclosing_namespace: &Namespace) -> String {
    match schema {
        Schema::Ref { name } => name.fullname(enclosing_namespace),
        named if named.is_named() => named
            .name()
            .expect("Named schemas have a name")
            .fullname(enclosing_namespace),
        Schema::Array(_) => "array".to_string(),
        Schema::Map(_) => "map".to_string(),
        other => SchemaKind::from(other).to_string(),
    }
}

impl Value {
    /// Validate the value against the schema, returning the reason of the
    /// first mismatch, or `None` when the value is valid.
    pub(crate) fn validate_internal<S: Borrow<Schema>>(
        &self,
        schema: &Schema,
        names: &HashMap<Name, S>,
        enclosing_namespace: &Namespace,
    ) -> Option<String> {
        match (self, schema) {
            (_, Schema::Ref { name }) => match resolve_ref(name, names, enclosing_namespace) {
                Ok((resolved, namespace)) => {
                    self.validate_internal(resolved, names, &namespace)
                }
                Err(e) => Some(e.to_string()),
            },
            (Value::Null, Schema::Null) => None,
            (Value::Boolean(_), Schema::Boolean) => None,
            (Value::Int(_), Schema::Int) => None,
            (Value::Long(_), Schema::Long) => None,
            (Value::Float(_), Schema::Float) => None,
            (Value::Double(_), Schema::Double) => None,
            (Value::Bytes(_), Schema::Bytes) => None,
            (Value::String(_), Schema::String) => None,
            (Value::Fixed(n, bytes), Schema::Fixed(inner)) => {
                if *n != inner.size || bytes.len() != inner.size {
                    Some(format!(
                        "The value's size ({n}) is different than the schema's size ({})",
                        inner.size
                    ))
                } else {
                    None
                }
            }
            (Value::String(s), Schema::Enum(inner)) => {
                if inner.symbols.contains(s) {
                    None
                } else {
                    Some(format!("{s} is not a symbol of the enum {}", inner.name))
                }
            }
            (Value::Enum(i, s), Schema::Enum(inner)) => match inner.symbols.get(*i as usize) {
                Some(symbol) if symbol == s => None,
                Some(symbol) => Some(format!(
                    "Symbol {s:?} does not match the expected symbol {symbol:?} at position {i}"
                )),
                None => Some(format!(
                    "Ordinal {i} is out of bounds for an enum with {} symbols",
                    inner.symbols.len()
                )),
            },
            (Value::Null, Schema::Union(inner)) => {
                if inner.is_nullable() {
                    None
                } else {
                    Some("The union has no null branch".to_string())
                }
            }
            (Value::Union(i, value), Schema::Union(inner)) => {
                match inner.variants().get(*i as usize) {
                    Some(branch) => value.validate_internal(branch, names, enclosing_namespace),
                    None => Some(format!(
                        "Branch index {i} is out of bounds for a union with {} branches",
                        inner.variants().len()
                    )),
                }
            }
            (Value::Array(items), Schema::Array(inner)) => items
                .iter()
                .find_map(|item| item.validate_internal(&inner.items, names, enclosing_namespace)),
            (Value::Map(items), Schema::Map(inner)) => items
                .values()
                .find_map(|value| value.validate_internal(&inner.values, names, enclosing_namespace)),
            (Value::Record(record_fields), Schema::Record(inner)) => {
                let record_namespace = inner
                    .name
                    .fully_qualified_name(enclosing_namespace)
                    .namespace;
                let lookup: HashMap<&str, &Value> = record_fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), value))
                    .collect();

                inner.fields.iter().find_map(|field| {
                    let value = lookup.get(field.name.as_str()).or_else(|| {
                        field
                            .aliases
                            .iter()
                            .find_map(|alias| lookup.get(alias.as_str()))
                    });
                    match value {
                        Some(value) => {
                            value.validate_internal(&field.schema, names, &record_namespace)
                        }
                        None if field.default.is_some() => None,
                        None => Some(format!("Missing field {:?} with no default", field.name)),
                    }
                })
            }
            (value, schema) => Some(format!(
                "A value of kind {} is not a {}",
                ValueKind::from(value),
                SchemaKind::from(schema)
            )),
        }
    }
}

/// Interpret a JSON string as bytes, one byte per code point.
fn string_to_bytes(s: &str) -> AvroResult<Vec<u8>> {
    s.chars()
        .map(|c| {
            u8::try_from(c as u32).map_err(|_| Error::from(Details::CodePointOutOfRange(c as u32)))
        })
        .collect()
}

/// Render bytes as a JSON string, one code point per byte.
fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn json_to_bytes(json: &JsonValue, kind: SchemaKind, opts: &ValueReadOptions) -> AvroResult<Vec<u8>> {
    if !opts.coerce_buffers {
        return Err(Details::GetValueFromJson {
            value_kind: kind,
            json: json.clone(),
        }
        .into());
    }
    match json {
        JsonValue::String(s) => string_to_bytes(s),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::from(Details::GetValueFromJson {
                            value_kind: kind,
                            json: item.clone(),
                        })
                    })
            })
            .collect(),
        _ => Err(Details::GetValueFromJson {
            value_kind: kind,
            json: json.clone(),
        }
        .into()),
    }
}

/// Build a value of `schema` from its JSON encoding.
pub(crate) fn value_from_json<S: Borrow<Schema>>(
    json: &JsonValue,
    schema: &Schema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    opts: &ValueReadOptions,
) -> AvroResult<Value> {
    let mismatch = || {
        Error::from(Details::GetValueFromJson {
            value_kind: schema.into(),
            json: json.clone(),
        })
    };

    match schema {
        Schema::Ref { name } => {
            let (resolved, namespace) = resolve_ref(name, names, enclosing_namespace)?;
            value_from_json(json, resolved, names, &namespace, opts)
        }
        Schema::Null => match json {
            JsonValue::Null => Ok(Value::Null),
            _ => Err(mismatch()),
        },
        Schema::Boolean => match json {
            JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
            _ => Err(mismatch()),
        },
        Schema::Int => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(mismatch),
        Schema::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
        Schema::Float => json
            .as_f64()
            .map(|x| Value::Float(x as f32))
            .ok_or_else(mismatch),
        Schema::Double => json.as_f64().map(Value::Double).ok_or_else(mismatch),
        Schema::Bytes => json_to_bytes(json, schema.into(), opts).map(Value::Bytes),
        Schema::String => match json {
            JsonValue::String(s) => Ok(Value::String(s.clone())),
            _ => Err(mismatch()),
        },
        Schema::Fixed(inner) => {
            let bytes = json_to_bytes(json, schema.into(), opts)?;
            if bytes.len() != inner.size {
                return Err(mismatch());
            }
            Ok(Value::Fixed(inner.size, bytes))
        }
        Schema::Enum(inner) => match json {
            JsonValue::String(s) => inner
                .symbols
                .iter()
                .position(|symbol| symbol == s)
                .map(|i| Value::Enum(i as u32, s.clone()))
                .ok_or_else(|| Details::GetEnumSymbol(s.clone()).into()),
            _ => Err(mismatch()),
        },
        Schema::Array(inner) => match json {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| value_from_json(item, &inner.items, names, enclosing_namespace, opts))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => Err(mismatch()),
        },
        Schema::Map(inner) => match json {
            JsonValue::Object(items) => items
                .iter()
                .map(|(key, value)| {
                    value_from_json(value, &inner.values, names, enclosing_namespace, opts)
                        .map(|value| (key.clone(), value))
                })
                .collect::<Result<HashMap<_, _>, _>>()
                .map(Value::Map),
            _ => Err(mismatch()),
        },
        Schema::Union(inner) => union_from_json(json, inner, names, enclosing_namespace, opts),
        Schema::Record(inner) => match json {
            JsonValue::Object(items) => {
                let record_namespace = inner
                    .name
                    .fully_qualified_name(enclosing_namespace)
                    .namespace;
                let mut fields = Vec::with_capacity(inner.fields.len());
                for field in &inner.fields {
                    let value = match items.get(&field.name) {
                        Some(json) => value_from_json(
                            json,
                            &field.schema,
                            names,
                            &record_namespace,
                            opts,
                        )?,
                        None => match field.default {
                            Some(ref default) => default.clone(),
                            None => return Err(Details::GetField(field.name.clone()).into()),
                        },
                    };
                    fields.push((field.name.clone(), value));
                }
                Ok(Value::Record(fields))
            }
            _ => Err(mismatch()),
        },
    }
}

fn union_from_json<S: Borrow<Schema>>(
    json: &JsonValue,
    union: &UnionSchema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    opts: &ValueReadOptions,
) -> AvroResult<Value> {
    match json {
        // The null branch is encoded bare.
        JsonValue::Null => match union.null_branch() {
            Some(i) => Ok(Value::Union(i as u32, Box::new(Value::Null))),
            None => Err(Details::GetValueFromJson {
                value_kind: SchemaKind::Union,
                json: json.clone(),
            }
            .into()),
        },
        JsonValue::Object(items) if items.len() == 1 => {
            let (tag, inner_json) = items.iter().next().expect("One entry is present");
            for (i, branch) in union.variants().iter().enumerate() {
                if branch_tag(branch, enclosing_namespace) == *tag {
                    let value =
                        value_from_json(inner_json, branch, names, enclosing_namespace, opts)?;
                    return Ok(Value::Union(i as u32, Box::new(value)));
                }
            }
            Err(Details::GetValueFromJson {
                value_kind: SchemaKind::Union,
                json: json.clone(),
            }
            .into())
        }
        _ => Err(Details::GetValueFromJson {
            value_kind: SchemaKind::Union,
            json: json.clone(),
        }
        .into()),
    }
}

/// Render a value of `schema` in the JSON value encoding.
pub(crate) fn value_to_json<S: Borrow<Schema>>(
    value: &Value,
    schema: &Schema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
) -> AvroResult<JsonValue> {
    let mismatch = || {
        Error::from(Details::EncodeValueAsSchemaError {
            value_kind: value.into(),
            supported_schema: vec![schema.into()],
        })
    };

    match (value, schema) {
        (_, Schema::Ref { name }) => {
            let (resolved, namespace) = resolve_ref(name, names, enclosing_namespace)?;
            value_to_json(value, resolved, names, &namespace)
        }
        (Value::Null, Schema::Null) => Ok(JsonValue::Null),
        (Value::Boolean(b), Schema::Boolean) => Ok(JsonValue::Bool(*b)),
        (Value::Int(n), Schema::Int) => Ok(JsonValue::Number((*n).into())),
        (Value::Long(n), Schema::Long) => Ok(JsonValue::Number((*n).into())),
        (Value::Float(x), Schema::Float) => Number::from_f64(*x as f64)
            .map(JsonValue::Number)
            .ok_or_else(mismatch),
        (Value::Double(x), Schema::Double) => Number::from_f64(*x)
            .map(JsonValue::Number)
            .ok_or_else(mismatch),
        (Value::Bytes(bytes), Schema::Bytes) => Ok(JsonValue::String(bytes_to_string(bytes))),
        (Value::String(s), Schema::String) => Ok(JsonValue::String(s.clone())),
        (Value::Fixed(_, bytes), Schema::Fixed(_)) => {
            Ok(JsonValue::String(bytes_to_string(bytes)))
        }
        (Value::Enum(_, s), Schema::Enum(_)) | (Value::String(s), Schema::Enum(_)) => {
            Ok(JsonValue::String(s.clone()))
        }
        (Value::Null, Schema::Union(_)) => Ok(JsonValue::Null),
        (Value::Union(i, inner), Schema::Union(union)) => {
            let branch = union
                .variants()
                .get(*i as usize)
                .ok_or_else(|| Details::GetUnionVariant {
                    index: *i as i64,
                    num_variants: union.variants().len(),
                })?;
            if let Value::Null = **inner {
                return Ok(JsonValue::Null);
            }
            let mut wrapper = JsonMap::with_capacity(1);
            wrapper.insert(
                branch_tag(branch, enclosing_namespace),
                value_to_json(inner, branch, names, enclosing_namespace)?,
            );
            Ok(JsonValue::Object(wrapper))
        }
        (Value::Array(items), Schema::Array(inner)) => items
            .iter()
            .map(|item| value_to_json(item, &inner.items, names, enclosing_namespace))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        (Value::Map(items), Schema::Map(inner)) => {
            let mut object = JsonMap::with_capacity(items.len());
            for (key, value) in items {
                object.insert(
                    key.clone(),
                    value_to_json(value, &inner.values, names, enclosing_namespace)?,
                );
            }
            Ok(JsonValue::Object(object))
        }
        (Value::Record(record_fields), Schema::Record(inner)) => {
            let record_namespace = inner
                .name
                .fully_qualified_name(enclosing_namespace)
                .namespace;
            let lookup: HashMap<&str, &Value> = record_fields
                .iter()
                .map(|(name, value)| (name.as_str(), value))
                .collect();
            let mut object = JsonMap::with_capacity(inner.fields.len());
            for field in &inner.fields {
                let value = match lookup.get(field.name.as_str()) {
                    Some(value) => (*value).clone(),
                    None => match field.default {
                        Some(ref default) => default.clone(),
                        None => return Err(Details::GetField(field.name.clone()).into()),
                    },
                };
                object.insert(
                    field.name.clone(),
                    value_to_json(&value, &field.schema, names, &record_namespace)?,
                );
            }
            Ok(JsonValue::Object(object))
        }
        _ => Err(mismatch()),
    }
}

/// Validate and deep-copy a value. See [`CloneOptions`].
pub(crate) fn clone_internal<S: Borrow<Schema>>(
    value: &Value,
    schema: &Schema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    opts: &CloneOptions,
) -> AvroResult<Value> {
    let invalid = |reason: String| {
        Error::from(Details::ValidationWithReason {
            value_kind: value.into(),
            schema_kind: schema.into(),
            reason,
        })
    };

    match (value, schema) {
        (_, Schema::Ref { name }) => {
            let (resolved, namespace) = resolve_ref(name, names, enclosing_namespace)?;
            clone_internal(value, resolved, names, &namespace, opts)
        }
        (Value::Null, Schema::Null) => Ok(Value::Null),
        (Value::Boolean(b), Schema::Boolean) => Ok(Value::Boolean(*b)),
        (Value::Int(n), Schema::Int) => Ok(Value::Int(*n)),
        (Value::Long(n), Schema::Long) => Ok(Value::Long(*n)),
        (Value::Float(x), Schema::Float) => Ok(Value::Float(*x)),
        (Value::Double(x), Schema::Double) => Ok(Value::Double(*x)),
        (Value::Bytes(bytes), Schema::Bytes) => Ok(Value::Bytes(bytes.clone())),
        (Value::String(s), Schema::String) => Ok(Value::String(s.clone())),
        (value, Schema::Bytes) => {
            coerce_buffer(value, schema, opts).map(Value::Bytes)
        }
        (Value::Fixed(n, bytes), Schema::Fixed(inner)) => {
            if *n == inner.size && bytes.len() == inner.size {
                Ok(Value::Fixed(*n, bytes.clone()))
            } else {
                Err(invalid(format!(
                    "The value's size ({n}) is different than the schema's size ({})",
                    inner.size
                )))
            }
        }
        (value, Schema::Fixed(inner)) => {
            let bytes = coerce_buffer(value, schema, opts)?;
            if bytes.len() == inner.size {
                Ok(Value::Fixed(inner.size, bytes))
            } else {
                Err(invalid(format!(
                    "The coerced value's size ({}) is different than the schema's size ({})",
                    bytes.len(),
                    inner.size
                )))
            }
        }
        (Value::Enum(i, s), Schema::Enum(inner)) => match inner.symbols.get(*i as usize) {
            Some(symbol) if symbol == s => Ok(Value::Enum(*i, s.clone())),
            _ => Err(Details::GetEnumSymbol(s.clone()).into()),
        },
        (Value::String(s), Schema::Enum(inner)) => inner
            .symbols
            .iter()
            .position(|symbol| symbol == s)
            .map(|i| Value::Enum(i as u32, s.clone()))
            .ok_or_else(|| Details::GetEnumSymbol(s.clone()).into()),
        (Value::Null, Schema::Union(union)) => match union.null_branch() {
            Some(i) => Ok(Value::Union(i as u32, Box::new(Value::Null))),
            None => Err(invalid("The union has no null branch".to_string())),
        },
        (Value::Union(i, inner), Schema::Union(union)) => {
            let branch = union
                .variants()
                .get(*i as usize)
                .ok_or_else(|| {
                    invalid(format!(
                        "Branch index {i} is out of bounds for a union with {} branches",
                        union.variants().len()
                    ))
                })?;
            clone_internal(inner, branch, names, enclosing_namespace, opts)
                .map(|cloned| Value::Union(*i, Box::new(cloned)))
        }
        (value, Schema::Union(union)) if opts.wrap_unions => {
            wrap_union(value, union, names, enclosing_namespace, opts)
        }
        (Value::Array(items), Schema::Array(inner)) => items
            .iter()
            .map(|item| clone_internal(item, &inner.items, names, enclosing_namespace, opts))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Value::Map(items), Schema::Map(inner)) => items
            .iter()
            .map(|(key, value)| {
                clone_internal(value, &inner.values, names, enclosing_namespace, opts)
                    .map(|value| (key.clone(), value))
            })
            .collect::<Result<HashMap<_, _>, _>>()
            .map(Value::Map),
        (Value::Record(record_fields), Schema::Record(inner)) => {
            let record_namespace = inner
                .name
                .fully_qualified_name(enclosing_namespace)
                .namespace;
            let lookup: HashMap<&str, &Value> = record_fields
                .iter()
                .map(|(name, value)| (name.as_str(), value))
                .collect();

            let mut fields = Vec::with_capacity(inner.fields.len());
            for field in &inner.fields {
                let found = lookup.get(field.name.as_str()).or_else(|| {
                    field
                        .aliases
                        .iter()
                        .find_map(|alias| lookup.get(alias.as_str()))
                });
                let cloned = match found {
                    Some(value) => {
                        clone_internal(value, &field.schema, names, &record_namespace, opts)?
                    }
                    None => match field.default {
                        Some(ref default) => default.clone(),
                        None => return Err(Details::GetField(field.name.clone()).into()),
                    },
                };
                let cloned = match opts.field_hook {
                    Some(hook) => hook(field, cloned, inner),
                    None => cloned,
                };
                fields.push((field.name.clone(), cloned));
            }
            Ok(Value::Record(fields))
        }
        (value, schema) => Err(invalid(format!(
            "A value of kind {} is not a {}",
            ValueKind::from(value),
            SchemaKind::from(schema)
        ))),
    }
}

/// Coerce a string or array-of-bytes value into raw bytes, when enabled.
fn coerce_buffer(value: &Value, schema: &Schema, opts: &CloneOptions) -> AvroResult<Vec<u8>> {
    let unsupported = || {
        Error::from(Details::EncodeValueAsSchemaError {
            value_kind: value.into(),
            supported_schema: vec![schema.into()],
        })
    };

    if !opts.coerce_buffers {
        return Err(unsupported());
    }
    match value {
        Value::String(s) => string_to_bytes(s),
        Value::Bytes(bytes) | Value::Fixed(_, bytes) => Ok(bytes.clone()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Int(n) => u8::try_from(*n)
                    .map_err(|_| Error::from(Details::CodePointOutOfRange(*n as u32))),
                Value::Long(n) => u8::try_from(*n)
                    .map_err(|_| Error::from(Details::CodePointOutOfRange(*n as u32))),
                _ => Err(unsupported()),
            })
            .collect(),
        _ => Err(unsupported()),
    }
}

/// Wrap a bare value into the single union branch it unambiguously matches.
fn wrap_union<S: Borrow<Schema>>(
    value: &Value,
    union: &UnionSchema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    opts: &CloneOptions,
) -> AvroResult<Value> {
    let inner_opts = CloneOptions {
        coerce_buffers: opts.coerce_buffers,
        wrap_unions: false,
        field_hook: None,
    };

    let mut matched: Option<(usize, Value)> = None;
    for (i, branch) in union.variants().iter().enumerate() {
        if let Ok(cloned) = clone_internal(value, branch, names, enclosing_namespace, &inner_opts) {
            if matched.is_some() {
                return Err(Details::ValidationWithReason {
                    value_kind: value.into(),
                    schema_kind: SchemaKind::Union,
                    reason: "The bare value matches more than one union branch".to_string(),
                }
                .into());
            }
            matched = Some((i, cloned));
        }
    }

    match matched {
        Some((i, cloned)) => Ok(Value::Union(i as u32, Box::new(cloned))),
        None => Err(Details::ValidationWithReason {
            value_kind: value.into(),
            schema_kind: SchemaKind::Union,
            reason: "The bare value matches no union branch".to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestResult;
    use pretty_assertions::assert_eq;

    fn person_schema() -> Schema {
        Schema::parse_str(
            r#"
        {
            "type": "record",
            "name": "Person",
            "fields": [
                {"name": "age", "type": "int", "default": 25},
                {"name": "name", "type": "string"}
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_primitives() -> TestResult {
        assert!(Schema::Null.is_valid(&Value::Null));
        assert!(Schema::Boolean.is_valid(&Value::Boolean(true)));
        assert!(Schema::Int.is_valid(&Value::Int(42)));
        assert!(Schema::Long.is_valid(&Value::Long(i64::MAX)));
        assert!(Schema::String.is_valid(&Value::String("hi".into())));
        assert!(!Schema::Int.is_valid(&Value::Long(42)));
        assert!(!Schema::Bytes.is_valid(&Value::String("hi".into())));

        Ok(())
    }

    #[test]
    fn test_validate_record_with_default() -> TestResult {
        let schema = person_schema();
        let missing_age = Value::Record(vec![("name".into(), Value::String("ann".into()))]);
        assert!(schema.is_valid(&missing_age));

        let missing_name = Value::Record(vec![("age".into(), Value::Int(30))]);
        assert!(!schema.is_valid(&missing_name));

        Ok(())
    }

    #[test]
    fn test_union_validation() -> TestResult {
        let schema = Schema::union(vec![Schema::Null, Schema::Int])?;
        assert!(schema.is_valid(&Value::Null));
        assert!(schema.is_valid(&Value::Union(1, Box::new(Value::Int(3)))));
        assert!(!schema.is_valid(&Value::Union(1, Box::new(Value::String("x".into())))));
        assert!(!schema.is_valid(&Value::Union(9, Box::new(Value::Int(3)))));

        Ok(())
    }

    #[test]
    fn test_value_from_str_union_wrapping() -> TestResult {
        let schema = Schema::union(vec![Schema::Null, Schema::Int])?;
        let opts = ValueReadOptions::default();
        assert_eq!(
            schema.value_from_str("null", &opts)?,
            Value::Union(0, Box::new(Value::Null))
        );
        assert_eq!(
            schema.value_from_str(r#"{"int": 3}"#, &opts)?,
            Value::Union(1, Box::new(Value::Int(3)))
        );
        assert!(schema.value_from_str(r#"{"long": 3}"#, &opts).is_err());

        Ok(())
    }

    #[test]
    fn test_json_round_trip_with_bytes() -> TestResult {
        let schema = Schema::parse_str(
            r#"
        {
            "type": "record",
            "name": "Blob",
            "fields": [{"name": "data", "type": "bytes"}]
        }"#,
        )?;
        let value = Value::Record(vec![("data".into(), Value::Bytes(vec![0, 104, 105, 255]))]);
        let text = schema.value_to_string(&value)?;
        let opts = ValueReadOptions {
            coerce_buffers: true,
        };
        assert_eq!(schema.value_from_str(&text, &opts)?, value);

        Ok(())
    }

    #[test]
    fn test_clone_is_deep() -> TestResult {
        let schema = Schema::array(Schema::Bytes);
        let value = Value::Array(vec![Value::Bytes(vec![1, 2, 3])]);
        let mut cloned = schema.clone_value(&value, &CloneOptions::default())?;
        assert_eq!(cloned, value);

        if let Value::Array(ref mut items) = cloned {
            items.push(Value::Bytes(vec![4]));
        }
        assert_eq!(value, Value::Array(vec![Value::Bytes(vec![1, 2, 3])]));

        Ok(())
    }

    #[test]
    fn test_clone_coerce_buffers() -> TestResult {
        let opts = CloneOptions {
            coerce_buffers: true,
            ..CloneOptions::default()
        };
        assert_eq!(
            Schema::Bytes.clone_value(&Value::String("hi!".into()), &opts)?,
            Value::Bytes(vec![0x68, 0x69, 0x21])
        );
        assert!(
            Schema::Bytes
                .clone_value(&Value::String("hi!".into()), &CloneOptions::default())
                .is_err()
        );

        Ok(())
    }

    #[test]
    fn test_clone_wrap_unions() -> TestResult {
        let schema = Schema::union(vec![Schema::Null, Schema::Int])?;
        let opts = CloneOptions {
            wrap_unions: true,
            ..CloneOptions::default()
        };
        assert_eq!(
            schema.clone_value(&Value::Int(3), &opts)?,
            Value::Union(1, Box::new(Value::Int(3)))
        );

        // A bare value matching no branch fails.
        assert!(schema.clone_value(&Value::String("x".into()), &opts).is_err());

        Ok(())
    }

    #[test]
    fn test_clone_field_hook() -> TestResult {
        let schema = person_schema();
        let value = Value::Record(vec![
            ("age".into(), Value::Int(30)),
            ("name".into(), Value::String("ann".into())),
        ]);
        let hook = |field: &RecordField, value: Value, _record: &RecordSchema| {
            if field.name == "age" { Value::Int(99) } else { value }
        };
        let opts = CloneOptions {
            field_hook: Some(&hook),
            ..CloneOptions::default()
        };
        let cloned = schema.clone_value(&value, &opts)?;
        assert_eq!(
            cloned,
            Value::Record(vec![
                ("age".into(), Value::Int(99)),
                ("name".into(), Value::String("ann".into())),
            ])
        );

        Ok(())
    }

    #[test]
    fn test_record_builder() -> TestResult {
        let schema = person_schema();
        let mut record = Record::new(&schema).expect("A record schema");
        record.put("name", "bob");
        assert!(record.is_valid());

        let value: Value = record.into();
        assert_eq!(
            value,
            Value::Record(vec![
                ("age".into(), Value::Int(25)),
                ("name".into(), Value::String("bob".into())),
            ])
        );

        Ok(())
    }
}
