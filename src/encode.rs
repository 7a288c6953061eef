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

//! Binary encoding of values.

use crate::error::Details;
use crate::schema::{
    EnumSchema, Name, Namespace, RecordSchema, ResolvedSchema, Schema, SchemaKind,
};
use crate::tap::WriteTap;
use crate::types::Value;
use crate::{AvroResult, Error};
use log::error;
use std::borrow::Borrow;
use std::collections::HashMap;

impl Schema {
    /// Encode `value` into its binary form.
    ///
    /// The value is validated first; an invalid value fails before anything
    /// is written. The returned buffer is always a fully encoded value.
    pub fn to_buffer(&self, value: &Value) -> AvroResult<Vec<u8>> {
        self.validate(value)?;
        self.to_buffer_lax(value)
    }

    /// Encode `value` into its binary form without validating it first.
    ///
    /// Encoding writes whatever it can and only fails on data it cannot
    /// express at all (for example a value of the wrong kind).
    pub fn to_buffer_lax(&self, value: &Value) -> AvroResult<Vec<u8>> {
        let rs = ResolvedSchema::try_from(self)?;
        let mut tap = WriteTap::new();
        encode_internal(value, self, rs.get_names(), &self.namespace(), &mut tap)?;
        Ok(tap.into_vec())
    }
}

pub(crate) fn encode_internal<S: Borrow<Schema>>(
    value: &Value,
    schema: &Schema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    tap: &mut WriteTap,
) -> AvroResult<()> {
    if let Schema::Ref { name } = schema {
        let fully_qualified_name = name.fully_qualified_name(enclosing_namespace);
        let resolved = names
            .get(&fully_qualified_name)
            .ok_or(Details::SchemaResolutionError(fully_qualified_name.clone()))?;
        let namespace = fully_qualified_name.namespace;
        return encode_internal(value, resolved.borrow(), names, &namespace, tap);
    }

    let unsupported = |supported: Vec<SchemaKind>| {
        Error::from(Details::EncodeValueAsSchemaError {
            value_kind: value.into(),
            supported_schema: supported,
        })
    };

    match value {
        Value::Null => {
            if let Schema::Union(union) = schema {
                match union.null_branch() {
                    Some(p) => tap.write_long(p as i64),
                    None => return Err(unsupported(vec![SchemaKind::Null, SchemaKind::Union])),
                }
            }
            Ok(())
        }
        Value::Boolean(b) => {
            tap.write_boolean(*b);
            Ok(())
        }
        Value::Int(i) => {
            tap.write_int(*i);
            Ok(())
        }
        Value::Long(i) => {
            tap.write_long(*i);
            Ok(())
        }
        Value::Float(x) => {
            tap.write_float(*x);
            Ok(())
        }
        Value::Double(x) => {
            tap.write_double(*x);
            Ok(())
        }
        Value::Bytes(bytes) => match *schema {
            Schema::Bytes => {
                tap.write_bytes(bytes);
                Ok(())
            }
            Schema::Fixed { .. } => {
                tap.write_fixed(bytes);
                Ok(())
            }
            _ => Err(unsupported(vec![SchemaKind::Bytes, SchemaKind::Fixed])),
        },
        Value::String(s) => match *schema {
            Schema::String => {
                tap.write_str(s);
                Ok(())
            }
            Schema::Enum(EnumSchema { ref symbols, .. }) => {
                if let Some(index) = symbols.iter().position(|item| item == s) {
                    tap.write_int(index as i32);
                    Ok(())
                } else {
                    error!("Invalid symbol string {:?}.", &s[..]);
                    Err(Details::GetEnumSymbol(s.clone()).into())
                }
            }
            _ => Err(unsupported(vec![SchemaKind::String, SchemaKind::Enum])),
        },
        Value::Fixed(_, bytes) => {
            tap.write_fixed(bytes);
            Ok(())
        }
        Value::Enum(i, _) => {
            tap.write_int(*i as i32);
            Ok(())
        }
        Value::Union(idx, item) => {
            if let Schema::Union(ref inner) = *schema {
                let inner_schema = inner.variants().get(*idx as usize).ok_or(
                    Details::GetUnionVariant {
                        index: *idx as i64,
                        num_variants: inner.variants().len(),
                    },
                )?;
                tap.write_long(*idx as i64);
                encode_internal(item, inner_schema, names, enclosing_namespace, tap)
            } else {
                error!("invalid schema type for Union: {schema:?}");
                Err(unsupported(vec![SchemaKind::Union]))
            }
        }
        Value::Array(items) => {
            if let Schema::Array(ref inner) = *schema {
                if !items.is_empty() {
                    tap.write_long(items.len() as i64);
                    for item in items.iter() {
                        encode_internal(item, &inner.items, names, enclosing_namespace, tap)?;
                    }
                }
                tap.write_long(0);
                Ok(())
            } else {
                error!("invalid schema type for Array: {schema:?}");
                Err(unsupported(vec![SchemaKind::Array]))
            }
        }
        Value::Map(items) => {
            if let Schema::Map(ref inner) = *schema {
                if !items.is_empty() {
                    tap.write_long(items.len() as i64);
                    for (key, value) in items {
                        tap.write_str(key);
                        encode_internal(value, &inner.values, names, enclosing_namespace, tap)?;
                    }
                }
                tap.write_long(0);
                Ok(())
            } else {
                error!("invalid schema type for Map: {schema:?}");
                Err(unsupported(vec![SchemaKind::Map]))
            }
        }
        Value::Record(value_fields) => {
            if let Schema::Record(RecordSchema {
                ref name,
                fields: ref schema_fields,
                ..
            }) = *schema
            {
                let record_namespace = name.fully_qualified_name(enclosing_namespace).namespace;

                let mut lookup = HashMap::with_capacity(value_fields.len());
                value_fields.iter().for_each(|(name, field)| {
                    lookup.insert(name.as_str(), field);
                });

                for schema_field in schema_fields.iter() {
                    let value_opt = lookup.get(schema_field.name.as_str()).copied().or_else(|| {
                        schema_field
                            .aliases
                            .iter()
                            .find_map(|alias| lookup.get(alias.as_str()).copied())
                    });

                    // A field missing from the value falls back to the
                    // field's parse-time default.
                    match (value_opt, &schema_field.default) {
                        (Some(value), _) => encode_internal(
                            value,
                            &schema_field.schema,
                            names,
                            &record_namespace,
                            tap,
                        )?,
                        (None, Some(default)) => encode_internal(
                            default,
                            &schema_field.schema,
                            names,
                            &record_namespace,
                            tap,
                        )?,
                        (None, None) => {
                            return Err(Details::GetField(schema_field.name.clone()).into());
                        }
                    }
                }
                Ok(())
            } else {
                error!("invalid schema type for Record: {schema:?}");
                Err(unsupported(vec![SchemaKind::Record]))
            }
        }
    }
}
