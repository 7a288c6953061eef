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

//! Random value generation, mainly useful for tests.

use crate::schema::{Name, Namespace, ResolvedSchema, Schema};
use crate::types::Value;
use crate::AvroResult;
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use std::borrow::Borrow;
use std::collections::HashMap;

/// Containers stop growing and unions prefer their null branch once the
/// generator is this deep, so recursive schemas yield finite values.
const MAX_DEPTH: usize = 16;

impl Schema {
    /// Generate a random value that is valid against this schema.
    pub fn random(&self) -> AvroResult<Value> {
        let rs = ResolvedSchema::try_from(self)?;
        let mut rng = thread_rng();
        random_internal(self, rs.get_names(), &self.namespace(), &mut rng, 0)
    }
}

fn random_string(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(0..8);
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_bytes(rng: &mut impl Rng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.r#gen()).collect()
}

fn random_internal<S: Borrow<Schema>>(
    schema: &Schema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    rng: &mut impl Rng,
    depth: usize,
) -> AvroResult<Value> {
    match schema {
        Schema::Ref { name } => {
            let fully_qualified_name = name.fully_qualified_name(enclosing_namespace);
            let resolved = names
                .get(&fully_qualified_name)
                .ok_or(crate::error::Details::SchemaResolutionError(
                    fully_qualified_name.clone(),
                ))?;
            let namespace = fully_qualified_name.namespace;
            random_internal(resolved.borrow(), names, &namespace, rng, depth)
        }
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => Ok(Value::Boolean(rng.r#gen())),
        Schema::Int => Ok(Value::Int(rng.r#gen())),
        Schema::Long => Ok(Value::Long(rng.r#gen())),
        Schema::Float => Ok(Value::Float(rng.r#gen())),
        Schema::Double => Ok(Value::Double(rng.r#gen())),
        Schema::Bytes => {
            let len = rng.gen_range(0..8);
            Ok(Value::Bytes(random_bytes(rng, len)))
        }
        Schema::String => Ok(Value::String(random_string(rng))),
        Schema::Fixed(inner) => Ok(Value::Fixed(inner.size, random_bytes(rng, inner.size))),
        Schema::Enum(inner) => {
            let i = rng.gen_range(0..inner.symbols.len());
            Ok(Value::Enum(i as u32, inner.symbols[i].clone()))
        }
        Schema::Array(inner) => {
            let len = if depth >= MAX_DEPTH {
                0
            } else {
                rng.gen_range(0..3)
            };
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(random_internal(
                    &inner.items,
                    names,
                    enclosing_namespace,
                    rng,
                    depth + 1,
                )?);
            }
            Ok(Value::Array(items))
        }
        Schema::Map(inner) => {
            let len = if depth >= MAX_DEPTH {
                0
            } else {
                rng.gen_range(0..3)
            };
            let mut items = HashMap::with_capacity(len);
            for _ in 0..len {
                items.insert(
                    random_string(rng),
                    random_internal(&inner.values, names, enclosing_namespace, rng, depth + 1)?,
                );
            }
            Ok(Value::Map(items))
        }
        Schema::Union(inner) => {
            let variants = inner.variants();
            let i = match inner.null_branch() {
                Some(null) if depth >= MAX_DEPTH => null,
                _ => rng.gen_range(0..variants.len()),
            };
            let value =
                random_internal(&variants[i], names, enclosing_namespace, rng, depth + 1)?;
            Ok(Value::Union(i as u32, Box::new(value)))
        }
        Schema::Record(inner) => {
            let record_namespace = inner
                .name
                .fully_qualified_name(enclosing_namespace)
                .namespace;
            let mut fields = Vec::with_capacity(inner.fields.len());
            for field in &inner.fields {
                fields.push((
                    field.name.clone(),
                    random_internal(&field.schema, names, &record_namespace, rng, depth + 1)?,
                ));
            }
            Ok(Value::Record(fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestResult;

    #[test]
    fn test_random_values_are_valid() -> TestResult {
        let schema = Schema::parse_str(
            r#"
        {
            "type": "record",
            "name": "Everything",
            "fields": [
                {"name": "b", "type": "boolean"},
                {"name": "i", "type": "int"},
                {"name": "s", "type": "string"},
                {"name": "data", "type": "bytes"},
                {"name": "id", "type": {"type": "fixed", "name": "Id", "size": 4}},
                {"name": "suit", "type": {"type": "enum", "name": "Suit", "symbols": ["H", "S"]}},
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "props", "type": {"type": "map", "values": "long"}},
                {"name": "maybe", "type": ["null", "double"]}
            ]
        }"#,
        )?;

        for _ in 0..20 {
            let value = schema.random()?;
            assert!(schema.is_valid(&value));
        }

        Ok(())
    }

    #[test]
    fn test_random_round_trips() -> TestResult {
        let schema = Schema::parse_str(
            r#"{"type": "array", "items": ["null", "string", "long"]}"#,
        )?;
        for _ in 0..20 {
            let value = schema.random()?;
            let buffer = schema.to_buffer(&value)?;
            assert_eq!(schema.from_buffer(&buffer)?, value);
        }

        Ok(())
    }

    #[test]
    fn test_random_terminates_on_recursive_schema() -> TestResult {
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

        for _ in 0..10 {
            let value = schema.random()?;
            assert!(schema.is_valid(&value));
        }

        Ok(())
    }
}
