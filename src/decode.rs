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

//! Binary decoding of values, and skipping over encoded values without
//! materializing them.

use crate::error::Details;
use crate::resolver::Resolver;
use crate::schema::{Name, Namespace, ResolvedSchema, Schema};
use crate::tap::ReadTap;
use crate::types::Value;
use crate::util::safe_len;
use crate::AvroResult;
use std::borrow::Borrow;
use std::collections::HashMap;

impl Schema {
    /// Decode one value of this schema from `bytes`.
    ///
    /// The whole buffer must be consumed; trailing bytes are an error. Use
    /// [`decode_from`](Self::decode_from) to decode from a tap when trailing
    /// data is expected.
    pub fn from_buffer(&self, bytes: &[u8]) -> AvroResult<Value> {
        let mut tap = ReadTap::new(bytes);
        let value = self.decode_from(&mut tap, None)?;
        if !tap.is_at_end() {
            return Err(Details::TrailingBytes(tap.remaining()).into());
        }
        Ok(value)
    }

    /// Decode one value encoded with a *writer* schema, projecting it into
    /// this (reader) schema through `resolver`.
    ///
    /// The resolver must have been produced by
    /// [`create_resolver`](Self::create_resolver) on this same schema.
    pub fn from_buffer_resolved(&self, bytes: &[u8], resolver: &Resolver) -> AvroResult<Value> {
        let mut tap = ReadTap::new(bytes);
        let value = self.decode_from(&mut tap, Some(resolver))?;
        if !tap.is_at_end() {
            return Err(Details::TrailingBytes(tap.remaining()).into());
        }
        Ok(value)
    }

    /// Decode one value from `tap`, leaving the tap positioned after it.
    ///
    /// Trailing data is the caller's business; this is the entry point for
    /// buffers that hold more than one value.
    pub fn decode_from(&self, tap: &mut ReadTap, resolver: Option<&Resolver>) -> AvroResult<Value> {
        match resolver {
            Some(resolver) => {
                if !resolver.is_for_reader(self) {
                    return Err(Details::ResolverMismatch.into());
                }
                resolver.decode(tap)
            }
            None => {
                let rs = ResolvedSchema::try_from(self)?;
                decode_internal(self, rs.get_names(), &self.namespace(), tap)
            }
        }
    }

    /// Advance `tap` past one value of this schema without materializing it.
    pub fn skip_value(&self, tap: &mut ReadTap) -> AvroResult<()> {
        let rs = ResolvedSchema::try_from(self)?;
        skip_internal(self, rs.get_names(), &self.namespace(), tap)
    }
}

/// The number of items in the next block of an array or map, reading the
/// byte-size prefix that follows a negative count.
pub(crate) fn decode_block_len(tap: &mut ReadTap) -> AvroResult<usize> {
    let n = tap.read_long()?;
    if n < 0 {
        // A negative count is followed by the byte size of the block, which
        // a decoder that materializes every item has no use for.
        tap.skip_long()?;
        safe_len(n.unsigned_abs() as usize)
    } else {
        safe_len(n as usize)
    }
}

pub(crate) fn decode_internal<S: Borrow<Schema>>(
    schema: &Schema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    tap: &mut ReadTap,
) -> AvroResult<Value> {
    match schema {
        Schema::Ref { name } => {
            let fully_qualified_name = name.fully_qualified_name(enclosing_namespace);
            let resolved = names
                .get(&fully_qualified_name)
                .ok_or(Details::SchemaResolutionError(fully_qualified_name.clone()))?;
            let namespace = fully_qualified_name.namespace;
            decode_internal(resolved.borrow(), names, &namespace, tap)
        }
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => tap.read_boolean().map(Value::Boolean),
        Schema::Int => tap.read_int().map(Value::Int),
        Schema::Long => tap.read_long().map(Value::Long),
        Schema::Float => tap.read_float().map(Value::Float),
        Schema::Double => tap.read_double().map(Value::Double),
        Schema::Bytes => tap.read_bytes().map(|bytes| Value::Bytes(bytes.to_vec())),
        Schema::String => tap.read_str().map(Value::String),
        Schema::Fixed(inner) => tap
            .read_fixed(inner.size)
            .map(|bytes| Value::Fixed(inner.size, bytes.to_vec())),
        Schema::Enum(inner) => {
            let index = tap.read_long()?;
            match usize::try_from(index)
                .ok()
                .and_then(|i| inner.symbols.get(i))
            {
                Some(symbol) => Ok(Value::Enum(index as u32, symbol.clone())),
                None => Err(Details::GetEnumValue {
                    index,
                    num_symbols: inner.symbols.len(),
                }
                .into()),
            }
        }
        Schema::Array(inner) => {
            let mut items = Vec::new();
            loop {
                let n = decode_block_len(tap)?;
                if n == 0 {
                    break;
                }
                items.reserve(n);
                for _ in 0..n {
                    items.push(decode_internal(
                        &inner.items,
                        names,
                        enclosing_namespace,
                        tap,
                    )?);
                }
            }
            Ok(Value::Array(items))
        }
        Schema::Map(inner) => {
            let mut items = HashMap::new();
            loop {
                let n = decode_block_len(tap)?;
                if n == 0 {
                    break;
                }
                items.reserve(n);
                for _ in 0..n {
                    let key = tap.read_str()?;
                    let value = decode_internal(&inner.values, names, enclosing_namespace, tap)?;
                    items.insert(key, value);
                }
            }
            Ok(Value::Map(items))
        }
        Schema::Union(union) => {
            let index = tap.read_long()?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| union.variants().get(i))
                .ok_or(Details::GetUnionVariant {
                    index,
                    num_variants: union.variants().len(),
                })?;
            let value = decode_internal(branch, names, enclosing_namespace, tap)?;
            Ok(Value::Union(index as u32, Box::new(value)))
        }
        Schema::Record(inner) => {
            let record_namespace = inner
                .name
                .fully_qualified_name(enclosing_namespace)
                .namespace;
            let mut fields = Vec::with_capacity(inner.fields.len());
            for field in &inner.fields {
                let value = decode_internal(&field.schema, names, &record_namespace, tap)?;
                fields.push((field.name.clone(), value));
            }
            Ok(Value::Record(fields))
        }
    }
}

pub(crate) fn skip_internal<S: Borrow<Schema>>(
    schema: &Schema,
    names: &HashMap<Name, S>,
    enclosing_namespace: &Namespace,
    tap: &mut ReadTap,
) -> AvroResult<()> {
    match schema {
        Schema::Ref { name } => {
            let fully_qualified_name = name.fully_qualified_name(enclosing_namespace);
            let resolved = names
                .get(&fully_qualified_name)
                .ok_or(Details::SchemaResolutionError(fully_qualified_name.clone()))?;
            let namespace = fully_qualified_name.namespace;
            skip_internal(resolved.borrow(), names, &namespace, tap)
        }
        Schema::Null => Ok(()),
        Schema::Boolean => tap.read_boolean().map(|_| ()),
        Schema::Int | Schema::Long | Schema::Enum(_) => tap.skip_long(),
        Schema::Float => tap.skip_fixed(4),
        Schema::Double => tap.skip_fixed(8),
        Schema::Bytes | Schema::String => tap.skip_bytes(),
        Schema::Fixed(inner) => tap.skip_fixed(inner.size),
        Schema::Array(inner) => skip_blocks(tap, |tap| {
            skip_internal(&inner.items, names, enclosing_namespace, tap)
        }),
        Schema::Map(inner) => skip_blocks(tap, |tap| {
            tap.skip_bytes()?;
            skip_internal(&inner.values, names, enclosing_namespace, tap)
        }),
        Schema::Union(union) => {
            let index = tap.read_long()?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| union.variants().get(i))
                .ok_or(Details::GetUnionVariant {
                    index,
                    num_variants: union.variants().len(),
                })?;
            skip_internal(branch, names, enclosing_namespace, tap)
        }
        Schema::Record(inner) => {
            let record_namespace = inner
                .name
                .fully_qualified_name(enclosing_namespace)
                .namespace;
            for field in &inner.fields {
                skip_internal(&field.schema, names, &record_namespace, tap)?;
            }
            Ok(())
        }
    }
}

/// Skip the blocks of an array or map, jumping over whole blocks when the
/// writer provided their byte size.
pub(crate) fn skip_blocks(
    tap: &mut ReadTap,
    mut skip_item: impl FnMut(&mut ReadTap) -> AvroResult<()>,
) -> AvroResult<()> {
    loop {
        let n = tap.read_long()?;
        if n == 0 {
            return Ok(());
        }
        if n < 0 {
            let block_size = tap.read_long()?;
            let block_size =
                usize::try_from(block_size).map_err(|_| Details::NegativeLength(block_size))?;
            tap.skip_fixed(block_size)?;
        } else {
            for _ in 0..n {
                skip_item(tap)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestResult;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_int() -> TestResult {
        assert_eq!(Schema::Int.from_buffer(&[0x80, 0x01])?, Value::Int(64));
        assert_eq!(Schema::Int.from_buffer(&[0x00])?, Value::Int(0));

        Ok(())
    }

    #[test]
    fn test_decode_array_without_size() -> TestResult {
        let result = Schema::array(Schema::Int).from_buffer(&[6, 2, 4, 6, 0])?;
        assert_eq!(
            result,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );

        Ok(())
    }

    #[test]
    fn test_decode_array_with_size() -> TestResult {
        // A negative count carries the block's byte size after it.
        let result = Schema::array(Schema::Int).from_buffer(&[5, 6, 2, 4, 6, 0])?;
        assert_eq!(
            result,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );

        Ok(())
    }

    #[test]
    fn test_decode_multi_block_array() -> TestResult {
        let result = Schema::array(Schema::Int).from_buffer(&[2, 2, 2, 4, 0])?;
        assert_eq!(result, Value::Array(vec![Value::Int(1), Value::Int(2)]));

        Ok(())
    }

    #[test]
    fn test_decode_map_without_size() -> TestResult {
        let result =
            Schema::map(Schema::Int).from_buffer(&[0x02, 0x08, 0x74, 0x65, 0x73, 0x74, 0x02, 0x00])?;
        let mut expected = HashMap::new();
        expected.insert(String::from("test"), Value::Int(1));
        assert_eq!(result, Value::Map(expected));

        Ok(())
    }

    #[test]
    fn test_decode_map_with_size() -> TestResult {
        let result = Schema::map(Schema::Int)
            .from_buffer(&[0x01, 0x0C, 0x08, 0x74, 0x65, 0x73, 0x74, 0x02, 0x00])?;
        let mut expected = HashMap::new();
        expected.insert(String::from("test"), Value::Int(1));
        assert_eq!(result, Value::Map(expected));

        Ok(())
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        match Schema::Int
            .from_buffer(&[0x00, 0x00])
            .map_err(crate::Error::into_details)
        {
            Err(Details::TrailingBytes(1)) => {}
            other => panic!("Expected Details::TrailingBytes, got {other:?}"),
        }
    }

    #[test]
    fn test_illformed_length_is_rejected() -> TestResult {
        let schema = Schema::parse_str(
            r#"
        {
            "type": "record",
            "name": "test",
            "fields": [
                {"name": "a", "type": "long"},
                {"name": "b", "type": "string"}
            ]
        }"#,
        )?;

        // Would allocate 18446744073709551605 bytes.
        let illformed: &[u8] = &[0x3e, 0x15, 0xff, 0x1f, 0x15, 0xff];
        assert!(schema.from_buffer(illformed).is_err());

        Ok(())
    }

    #[test]
    fn test_unknown_enum_ordinal_is_rejected() -> TestResult {
        let schema = Schema::parse_str(
            r#"{"type": "enum", "name": "Suit", "symbols": ["H", "S"]}"#,
        )?;
        match schema.from_buffer(&[0x04]).map_err(crate::Error::into_details) {
            Err(Details::GetEnumValue { index: 2, .. }) => Ok(()),
            other => panic!("Expected Details::GetEnumValue, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_then_decode() -> TestResult {
        let schema = Schema::parse_str(
            r#"
        {
            "type": "record",
            "name": "Pair",
            "fields": [
                {"name": "left", "type": "string"},
                {"name": "right", "type": {"type": "array", "items": "long"}}
            ]
        }"#,
        )?;

        let a = Value::Record(vec![
            ("left".into(), Value::String("first".into())),
            ("right".into(), Value::Array(vec![Value::Long(1)])),
        ]);
        let b = Value::Record(vec![
            ("left".into(), Value::String("second".into())),
            ("right".into(), Value::Array(vec![Value::Long(2), Value::Long(3)])),
        ]);

        let mut buffer = schema.to_buffer(&a)?;
        buffer.extend(schema.to_buffer(&b)?);

        let mut tap = ReadTap::new(&buffer);
        schema.skip_value(&mut tap)?;
        assert_eq!(schema.decode_from(&mut tap, None)?, b);
        assert!(tap.is_at_end());

        Ok(())
    }

    #[test]
    fn test_recursive_definition_decode() -> TestResult {
        let schema = Schema::parse_str(
            r#"
        {
            "type": "record",
            "name": "TestStruct",
            "fields": [
                {
                    "name": "a",
                    "type": ["null", {
                        "type": "record",
                        "name": "Inner",
                        "fields": [{"name": "z", "type": "int"}]
                    }]
                },
                {"name": "b", "type": "Inner"}
            ]
        }"#,
        )?;

        let inner_value1 = Value::Record(vec![("z".into(), Value::Int(3))]);
        let inner_value2 = Value::Record(vec![("z".into(), Value::Int(6))]);
        let outer_value = Value::Record(vec![
            ("a".into(), Value::Union(1, Box::new(inner_value1))),
            ("b".into(), inner_value2),
        ]);

        let buffer = schema.to_buffer(&outer_value)?;
        assert_eq!(schema.from_buffer(&buffer)?, outer_value);

        Ok(())
    }
}
