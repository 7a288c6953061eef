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

//! Schema resolution: compiling a reusable decoder for a (writer, reader)
//! schema pair.
//!
//! A [`Resolver`] consumes writer-encoded bytes and emits reader-shaped
//! values, applying the allowed promotions and field remappings. Every
//! incompatibility is reported when the resolver is compiled; the only
//! data-dependent failure left for decode time is a writer enum symbol the
//! reader does not know.
//!
//! Record plans live in an arena addressed by stable indices, so mutually
//! recursive records compile to a finite graph: a plan slot is reserved
//! before the record's fields are compiled and back-patched afterwards.

use crate::decode::{decode_block_len, skip_blocks};
use crate::error::Details;
use crate::schema::{
    Alias, EnumSchema, Name, NamesRef, Namespace, RecordSchema, ResolvedSchema, Schema,
};
use crate::tap::ReadTap;
use crate::types::Value;
use crate::AvroResult;
use std::collections::HashMap;

impl Schema {
    /// Compile a decoder that reads values encoded with `writer` and projects
    /// them into this (reader) schema.
    ///
    /// Returns an error when the schemas are incompatible: mismatched
    /// primitives, a missing reader field without a default, an ambiguous
    /// field alias match, incompatible names, or a fixed size mismatch.
    pub fn create_resolver(&self, writer: &Schema) -> AvroResult<Resolver> {
        let writer_rs = ResolvedSchema::try_from(writer)?;
        let reader_rs = ResolvedSchema::try_from(self)?;

        let mut compiler = Compiler {
            writer_names: writer_rs.get_names(),
            reader_names: reader_rs.get_names(),
            record_memo: HashMap::new(),
            skip_memo: HashMap::new(),
            plans: Vec::new(),
            skip_plans: Vec::new(),
        };
        let root = compiler.compile(writer, &writer.namespace(), self, &self.namespace())?;

        // Slots abandoned by failed trial compilations (unmatched reader
        // union branches) are unreferenced; replace them with inert plans.
        Ok(Resolver {
            root,
            plans: compiler
                .plans
                .into_iter()
                .map(|plan| {
                    plan.unwrap_or(RecordPlan {
                        steps: Vec::new(),
                        defaults: Vec::new(),
                        field_names: Vec::new(),
                    })
                })
                .collect(),
            skip_plans: compiler
                .skip_plans
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            reader_key: self.canonical_form(),
        })
    }
}

/// A compiled decoder, valid only for the (writer, reader) pair it was
/// created from.
pub struct Resolver {
    root: Decoder,
    plans: Vec<RecordPlan>,
    skip_plans: Vec<Vec<Skipper>>,
    reader_key: String,
}

impl Resolver {
    pub(crate) fn is_for_reader(&self, reader: &Schema) -> bool {
        self.reader_key == reader.canonical_form()
    }

    pub(crate) fn decode(&self, tap: &mut ReadTap) -> AvroResult<Value> {
        self.root.decode(self, tap)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("reader", &self.reader_key)
            .finish_non_exhaustive()
    }
}

/// One compiled decoding action.
enum Decoder {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Fixed(usize),
    // Numeric promotions and byte/string reinterpretation.
    IntAsLong,
    IntAsFloat,
    IntAsDouble,
    LongAsFloat,
    LongAsDouble,
    FloatAsDouble,
    StrAsBytes,
    BytesAsStr,
    Enum(EnumMapping),
    Array(Box<Decoder>),
    Map(Box<Decoder>),
    /// The writer wrote a union: read the branch index, dispatch.
    FromUnion(Vec<Decoder>),
    /// The reader expects a union: wrap the decoded value into `branch`.
    IntoUnion { branch: u32, inner: Box<Decoder> },
    /// A record plan in the arena.
    Record(usize),
}

struct EnumMapping {
    /// Writer ordinal to reader ordinal; `None` for symbols the reader lacks.
    mapping: Vec<Option<u32>>,
    /// Reader ordinal to fall back to for unknown symbols, per the reader's
    /// enum default.
    default: Option<u32>,
    /// The reader's symbols.
    symbols: Vec<String>,
    /// The writer's symbols, for error reporting.
    writer_symbols: Vec<String>,
    reader_name: Name,
}

struct RecordPlan {
    /// Actions in the writer's field order.
    steps: Vec<RecordStep>,
    /// Reader fields with no writer counterpart: position and default value.
    defaults: Vec<(usize, Value)>,
    /// The reader's field names, in reader order.
    field_names: Vec<String>,
}

enum RecordStep {
    /// Decode the writer field into the reader field at `position`.
    Decode { position: usize, decoder: Decoder },
    /// The reader has no use for this writer field.
    Skip(Skipper),
}

/// A compiled plan for advancing past one writer value.
enum Skipper {
    Null,
    Boolean,
    Varint,
    Float,
    Double,
    Bytes,
    Fixed(usize),
    Array(Box<Skipper>),
    Map(Box<Skipper>),
    Union(Vec<Skipper>),
    Record(usize),
}

impl Decoder {
    fn decode(&self, resolver: &Resolver, tap: &mut ReadTap) -> AvroResult<Value> {
        match self {
            Decoder::Null => Ok(Value::Null),
            Decoder::Boolean => tap.read_boolean().map(Value::Boolean),
            Decoder::Int => tap.read_int().map(Value::Int),
            Decoder::Long => tap.read_long().map(Value::Long),
            Decoder::Float => tap.read_float().map(Value::Float),
            Decoder::Double => tap.read_double().map(Value::Double),
            Decoder::Bytes => tap.read_bytes().map(|b| Value::Bytes(b.to_vec())),
            Decoder::Str => tap.read_str().map(Value::String),
            Decoder::Fixed(size) => tap
                .read_fixed(*size)
                .map(|b| Value::Fixed(*size, b.to_vec())),
            Decoder::IntAsLong => tap.read_int().map(|i| Value::Long(i as i64)),
            Decoder::IntAsFloat => tap.read_int().map(|i| Value::Float(i as f32)),
            Decoder::IntAsDouble => tap.read_int().map(|i| Value::Double(i as f64)),
            Decoder::LongAsFloat => tap.read_long().map(|i| Value::Float(i as f32)),
            Decoder::LongAsDouble => tap.read_long().map(|i| Value::Double(i as f64)),
            Decoder::FloatAsDouble => tap.read_float().map(|x| Value::Double(x as f64)),
            Decoder::StrAsBytes => tap.read_bytes().map(|b| Value::Bytes(b.to_vec())),
            Decoder::BytesAsStr => tap.read_str().map(Value::String),
            Decoder::Enum(mapping) => mapping.decode(tap),
            Decoder::Array(items) => {
                let mut collected = Vec::new();
                loop {
                    let n = decode_block_len(tap)?;
                    if n == 0 {
                        break;
                    }
                    collected.reserve(n);
                    for _ in 0..n {
                        collected.push(items.decode(resolver, tap)?);
                    }
                }
                Ok(Value::Array(collected))
            }
            Decoder::Map(values) => {
                let mut collected = HashMap::new();
                loop {
                    let n = decode_block_len(tap)?;
                    if n == 0 {
                        break;
                    }
                    collected.reserve(n);
                    for _ in 0..n {
                        let key = tap.read_str()?;
                        collected.insert(key, values.decode(resolver, tap)?);
                    }
                }
                Ok(Value::Map(collected))
            }
            Decoder::FromUnion(branches) => {
                let index = tap.read_long()?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or(Details::GetUnionVariant {
                        index,
                        num_variants: branches.len(),
                    })?;
                branch.decode(resolver, tap)
            }
            Decoder::IntoUnion { branch, inner } => inner
                .decode(resolver, tap)
                .map(|value| Value::Union(*branch, Box::new(value))),
            Decoder::Record(index) => {
                let plan = &resolver.plans[*index];
                let mut slots: Vec<Option<Value>> = vec![None; plan.field_names.len()];
                for step in &plan.steps {
                    match step {
                        RecordStep::Decode { position, decoder } => {
                            slots[*position] = Some(decoder.decode(resolver, tap)?);
                        }
                        RecordStep::Skip(skipper) => skipper.skip(resolver, tap)?,
                    }
                }
                for (position, default) in &plan.defaults {
                    slots[*position] = Some(default.clone());
                }
                let fields = plan
                    .field_names
                    .iter()
                    .zip(slots)
                    .map(|(name, slot)| {
                        let value =
                            slot.expect("Every reader field is either matched or defaulted");
                        (name.clone(), value)
                    })
                    .collect();
                Ok(Value::Record(fields))
            }
        }
    }
}

impl EnumMapping {
    fn decode(&self, tap: &mut ReadTap) -> AvroResult<Value> {
        let index = tap.read_long()?;
        let mapped = usize::try_from(index)
            .ok()
            .and_then(|i| self.mapping.get(i))
            .ok_or(Details::GetEnumValue {
                index,
                num_symbols: self.mapping.len(),
            })?;
        match mapped.or(self.default) {
            Some(position) => Ok(Value::Enum(
                position,
                self.symbols[position as usize].clone(),
            )),
            None => Err(Details::ResolveEnumSymbol {
                symbol: self.writer_symbols[index as usize].clone(),
                reader: self.reader_name.clone(),
            }
            .into()),
        }
    }
}

impl Skipper {
    fn skip(&self, resolver: &Resolver, tap: &mut ReadTap) -> AvroResult<()> {
        match self {
            Skipper::Null => Ok(()),
            Skipper::Boolean => tap.read_boolean().map(|_| ()),
            Skipper::Varint => tap.skip_long(),
            Skipper::Float => tap.skip_fixed(4),
            Skipper::Double => tap.skip_fixed(8),
            Skipper::Bytes => tap.skip_bytes(),
            Skipper::Fixed(size) => tap.skip_fixed(*size),
            Skipper::Array(items) => skip_blocks(tap, |tap| items.skip(resolver, tap)),
            Skipper::Map(values) => skip_blocks(tap, |tap| {
                tap.skip_bytes()?;
                values.skip(resolver, tap)
            }),
            Skipper::Union(branches) => {
                let index = tap.read_long()?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or(Details::GetUnionVariant {
                        index,
                        num_variants: branches.len(),
                    })?;
                branch.skip(resolver, tap)
            }
            Skipper::Record(index) => {
                for field in &resolver.skip_plans[*index] {
                    field.skip(resolver, tap)?;
                }
                Ok(())
            }
        }
    }
}

struct Compiler<'a> {
    writer_names: &'a NamesRef<'a>,
    reader_names: &'a NamesRef<'a>,
    /// Memoized (writer fullname, reader fullname) record pairs, so cyclic
    /// schemas terminate.
    record_memo: HashMap<(Name, Name), usize>,
    skip_memo: HashMap<Name, usize>,
    plans: Vec<Option<RecordPlan>>,
    skip_plans: Vec<Option<Vec<Skipper>>>,
}

/// Whether the writer's fullname matches the reader's fullname or appears in
/// the reader's alias set.
fn names_match(
    writer_name: &Name,
    reader_name: &Name,
    reader_aliases: &Option<Vec<Alias>>,
) -> bool {
    if writer_name == reader_name {
        return true;
    }
    match reader_aliases {
        Some(aliases) => aliases
            .iter()
            .any(|alias| alias.fully_qualified_name(&reader_name.namespace) == *writer_name),
        None => false,
    }
}

impl Compiler<'_> {
    fn compile(
        &mut self,
        writer: &Schema,
        writer_namespace: &Namespace,
        reader: &Schema,
        reader_namespace: &Namespace,
    ) -> AvroResult<Decoder> {
        if let Schema::Ref { name } = writer {
            let fully_qualified_name = name.fully_qualified_name(writer_namespace);
            let resolved = self
                .writer_names
                .get(&fully_qualified_name)
                .copied()
                .ok_or(Details::SchemaResolutionError(fully_qualified_name.clone()))?;
            let namespace = fully_qualified_name.namespace;
            return self.compile(resolved, &namespace, reader, reader_namespace);
        }
        if let Schema::Ref { name } = reader {
            let fully_qualified_name = name.fully_qualified_name(reader_namespace);
            let resolved = self
                .reader_names
                .get(&fully_qualified_name)
                .copied()
                .ok_or(Details::SchemaResolutionError(fully_qualified_name.clone()))?;
            let namespace = fully_qualified_name.namespace;
            return self.compile(writer, writer_namespace, resolved, &namespace);
        }

        let incompatible = || {
            crate::Error::from(Details::Incompatible {
                writer: writer.into(),
                reader: reader.into(),
            })
        };

        match (writer, reader) {
            // A writer union dispatches on the branch index; each branch must
            // be readable on its own.
            (Schema::Union(w), _) => {
                let branches = w
                    .variants()
                    .iter()
                    .map(|branch| {
                        self.compile(branch, writer_namespace, reader, reader_namespace)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Decoder::FromUnion(branches))
            }
            // A non-union writer reads into the first compatible branch of a
            // reader union.
            (_, Schema::Union(r)) => {
                for (i, branch) in r.variants().iter().enumerate() {
                    if let Ok(inner) =
                        self.compile(writer, writer_namespace, branch, reader_namespace)
                    {
                        return Ok(Decoder::IntoUnion {
                            branch: i as u32,
                            inner: Box::new(inner),
                        });
                    }
                }
                Err(Details::NoCompatibleUnionBranch {
                    writer: writer.into(),
                }
                .into())
            }
            (Schema::Null, Schema::Null) => Ok(Decoder::Null),
            (Schema::Boolean, Schema::Boolean) => Ok(Decoder::Boolean),
            (Schema::Int, Schema::Int) => Ok(Decoder::Int),
            (Schema::Int, Schema::Long) => Ok(Decoder::IntAsLong),
            (Schema::Int, Schema::Float) => Ok(Decoder::IntAsFloat),
            (Schema::Int, Schema::Double) => Ok(Decoder::IntAsDouble),
            (Schema::Long, Schema::Long) => Ok(Decoder::Long),
            (Schema::Long, Schema::Float) => Ok(Decoder::LongAsFloat),
            (Schema::Long, Schema::Double) => Ok(Decoder::LongAsDouble),
            (Schema::Float, Schema::Float) => Ok(Decoder::Float),
            (Schema::Float, Schema::Double) => Ok(Decoder::FloatAsDouble),
            (Schema::Double, Schema::Double) => Ok(Decoder::Double),
            (Schema::Bytes, Schema::Bytes) => Ok(Decoder::Bytes),
            (Schema::Bytes, Schema::String) => Ok(Decoder::BytesAsStr),
            (Schema::String, Schema::String) => Ok(Decoder::Str),
            (Schema::String, Schema::Bytes) => Ok(Decoder::StrAsBytes),
            (Schema::Array(w), Schema::Array(r)) => self
                .compile(&w.items, writer_namespace, &r.items, reader_namespace)
                .map(|items| Decoder::Array(Box::new(items))),
            (Schema::Map(w), Schema::Map(r)) => self
                .compile(&w.values, writer_namespace, &r.values, reader_namespace)
                .map(|values| Decoder::Map(Box::new(values))),
            (Schema::Fixed(w), Schema::Fixed(r)) => {
                let writer_name = w.name.fully_qualified_name(writer_namespace);
                let reader_name = r.name.fully_qualified_name(reader_namespace);
                if !names_match(&writer_name, &reader_name, &r.aliases) {
                    return Err(Details::IncompatibleNames {
                        writer: writer_name,
                        reader: reader_name,
                    }
                    .into());
                }
                if w.size != r.size {
                    return Err(Details::FixedSizeMismatch {
                        name: reader_name,
                        writer: w.size,
                        reader: r.size,
                    }
                    .into());
                }
                Ok(Decoder::Fixed(r.size))
            }
            (Schema::Enum(w), Schema::Enum(r)) => {
                self.compile_enum(w, writer_namespace, r, reader_namespace)
            }
            (Schema::Record(w), Schema::Record(r)) => {
                self.compile_record(w, writer_namespace, r, reader_namespace)
            }
            _ => Err(incompatible()),
        }
    }

    fn compile_enum(
        &mut self,
        writer: &EnumSchema,
        writer_namespace: &Namespace,
        reader: &EnumSchema,
        reader_namespace: &Namespace,
    ) -> AvroResult<Decoder> {
        let writer_name = writer.name.fully_qualified_name(writer_namespace);
        let reader_name = reader.name.fully_qualified_name(reader_namespace);
        if !names_match(&writer_name, &reader_name, &reader.aliases) {
            return Err(Details::IncompatibleNames {
                writer: writer_name,
                reader: reader_name,
            }
            .into());
        }

        let mapping: Vec<Option<u32>> = writer
            .symbols
            .iter()
            .map(|symbol| {
                reader
                    .symbols
                    .iter()
                    .position(|s| s == symbol)
                    .map(|i| i as u32)
            })
            .collect();
        let default = reader.default.as_ref().and_then(|symbol| {
            reader
                .symbols
                .iter()
                .position(|s| s == symbol)
                .map(|i| i as u32)
        });

        if default.is_none() && mapping.iter().all(Option::is_none) {
            return Err(Details::NoCommonEnumSymbol.into());
        }

        Ok(Decoder::Enum(EnumMapping {
            mapping,
            default,
            symbols: reader.symbols.clone(),
            writer_symbols: writer.symbols.clone(),
            reader_name,
        }))
    }

    fn compile_record(
        &mut self,
        writer: &RecordSchema,
        writer_namespace: &Namespace,
        reader: &RecordSchema,
        reader_namespace: &Namespace,
    ) -> AvroResult<Decoder> {
        let writer_name = writer.name.fully_qualified_name(writer_namespace);
        let reader_name = reader.name.fully_qualified_name(reader_namespace);
        if !names_match(&writer_name, &reader_name, &reader.aliases) {
            return Err(Details::IncompatibleNames {
                writer: writer_name,
                reader: reader_name,
            }
            .into());
        }

        let memo_key = (writer_name.clone(), reader_name.clone());
        if let Some(&index) = self.record_memo.get(&memo_key) {
            return Ok(Decoder::Record(index));
        }

        // Reserve the slot before compiling the fields, so recursive
        // references resolve to this plan. On failure the memo entry is
        // removed again; the abandoned slot stays unreferenced.
        let index = self.plans.len();
        self.plans.push(None);
        self.record_memo.insert(memo_key.clone(), index);

        match self.compile_record_plan(writer, &writer_name, reader, &reader_name) {
            Ok(plan) => {
                self.plans[index] = Some(plan);
                Ok(Decoder::Record(index))
            }
            Err(e) => {
                self.record_memo.remove(&memo_key);
                Err(e)
            }
        }
    }

    fn compile_record_plan(
        &mut self,
        writer: &RecordSchema,
        writer_name: &Name,
        reader: &RecordSchema,
        reader_name: &Name,
    ) -> AvroResult<RecordPlan> {
        let writer_record_namespace = writer_name.namespace.clone();
        let reader_record_namespace = reader_name.namespace.clone();

        // Align writer fields with reader fields by name, then by the reader
        // fields' aliases. At most one writer field may match a reader field.
        let mut matched: Vec<Option<usize>> = vec![None; reader.fields.len()];
        let mut steps = Vec::with_capacity(writer.fields.len());
        for (writer_position, writer_field) in writer.fields.iter().enumerate() {
            let reader_position = reader.fields.iter().position(|reader_field| {
                reader_field.name == writer_field.name
                    || reader_field
                        .aliases
                        .iter()
                        .any(|alias| *alias == writer_field.name)
            });

            match reader_position {
                Some(position) => {
                    if matched[position].is_some() {
                        return Err(Details::AmbiguousFieldAlias {
                            field: reader.fields[position].name.clone(),
                        }
                        .into());
                    }
                    matched[position] = Some(writer_position);
                    let decoder = self.compile(
                        &writer_field.schema,
                        &writer_record_namespace,
                        &reader.fields[position].schema,
                        &reader_record_namespace,
                    )?;
                    steps.push(RecordStep::Decode { position, decoder });
                }
                None => {
                    let skipper =
                        self.compile_skipper(&writer_field.schema, &writer_record_namespace)?;
                    steps.push(RecordStep::Skip(skipper));
                }
            }
        }

        let mut defaults = Vec::new();
        for (position, reader_field) in reader.fields.iter().enumerate() {
            if matched[position].is_none() {
                match reader_field.default {
                    Some(ref default) => defaults.push((position, default.clone())),
                    None => {
                        return Err(Details::MissingDefault {
                            field: reader_field.name.clone(),
                        }
                        .into());
                    }
                }
            }
        }

        Ok(RecordPlan {
            steps,
            defaults,
            field_names: reader
                .fields
                .iter()
                .map(|field| field.name.clone())
                .collect(),
        })
    }

    fn compile_skipper(
        &mut self,
        writer: &Schema,
        writer_namespace: &Namespace,
    ) -> AvroResult<Skipper> {
        match writer {
            Schema::Ref { name } => {
                let fully_qualified_name = name.fully_qualified_name(writer_namespace);
                let resolved = self
                    .writer_names
                    .get(&fully_qualified_name)
                    .copied()
                    .ok_or(Details::SchemaResolutionError(fully_qualified_name.clone()))?;
                let namespace = fully_qualified_name.namespace;
                self.compile_skipper(resolved, &namespace)
            }
            Schema::Null => Ok(Skipper::Null),
            Schema::Boolean => Ok(Skipper::Boolean),
            Schema::Int | Schema::Long | Schema::Enum(_) => Ok(Skipper::Varint),
            Schema::Float => Ok(Skipper::Float),
            Schema::Double => Ok(Skipper::Double),
            Schema::Bytes | Schema::String => Ok(Skipper::Bytes),
            Schema::Fixed(inner) => Ok(Skipper::Fixed(inner.size)),
            Schema::Array(inner) => self
                .compile_skipper(&inner.items, writer_namespace)
                .map(|items| Skipper::Array(Box::new(items))),
            Schema::Map(inner) => self
                .compile_skipper(&inner.values, writer_namespace)
                .map(|values| Skipper::Map(Box::new(values))),
            Schema::Union(inner) => inner
                .variants()
                .iter()
                .map(|branch| self.compile_skipper(branch, writer_namespace))
                .collect::<Result<Vec<_>, _>>()
                .map(Skipper::Union),
            Schema::Record(inner) => {
                let fully_qualified_name = inner.name.fully_qualified_name(writer_namespace);
                if let Some(&index) = self.skip_memo.get(&fully_qualified_name) {
                    return Ok(Skipper::Record(index));
                }
                let index = self.skip_plans.len();
                self.skip_plans.push(None);
                self.skip_memo.insert(fully_qualified_name.clone(), index);

                let record_namespace = fully_qualified_name.namespace.clone();
                let fields = inner
                    .fields
                    .iter()
                    .map(|field| self.compile_skipper(&field.schema, &record_namespace))
                    .collect::<Result<Vec<_>, _>>();
                match fields {
                    Ok(fields) => {
                        self.skip_plans[index] = Some(fields);
                        Ok(Skipper::Record(index))
                    }
                    Err(e) => {
                        self.skip_memo.remove(&fully_qualified_name);
                        Err(e)
                    }
                }
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
    fn test_identity_resolver() -> TestResult {
        let schema = Schema::parse_str(
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
        let value = Value::Record(vec![
            ("a".into(), Value::Int(3)),
            ("b".into(), Value::String("x".into())),
        ]);

        let resolver = schema.create_resolver(&schema)?;
        let buffer = schema.to_buffer(&value)?;
        assert_eq!(schema.from_buffer_resolved(&buffer, &resolver)?, value);

        Ok(())
    }

    #[test]
    fn test_numeric_promotions() -> TestResult {
        let buffer = Schema::Int.to_buffer(&Value::Int(123))?;

        let long = Schema::Long.create_resolver(&Schema::Int)?;
        assert_eq!(
            Schema::Long.from_buffer_resolved(&buffer, &long)?,
            Value::Long(123)
        );

        let double = Schema::Double.create_resolver(&Schema::Int)?;
        assert_eq!(
            Schema::Double.from_buffer_resolved(&buffer, &double)?,
            Value::Double(123.0)
        );

        let buffer = Schema::Float.to_buffer(&Value::Float(1.5))?;
        let double = Schema::Double.create_resolver(&Schema::Float)?;
        assert_eq!(
            Schema::Double.from_buffer_resolved(&buffer, &double)?,
            Value::Double(1.5)
        );

        Ok(())
    }

    #[test]
    fn test_no_demotion() {
        assert!(Schema::Int.create_resolver(&Schema::Long).is_err());
        assert!(Schema::Float.create_resolver(&Schema::Double).is_err());
        assert!(Schema::Boolean.create_resolver(&Schema::Int).is_err());
    }

    #[test]
    fn test_string_bytes_reinterpretation() -> TestResult {
        let buffer = Schema::String.to_buffer(&Value::String("hi".into()))?;
        let resolver = Schema::Bytes.create_resolver(&Schema::String)?;
        assert_eq!(
            Schema::Bytes.from_buffer_resolved(&buffer, &resolver)?,
            Value::Bytes(b"hi".to_vec())
        );

        let buffer = Schema::Bytes.to_buffer(&Value::Bytes(b"ok".to_vec()))?;
        let resolver = Schema::String.create_resolver(&Schema::Bytes)?;
        assert_eq!(
            Schema::String.from_buffer_resolved(&buffer, &resolver)?,
            Value::String("ok".into())
        );

        Ok(())
    }

    #[test]
    fn test_wrong_resolver_is_rejected() -> TestResult {
        let resolver = Schema::Long.create_resolver(&Schema::Int)?;
        let buffer = Schema::Int.to_buffer(&Value::Int(1))?;
        let err = Schema::Double
            .from_buffer_resolved(&buffer, &resolver)
            .unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Argument);

        Ok(())
    }

    #[test]
    fn test_int_into_nullable_union() -> TestResult {
        let reader = Schema::union(vec![Schema::Null, Schema::Int])?;
        let resolver = reader.create_resolver(&Schema::Int)?;
        let buffer = Schema::Int.to_buffer(&Value::Int(123))?;
        assert_eq!(
            reader.from_buffer_resolved(&buffer, &resolver)?,
            Value::Union(1, Box::new(Value::Int(123)))
        );

        Ok(())
    }

    #[test]
    fn test_union_widening() -> TestResult {
        let writer = Schema::union(vec![Schema::String, Schema::Int])?;
        let reader = Schema::union(vec![Schema::Int, Schema::Bytes])?;
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
    fn test_recursive_records_compile_finitely() -> TestResult {
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

        let resolver = schema.create_resolver(&schema)?;
        let value = Value::Record(vec![
            ("value".into(), Value::Long(1)),
            (
                "next".into(),
                Value::Union(
                    1,
                    Box::new(Value::Record(vec![
                        ("value".into(), Value::Long(2)),
                        ("next".into(), Value::Union(0, Box::new(Value::Null))),
                    ])),
                ),
            ),
        ]);

        let buffer = schema.to_buffer(&value)?;
        assert_eq!(schema.from_buffer_resolved(&buffer, &resolver)?, value);

        Ok(())
    }
}
