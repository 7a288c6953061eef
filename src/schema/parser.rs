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

use crate::error::Details;
use crate::schema::{
    Alias, Aliases, ArraySchema, EnumSchema, FixedSchema, MapSchema, Name, Names, Namespace,
    RecordField, RecordSchema, Schema, UnionSchema,
};
use crate::util::MapHelper;
use crate::validator::validate_enum_symbol_name;
use crate::{AvroResult, Error};
use log::{debug, error, warn};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

/// The eight primitive type names. These spellings always denote the
/// primitive schema and may never be redefined by a named type.
pub(crate) const PRIMITIVES: [&str; 8] = [
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

/// A hook invoked with each raw JSON schema node and its enclosing namespace
/// before the node is parsed. Returning a schema short-circuits parsing of
/// that node.
pub type TypeHook = Box<dyn FnMut(&Value, &Namespace) -> Option<Schema>>;

/// Configuration for a parsing session.
#[derive(Default)]
pub struct ParserConfig {
    /// The initial enclosing namespace.
    pub namespace: Namespace,
    /// An optional hook consulted before each node is constructed.
    pub type_hook: Option<TypeHook>,
}

#[derive(Default)]
pub(crate) struct Parser {
    input_schemas: HashMap<Name, Value>,
    /// Used to resolve cyclic references, i.e. when a
    /// field's type is a reference to its record's type
    resolving_schemas: Names,
    input_order: Vec<Name>,
    /// Used to avoid parsing the same schema twice
    parsed_schemas: Names,
    config: ParserConfig,
}

impl Parser {
    pub(crate) fn new(
        input_schemas: HashMap<Name, Value>,
        input_order: Vec<Name>,
        parsed_schemas: Names,
    ) -> Self {
        Self {
            input_schemas,
            resolving_schemas: HashMap::default(),
            input_order,
            parsed_schemas,
            config: ParserConfig::default(),
        }
    }

    pub(crate) fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub(crate) fn get_parsed_schemas(&self) -> &Names {
        &self.parsed_schemas
    }

    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub(super) fn parse_str(&mut self, input: &str) -> AvroResult<Schema> {
        let value = serde_json::from_str(input).map_err(Details::ParseSchemaJson)?;
        let namespace = self.config.namespace.clone();
        self.parse(&value, &namespace)
    }

    /// Create an array of `Schema`s from the input schemas handed to
    /// [`Parser::new`].
    ///
    /// The schemas may have cross-dependencies; these are resolved during
    /// parsing.
    pub(super) fn parse_list(&mut self) -> AvroResult<Vec<Schema>> {
        self.parse_input_schemas()?;

        let mut parsed_schemas = Vec::with_capacity(self.parsed_schemas.len());
        for name in self.input_order.drain(0..) {
            let parsed = self
                .parsed_schemas
                .remove(&name)
                .expect("One of the input schemas was unexpectedly not parsed");
            parsed_schemas.push(parsed);
        }
        Ok(parsed_schemas)
    }

    /// Convert the input schemas to `parsed_schemas`.
    fn parse_input_schemas(&mut self) -> Result<(), Error> {
        while !self.input_schemas.is_empty() {
            let next_name = self
                .input_schemas
                .keys()
                .next()
                .expect("Input schemas unexpectedly empty")
                .to_owned();
            let (name, value) = self
                .input_schemas
                .remove_entry(&next_name)
                .expect("Key unexpectedly missing");
            let parsed = self.parse(&value, &None)?;
            self.parsed_schemas.insert(name, parsed);
        }
        Ok(())
    }

    /// Create a `Schema` from a `serde_json::Value` representing a JSON Avro
    /// schema.
    pub(crate) fn parse(
        &mut self,
        value: &Value,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        if let Some(hook) = self.config.type_hook.as_mut()
            && let Some(schema) = hook(value, enclosing_namespace)
        {
            return Ok(schema);
        }

        match *value {
            Value::String(ref t) => self.parse_known_schema(t.as_str(), enclosing_namespace),
            Value::Object(ref data) => self.parse_complex(data, enclosing_namespace),
            Value::Array(ref data) => self.parse_union(data, enclosing_namespace),
            _ => Err(Details::ParseSchemaFromValidJson.into()),
        }
    }

    /// Parse a string as a primitive type or a reference to a named schema.
    fn parse_known_schema(
        &mut self,
        name: &str,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "double" => Ok(Schema::Double),
            "float" => Ok(Schema::Float),
            "bytes" => Ok(Schema::Bytes),
            "string" => Ok(Schema::String),
            _ => self.fetch_schema_ref(name, enclosing_namespace),
        }
    }

    /// Given a name, tries to retrieve the parsed schema from `parsed_schemas`.
    ///
    /// If a parsed schema is not found, it checks if a currently resolving
    /// schema with that name exists (which allows a record to reference itself
    /// or an enclosing record before its definition completes). Otherwise it
    /// looks for a JSON node with that name in `input_schemas` and parses it.
    fn fetch_schema_ref(
        &mut self,
        name: &str,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        fn get_schema_ref(parsed: &Schema) -> Schema {
            match parsed {
                &Schema::Record(RecordSchema { ref name, .. })
                | &Schema::Enum(EnumSchema { ref name, .. })
                | &Schema::Fixed(FixedSchema { ref name, .. }) => {
                    Schema::Ref { name: name.clone() }
                }
                _ => parsed.clone(),
            }
        }

        let fully_qualified_name =
            Name::new(name)?.fully_qualified_name(enclosing_namespace);

        if self.parsed_schemas.contains_key(&fully_qualified_name) {
            return Ok(Schema::Ref {
                name: fully_qualified_name,
            });
        }
        if let Some(resolving_schema) = self.resolving_schemas.get(&fully_qualified_name) {
            return Ok(resolving_schema.clone());
        }

        let value = self
            .input_schemas
            .remove(&fully_qualified_name)
            .ok_or_else(|| {
                let full_name = fully_qualified_name.fullname(&None);
                if full_name == "bool" {
                    Details::ParsePrimitiveSimilar(full_name, "boolean")
                } else {
                    Details::ParsePrimitive(full_name)
                }
            })?;

        // Parsing a full schema from inside another schema. The other full
        // schema does not inherit the current namespace.
        let parsed = self.parse(&value, &None)?;
        self.parsed_schemas
            .insert(fully_qualified_name, parsed.clone());

        Ok(get_schema_ref(&parsed))
    }

    /// Parse a `serde_json::Value` representing a complex Avro type into a
    /// `Schema`.
    ///
    /// Avro supports "recursive" definition of types,
    /// e.g. `{"type": {"type": "string"}}`.
    fn parse_complex(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        if let Some(logical_type) = complex.get("logicalType") {
            warn!("Ignoring unsupported logical type `{logical_type}`");
        }

        match complex.get("type") {
            Some(Value::String(t)) => match t.as_str() {
                "record" => self.parse_record(complex, enclosing_namespace),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "array" => self.parse_array(complex, enclosing_namespace),
                "map" => self.parse_map(complex, enclosing_namespace),
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                other => self.parse_known_schema(other, enclosing_namespace),
            },
            Some(Value::Object(data)) => self.parse_complex(data, enclosing_namespace),
            Some(Value::Array(variants)) => self.parse_union(variants, enclosing_namespace),
            Some(unknown) => Err(Details::GetComplexType(unknown.clone()).into()),
            None => Err(Details::GetComplexTypeField.into()),
        }
    }

    /// Check that a named type does not redefine a primitive name and is not
    /// a duplicate of an already known definition.
    fn check_new_name(&self, fully_qualified_name: &Name) -> AvroResult<()> {
        if PRIMITIVES.contains(&fully_qualified_name.name.as_str()) {
            return Err(Details::PrimitiveRedefinition(fully_qualified_name.name.clone()).into());
        }
        if self.parsed_schemas.contains_key(fully_qualified_name)
            || self.resolving_schemas.contains_key(fully_qualified_name)
        {
            return Err(Details::NameCollision(fully_qualified_name.fullname(&None)).into());
        }
        Ok(())
    }

    fn register_resolving_schema(&mut self, name: &Name, aliases: &Aliases) {
        let resolving_schema = Schema::Ref { name: name.clone() };
        self.resolving_schemas
            .insert(name.clone(), resolving_schema.clone());

        let namespace = &name.namespace;

        if let Some(aliases) = aliases {
            aliases.iter().for_each(|alias| {
                let alias_fullname = alias.fully_qualified_name(namespace);
                self.resolving_schemas
                    .insert(alias_fullname, resolving_schema.clone());
            });
        }
    }

    fn register_parsed_schema(
        &mut self,
        fully_qualified_name: &Name,
        schema: &Schema,
        aliases: &Aliases,
    ) {
        self.parsed_schemas
            .insert(fully_qualified_name.clone(), schema.clone());
        self.resolving_schemas.remove(fully_qualified_name);

        let namespace = &fully_qualified_name.namespace;

        if let Some(aliases) = aliases {
            aliases.iter().for_each(|alias| {
                let alias_fullname = alias.fully_qualified_name(namespace);
                self.resolving_schemas.remove(&alias_fullname);
                self.parsed_schemas.insert(alias_fullname, schema.clone());
            });
        }
    }

    /// Returns an already parsed schema, or a schema that is currently being
    /// resolved, when the node carries nothing but a known type name.
    fn get_already_seen_schema(
        &self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> Option<&Schema> {
        match complex.get("type") {
            Some(Value::String(typ)) => {
                let name = Name::new(typ.as_str())
                    .ok()?
                    .fully_qualified_name(enclosing_namespace);
                self.resolving_schemas
                    .get(&name)
                    .or_else(|| self.parsed_schemas.get(&name))
            }
            _ => None,
        }
    }

    /// Parse a `serde_json::Value` representing an Avro record type into a
    /// `Schema`.
    fn parse_record(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let fields_opt = complex.get("fields");

        if fields_opt.is_none()
            && let Some(seen) = self.get_already_seen_schema(complex, enclosing_namespace)
        {
            return Ok(seen.clone());
        }

        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        self.check_new_name(&fully_qualified_name)?;
        let aliases =
            self.fix_aliases_namespace(complex.aliases(), &fully_qualified_name.namespace)?;

        let mut lookup = BTreeMap::new();

        self.register_resolving_schema(&fully_qualified_name, &aliases);

        debug!("Going to parse record schema: {:?}", &fully_qualified_name);

        let fields: Vec<RecordField> = fields_opt
            .and_then(|fields| fields.as_array())
            .ok_or_else(|| Error::new(Details::GetRecordFieldsJson))
            .and_then(|fields| {
                fields
                    .iter()
                    .filter_map(|field| field.as_object())
                    .map(|field| RecordField::parse(field, self, &fully_qualified_name))
                    .collect::<Result<_, _>>()
            })?;

        for (position, field) in fields.iter().enumerate() {
            if let Some(_old) = lookup.insert(field.name.clone(), position) {
                return Err(Details::FieldNameDuplicate(field.name.clone()).into());
            }

            for alias in &field.aliases {
                lookup.insert(alias.clone(), position);
            }
        }

        let schema = Schema::Record(RecordSchema {
            name: fully_qualified_name.clone(),
            aliases: aliases.clone(),
            doc: complex.doc(),
            fields,
            lookup,
            attributes: self.get_custom_attributes(complex, &["fields"]),
        });

        self.register_parsed_schema(&fully_qualified_name, &schema, &aliases);
        Ok(schema)
    }

    fn get_custom_attributes(
        &self,
        complex: &Map<String, Value>,
        excluded: &[&'static str],
    ) -> BTreeMap<String, Value> {
        let mut custom_attributes: BTreeMap<String, Value> = BTreeMap::new();
        for (key, value) in complex {
            match key.as_str() {
                "type" | "name" | "namespace" | "doc" | "aliases" | "logicalType" => continue,
                candidate if excluded.contains(&candidate) => continue,
                _ => custom_attributes.insert(key.clone(), value.clone()),
            };
        }
        custom_attributes
    }

    /// Parse a `serde_json::Value` representing an Avro enum type into a
    /// `Schema`.
    fn parse_enum(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let symbols_opt = complex.get("symbols");

        if symbols_opt.is_none()
            && let Some(seen) = self.get_already_seen_schema(complex, enclosing_namespace)
        {
            return Ok(seen.clone());
        }

        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        self.check_new_name(&fully_qualified_name)?;
        let aliases =
            self.fix_aliases_namespace(complex.aliases(), &fully_qualified_name.namespace)?;

        let symbols: Vec<String> = symbols_opt
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::from(Details::GetEnumSymbolsField))
            .and_then(|symbols| {
                symbols
                    .iter()
                    .map(|symbol| symbol.as_str().map(|s| s.to_string()))
                    .collect::<Option<_>>()
                    .ok_or_else(|| Error::from(Details::GetEnumSymbolsField))
            })?;

        let mut existing_symbols: HashSet<&String> = HashSet::with_capacity(symbols.len());
        for symbol in symbols.iter() {
            validate_enum_symbol_name(symbol)?;

            if !existing_symbols.insert(symbol) {
                return Err(Details::EnumSymbolDuplicate(symbol.to_string()).into());
            }
        }

        let mut default: Option<String> = None;
        if let Some(value) = complex.get("default") {
            if let Value::String(ref s) = *value {
                default = Some(s.clone());
            } else {
                error!("Enum default must be a string, got {value}");
                return Err(Details::EnumDefaultWrongType(value.clone()).into());
            }
        }

        if let Some(ref symbol) = default
            && !symbols.contains(symbol)
        {
            return Err(Details::GetEnumSymbol(symbol.clone()).into());
        }

        let schema = Schema::Enum(EnumSchema {
            name: fully_qualified_name.clone(),
            aliases: aliases.clone(),
            doc: complex.doc(),
            symbols,
            default,
            attributes: self.get_custom_attributes(complex, &["symbols", "default"]),
        });

        self.register_parsed_schema(&fully_qualified_name, &schema, &aliases);

        Ok(schema)
    }

    /// Parse a `serde_json::Value` representing an Avro array type into a
    /// `Schema`.
    fn parse_array(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let items = complex
            .get("items")
            .ok_or_else(|| Details::GetArrayItemsField.into())
            .and_then(|items| self.parse(items, enclosing_namespace))?;

        Ok(Schema::Array(ArraySchema {
            items: Box::new(items),
            attributes: self.get_custom_attributes(complex, &["items"]),
        }))
    }

    /// Parse a `serde_json::Value` representing an Avro map type into a
    /// `Schema`.
    fn parse_map(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let values = complex
            .get("values")
            .ok_or_else(|| Details::GetMapValuesField.into())
            .and_then(|values| self.parse(values, enclosing_namespace))?;

        Ok(Schema::Map(MapSchema {
            values: Box::new(values),
            attributes: self.get_custom_attributes(complex, &["values"]),
        }))
    }

    /// Parse a `serde_json::Value` list representing an Avro union type into a
    /// `Schema`.
    fn parse_union(
        &mut self,
        items: &[Value],
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        items
            .iter()
            .map(|v| self.parse(v, enclosing_namespace))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|schemas| {
                if schemas.len() == 1 {
                    warn!("Union schema with just one member! Consider dropping the union!");
                }
                Ok(Schema::Union(UnionSchema::new(schemas)?))
            })
    }

    /// Parse a `serde_json::Value` representing an Avro fixed type into a
    /// `Schema`.
    fn parse_fixed(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let size_opt = complex.get("size");
        if size_opt.is_none()
            && let Some(seen) = self.get_already_seen_schema(complex, enclosing_namespace)
        {
            return Ok(seen.clone());
        }

        let size = match size_opt {
            Some(size) => size
                .as_u64()
                .ok_or_else(|| Details::GetFixedSizeFieldPositive(size.clone())),
            None => Err(Details::GetFixedSizeField),
        }?;

        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        self.check_new_name(&fully_qualified_name)?;
        let aliases =
            self.fix_aliases_namespace(complex.aliases(), &fully_qualified_name.namespace)?;

        let schema = Schema::Fixed(FixedSchema {
            name: fully_qualified_name.clone(),
            aliases: aliases.clone(),
            doc: complex.doc(),
            size: size as usize,
            attributes: self.get_custom_attributes(complex, &["size"]),
        });

        self.register_parsed_schema(&fully_qualified_name, &schema, &aliases);

        Ok(schema)
    }

    // A type alias may be specified either fully namespace-qualified, or
    // relative to the namespace of the name it is an alias for. For example,
    // if a type named "a.b" has aliases of "c" and "x.y", then the fully
    // qualified names of its aliases are "a.c" and "x.y".
    //
    // Aliases are names and get the same validation as any other name.
    fn fix_aliases_namespace(
        &self,
        aliases: Option<Vec<String>>,
        namespace: &Namespace,
    ) -> AvroResult<Aliases> {
        aliases
            .map(|aliases| {
                aliases
                    .iter()
                    .map(|alias| {
                        let qualified = if alias.find('.').is_none() {
                            match namespace {
                                Some(ns) => format!("{ns}.{alias}"),
                                None => alias.clone(),
                            }
                        } else {
                            alias.clone()
                        };
                        Alias::new(qualified.as_str())
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()
    }
}
