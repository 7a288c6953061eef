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
    EnumSchema, FixedSchema, NamesRef, Namespace, RecordSchema, Schema, UnionSchema,
};
use crate::{AvroResult, Error};

/// The name table of a schema: every named type in the graph, keyed by its
/// fully qualified name (and by each of its alias fullnames), borrowed from
/// the schema itself.
#[derive(Debug)]
pub struct ResolvedSchema<'s> {
    names_ref: NamesRef<'s>,
    root: &'s Schema,
}

impl<'s> TryFrom<&'s Schema> for ResolvedSchema<'s> {
    type Error = Error;

    fn try_from(schema: &'s Schema) -> AvroResult<Self> {
        let mut rs = ResolvedSchema {
            names_ref: NamesRef::new(),
            root: schema,
        };
        rs.resolve(schema, &None)?;
        Ok(rs)
    }
}

impl<'s> ResolvedSchema<'s> {
    pub fn get_root_schema(&self) -> &'s Schema {
        self.root
    }

    pub fn get_names(&self) -> &NamesRef<'s> {
        &self.names_ref
    }

    fn register(&mut self, schema: &'s Schema, enclosing_namespace: &Namespace) -> AvroResult<()> {
        let name = schema.name().expect("Only named schemas are registered");
        let fully_qualified_name = name.fully_qualified_name(enclosing_namespace);
        if self
            .names_ref
            .insert(fully_qualified_name.clone(), schema)
            .is_some()
        {
            return Err(Details::AmbiguousSchemaDefinition(fully_qualified_name).into());
        }
        if let Some(aliases) = schema.aliases() {
            for alias in aliases {
                let alias_name = alias.fully_qualified_name(&fully_qualified_name.namespace);
                self.names_ref.insert(alias_name, schema);
            }
        }
        Ok(())
    }

    fn resolve(&mut self, schema: &'s Schema, enclosing_namespace: &Namespace) -> AvroResult<()> {
        match schema {
            Schema::Array(inner) => self.resolve(&inner.items, enclosing_namespace),
            Schema::Map(inner) => self.resolve(&inner.values, enclosing_namespace),
            Schema::Union(UnionSchema { schemas, .. }) => {
                for schema in schemas {
                    self.resolve(schema, enclosing_namespace)?;
                }
                Ok(())
            }
            Schema::Enum(EnumSchema { .. }) | Schema::Fixed(FixedSchema { .. }) => {
                self.register(schema, enclosing_namespace)
            }
            Schema::Record(RecordSchema { name, fields, .. }) => {
                self.register(schema, enclosing_namespace)?;
                let record_namespace = name.fully_qualified_name(enclosing_namespace).namespace;
                for field in fields {
                    self.resolve(&field.schema, &record_namespace)?;
                }
                Ok(())
            }
            Schema::Ref { name } => {
                let fully_qualified_name = name.fully_qualified_name(enclosing_namespace);
                if self.names_ref.contains_key(&fully_qualified_name) {
                    Ok(())
                } else {
                    Err(Details::SchemaResolutionError(fully_qualified_name).into())
                }
            }
            _ => Ok(()),
        }
    }
}
