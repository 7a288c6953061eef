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

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use crate::{
    AvroResult, Error, Schema,
    error::Details,
    util::MapHelper,
    validator::{validate_namespace, validate_schema_name},
};

/// Represents documentation for named Avro schemas and record fields.
pub type Documentation = Option<String>;
/// Represents the aliases of a named schema.
pub type Aliases = Option<Vec<Alias>>;
/// Represents schema lookup within a parsed schema.
pub type Names = HashMap<Name, Schema>;
/// Represents schema lookup within a schema, by reference.
pub type NamesRef<'a> = HashMap<Name, &'a Schema>;
/// Represents the namespace of a named schema.
pub type Namespace = Option<String>;

/// Represents names for `record`, `enum` and `fixed` Avro schemas.
///
/// Each of these schemas has a `fullname` composed of two parts:
///   * a name
///   * a namespace
///
/// `aliases` can also be defined to facilitate schema evolution.
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct Name {
    /// The name part, without any dots in it.
    pub name: String,
    /// The namespace, if any.
    pub namespace: Namespace,
}

impl Name {
    /// Create a new `Name`, parsing the optional namespace out of the string.
    pub fn new(name: &str) -> AvroResult<Self> {
        let (name, namespace) = Name::get_name_and_namespace(name)?;
        Ok(Self {
            name,
            namespace: namespace.filter(|ns| !ns.is_empty()),
        })
    }

    fn get_name_and_namespace(name: &str) -> AvroResult<(String, Namespace)> {
        let index_of_name = validate_schema_name(name)?;
        if index_of_name == 0 {
            Ok((name.to_string(), None))
        } else {
            Ok((
                name[index_of_name..].to_string(),
                Some(name[..index_of_name - 1].to_string()),
            ))
        }
    }

    /// Parse a `serde_json::Value` map into a `Name`, inheriting the enclosing
    /// namespace when neither a `namespace` field nor a dotted name supplies
    /// one.
    pub(crate) fn parse(
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Self> {
        let (name, namespace_from_name) = complex
            .name()
            .map(|name| Name::get_name_and_namespace(name.as_str()))
            .ok_or(Details::GetNameField)??;

        let namespace = namespace_from_name
            .or_else(|| {
                complex
                    .string("namespace")
                    .or_else(|| enclosing_namespace.clone())
            })
            .filter(|ns| !ns.is_empty());

        if let Some(ref ns) = namespace {
            validate_namespace(ns)?;
        }

        Ok(Self { name, namespace })
    }

    /// Return the `fullname` of this `Name`.
    pub fn fullname(&self, default_namespace: &Namespace) -> String {
        if self.name.contains('.') {
            self.name.clone()
        } else {
            let namespace = self.namespace.clone().or_else(|| default_namespace.clone());

            match namespace {
                Some(ref namespace) if !namespace.is_empty() => {
                    format!("{}.{}", namespace, self.name)
                }
                _ => self.name.clone(),
            }
        }
    }

    /// Construct the fully qualified name, inheriting `enclosing_namespace`
    /// when this name has none of its own.
    pub fn fully_qualified_name(&self, enclosing_namespace: &Namespace) -> Name {
        Name {
            name: self.name.clone(),
            namespace: self
                .namespace
                .clone()
                .or_else(|| enclosing_namespace.clone().filter(|ns| !ns.is_empty())),
        }
    }
}

impl TryFrom<&str> for Name {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Name::new(value)
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Name");
        debug.field("name", &self.name);
        if let Some(ref namespace) = self.namespace {
            debug.field("namespace", namespace);
            debug.finish()
        } else {
            debug.finish_non_exhaustive()
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fullname(&None))
    }
}

/// Newtype around `Name` for aliases, serialized as plain strings in the JSON
/// representation.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Alias(Name);

impl Alias {
    pub fn new(name: &str) -> AvroResult<Self> {
        Name::new(name).map(Self)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn namespace(&self) -> &Namespace {
        &self.0.namespace
    }

    pub fn fullname(&self, default_namespace: &Namespace) -> String {
        self.0.fullname(default_namespace)
    }

    pub fn fully_qualified_name(&self, default_namespace: &Namespace) -> Name {
        self.0.fully_qualified_name(default_namespace)
    }
}

impl TryFrom<&str> for Alias {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Alias::new(value)
    }
}

impl FromStr for Alias {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Alias::new(s)
    }
}

impl Serialize for Alias {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.fullname(&None))
    }
}
