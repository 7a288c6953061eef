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
use crate::schema::{Schema, SchemaKind};
use std::collections::{BTreeMap, HashSet};

/// A description of a Union schema.
#[derive(Debug, Clone)]
pub struct UnionSchema {
    /// The schemas that make up this union.
    pub(crate) schemas: Vec<Schema>,
    // Used to ensure uniqueness of unnamed schema inputs, and provide constant
    // time finding of the branch index given a value. Named branches are
    // distinguished by fullname instead.
    variant_index: BTreeMap<SchemaKind, usize>,
}

impl UnionSchema {
    /// Creates a new UnionSchema from a vector of schemas.
    ///
    /// # Errors
    /// Will return an error if `schemas` is empty, has duplicate unnamed
    /// schemas, repeats a named schema's fullname, or contains a union.
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        if schemas.is_empty() {
            return Err(Details::EmptyUnion.into());
        }

        let mut vindex = BTreeMap::new();
        let mut named: HashSet<String> = HashSet::new();
        for (i, schema) in schemas.iter().enumerate() {
            if let Schema::Union(_) = schema {
                return Err(Details::GetNestedUnion.into());
            }
            match schema.name() {
                Some(name) => {
                    if !named.insert(name.fullname(&None)) {
                        return Err(Details::GetUnionDuplicate.into());
                    }
                }
                None => {
                    if vindex.insert(SchemaKind::from(schema), i).is_some() {
                        return Err(Details::GetUnionDuplicate.into());
                    }
                }
            }
        }
        Ok(UnionSchema {
            schemas,
            variant_index: vindex,
        })
    }

    /// Returns a slice of all branches of this union.
    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Returns true if any of the branches of this union is `Null`.
    pub fn is_nullable(&self) -> bool {
        self.schemas.iter().any(|x| matches!(x, Schema::Null))
    }

    /// The position of the `Null` branch, if there is one.
    pub fn null_branch(&self) -> Option<usize> {
        self.variant_index.get(&SchemaKind::Null).copied()
    }
}

// No need to compare variant_index, it is derivative of schemas.
impl PartialEq for UnionSchema {
    fn eq(&self, other: &UnionSchema) -> bool {
        self.schemas.eq(&other.schemas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::test_util::TestResult;

    #[test]
    fn test_empty_union_is_invalid() {
        match UnionSchema::new(vec![]).map_err(Error::into_details) {
            Err(Details::EmptyUnion) => {}
            other => panic!("Expected Details::EmptyUnion, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_unnamed_branch_is_invalid() {
        match UnionSchema::new(vec![Schema::Int, Schema::Null, Schema::Int])
            .map_err(Error::into_details)
        {
            Err(Details::GetUnionDuplicate) => {}
            other => panic!("Expected Details::GetUnionDuplicate, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_union_is_invalid() -> TestResult {
        let inner = UnionSchema::new(vec![Schema::Null, Schema::Int])?;
        match UnionSchema::new(vec![Schema::Union(inner)]).map_err(Error::into_details) {
            Err(Details::GetNestedUnion) => Ok(()),
            other => panic!("Expected Details::GetNestedUnion, got {other:?}"),
        }
    }

    #[test]
    fn test_null_branch_lookup() -> TestResult {
        let union = UnionSchema::new(vec![Schema::String, Schema::Null])?;
        assert!(union.is_nullable());
        assert_eq!(union.null_branch(), Some(1));

        Ok(())
    }
}
