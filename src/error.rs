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

//! Error types for schema parsing, validation, the binary codec and schema
//! resolution.

use crate::{
    schema::{Name, SchemaKind},
    types::ValueKind,
};
use std::fmt;

/// The error returned by every fallible operation in this crate.
///
/// The payload is boxed so that `Result<T, Error>` stays a single word wide;
/// use [`details`](Self::details) or [`into_details`](Self::into_details) to
/// inspect the precise failure.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// The broad category of this error, one per failure family.
    pub fn category(&self) -> ErrorCategory {
        self.details.category()
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

/// The failure families of the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A schema description could not be parsed into a type graph.
    Schema,
    /// A value failed validation during a strict encode or clone.
    Validation,
    /// Encoded data was malformed or truncated.
    Decode,
    /// A writer/reader schema pair could not be resolved.
    Resolve,
    /// An argument was used with the wrong receiver.
    Argument,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Schema => "schema",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Decode => "decode",
            ErrorCategory::Resolve => "resolve",
            ErrorCategory::Argument => "argument",
        };
        f.write_str(name)
    }
}

/// All errors this crate can produce.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Details {
    // Schema errors
    #[error("Failed to parse schema from JSON: {0}")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown type: {0}")]
    ParsePrimitive(String),

    #[error("Unknown type: {0}. Did you mean '{1}'?")]
    ParsePrimitiveSimilar(String, &'static str),

    #[error("Two named schemas with the same fullname: {0}")]
    NameCollision(String),

    #[error("Cannot redefine the primitive type name {0:?}")]
    PrimitiveRedefinition(String),

    #[error("Invalid name {0:?}: does not match {1}")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid namespace {0:?}: does not match {1}")]
    InvalidNamespace(String, &'static str),

    #[error("Invalid enum symbol name {0}")]
    EnumSymbolName(String),

    #[error("Invalid record field name {0}")]
    FieldName(String),

    #[error("Duplicate enum symbol {0}")]
    EnumSymbolDuplicate(String),

    #[error("Duplicate field name {0}")]
    FieldNameDuplicate(String),

    #[error("No `name` field")]
    GetNameField,

    #[error("No `name` in record field")]
    GetNameFieldFromRecord,

    #[error("No `type` in record field")]
    GetRecordFieldTypeField,

    #[error("The `fields` of a record must be a JSON array")]
    GetRecordFieldsJson,

    #[error("The `symbols` field of an enum must be a JSON array of strings")]
    GetEnumSymbolsField,

    #[error("The `default` of an enum must be a string, got: {0}")]
    EnumDefaultWrongType(serde_json::Value),

    #[error("No `items` in array")]
    GetArrayItemsField,

    #[error("No `values` in map")]
    GetMapValuesField,

    #[error("No `size` in fixed")]
    GetFixedSizeField,

    #[error("The `size` of a fixed must be a non-negative integer: {0}")]
    GetFixedSizeFieldPositive(serde_json::Value),

    #[error("Unions cannot be empty")]
    EmptyUnion,

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types")]
    GetUnionDuplicate,

    #[error("Expected a type name, got {0}")]
    GetComplexType(serde_json::Value),

    #[error("No `type` field")]
    GetComplexTypeField,

    #[error("Default value for field {field:?} of {record} does not match its schema: {value}")]
    GetDefaultRecordField {
        field: String,
        record: String,
        value: serde_json::Value,
    },

    #[error("Default value of union field {field:?} must match its first branch ({kind})")]
    GetDefaultUnion { field: String, kind: SchemaKind },

    #[error("Unresolved schema reference: {0}")]
    SchemaResolutionError(Name),

    #[error("Two schemas with the same fullname were defined: {0}")]
    AmbiguousSchemaDefinition(Name),

    // Validation errors
    #[error("Value does not match schema")]
    Validation,

    #[error("Value {value_kind} does not match schema {schema_kind}: {reason}")]
    ValidationWithReason {
        value_kind: ValueKind,
        schema_kind: SchemaKind,
        reason: String,
    },

    #[error("Cannot encode value of kind {value_kind} with schema of kind {supported_schema:?}")]
    EncodeValueAsSchemaError {
        value_kind: ValueKind,
        supported_schema: Vec<SchemaKind>,
    },

    #[error("Missing field in record: {0:?}")]
    GetField(String),

    #[error("Enum symbol not found: {0}")]
    GetEnumSymbol(String),

    // Decode errors
    #[error("Invalid byte for boolean: {0}")]
    BoolValue(u8),

    #[error("Variable-length integer does not terminate within 10 bytes")]
    IntegerOverflow,

    #[error("The decoded long {1} cannot fit in an int: {0}")]
    ZagI32(#[source] std::num::TryFromIntError, i64),

    #[error("Unexpected end of data: needed {needed} more byte(s), {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Invalid utf-8 string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Union branch index {index} out of bounds: {num_variants}")]
    GetUnionVariant { index: i64, num_variants: usize },

    #[error("Enum ordinal {index} out of bounds: {num_symbols}")]
    GetEnumValue { index: i64, num_symbols: usize },

    #[error("Writer symbol {symbol:?} does not exist in the reader enum {reader}")]
    ResolveEnumSymbol { symbol: String, reader: Name },

    #[error("Negative length: {0}")]
    NegativeLength(i64),

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Buffer holds {0} trailing byte(s) after the decoded value")]
    TrailingBytes(usize),

    // Resolve errors
    #[error("Writer schema {writer} cannot be read with reader schema {reader}")]
    Incompatible {
        writer: SchemaKind,
        reader: SchemaKind,
    },

    #[error("Writer name {writer} matches neither the reader name {reader} nor its aliases")]
    IncompatibleNames { writer: Name, reader: Name },

    #[error("Fixed {name} sizes differ: writer is {writer}, reader is {reader}")]
    FixedSizeMismatch {
        name: Name,
        writer: usize,
        reader: usize,
    },

    #[error("Reader field {field:?} has no writer counterpart and no default")]
    MissingDefault { field: String },

    #[error("Multiple writer fields match reader field {field:?} through its aliases")]
    AmbiguousFieldAlias { field: String },

    #[error("No branch of the reader union can read writer schema {writer}")]
    NoCompatibleUnionBranch { writer: SchemaKind },

    #[error("Writer and reader enums share no symbol")]
    NoCommonEnumSymbol,

    // Argument errors
    #[error("The resolver was compiled for a different reader schema")]
    ResolverMismatch,

    #[error("Cannot build a value of kind {value_kind} from JSON: {json}")]
    GetValueFromJson {
        value_kind: SchemaKind,
        json: serde_json::Value,
    },

    #[error("Code point {0} is out of the byte range expected for bytes/fixed data")]
    CodePointOutOfRange(u32),
}

impl Details {
    /// The broad category of this failure.
    pub fn category(&self) -> ErrorCategory {
        use Details::*;
        match self {
            ParseSchemaJson(_) | ParseSchemaFromValidJson | ParsePrimitive(_)
            | ParsePrimitiveSimilar(..) | NameCollision(_) | PrimitiveRedefinition(_)
            | InvalidSchemaName(..) | InvalidNamespace(..) | EnumSymbolName(_) | FieldName(_)
            | EnumSymbolDuplicate(_) | FieldNameDuplicate(_) | GetNameField
            | GetNameFieldFromRecord | GetRecordFieldTypeField | GetRecordFieldsJson
            | GetEnumSymbolsField | EnumDefaultWrongType(_) | GetArrayItemsField
            | GetMapValuesField | GetFixedSizeField
            | GetFixedSizeFieldPositive(_) | EmptyUnion | GetNestedUnion | GetUnionDuplicate
            | GetComplexType(_) | GetComplexTypeField | GetDefaultRecordField { .. }
            | GetDefaultUnion { .. } | SchemaResolutionError(_)
            | AmbiguousSchemaDefinition(_) => ErrorCategory::Schema,

            Validation | ValidationWithReason { .. } | EncodeValueAsSchemaError { .. }
            | GetField(_) | GetEnumSymbol(_) => ErrorCategory::Validation,

            BoolValue(_) | IntegerOverflow | ZagI32(..) | UnexpectedEof { .. }
            | ConvertToUtf8(_) | GetUnionVariant { .. } | GetEnumValue { .. }
            | ResolveEnumSymbol { .. } | NegativeLength(_) | MemoryAllocation { .. }
            | TrailingBytes(_) => ErrorCategory::Decode,

            Incompatible { .. } | IncompatibleNames { .. } | FixedSizeMismatch { .. }
            | MissingDefault { .. } | AmbiguousFieldAlias { .. }
            | NoCompatibleUnionBranch { .. } | NoCommonEnumSymbol => ErrorCategory::Resolve,

            ResolverMismatch | GetValueFromJson { .. } | CodePointOutOfRange(_) => {
                ErrorCategory::Argument
            }
        }
    }
}
