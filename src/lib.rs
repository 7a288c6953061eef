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

//! A self-contained Avro type system and codec: schemas parse into an
//! immutable type graph, values validate and travel through Avro's compact
//! binary encoding, and writer/reader schema pairs resolve into reusable
//! decoders for forward- and backward-compatible reads.
//!
//! All I/O happens against contiguous byte buffers; there are no file
//! containers, RPC mechanics or streaming adapters here.
//!
//! # Parsing a schema and round-tripping a value
//!
//! ```
//! use avrolite::{Schema, types::Value};
//!
//! # fn main() -> Result<(), avrolite::Error> {
//! let schema = Schema::parse_str(r#"
//!     {
//!         "type": "record",
//!         "name": "Person",
//!         "fields": [
//!             {"name": "name", "type": "string"},
//!             {"name": "age", "type": "int", "default": 25}
//!         ]
//!     }
//! "#)?;
//!
//! let value = Value::Record(vec![
//!     ("name".to_string(), Value::String("ann".to_string())),
//!     ("age".to_string(), Value::Int(30)),
//! ]);
//! let buffer = schema.to_buffer(&value)?;
//! assert_eq!(schema.from_buffer(&buffer)?, value);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema resolution
//!
//! ```
//! use avrolite::{Schema, types::Value};
//!
//! # fn main() -> Result<(), avrolite::Error> {
//! let writer = Schema::parse_str("\"int\"")?;
//! let reader = Schema::parse_str(r#"["null", "int"]"#)?;
//!
//! let resolver = reader.create_resolver(&writer)?;
//! let buffer = writer.to_buffer(&Value::Int(123))?;
//! assert_eq!(
//!     reader.from_buffer_resolved(&buffer, &resolver)?,
//!     Value::Union(1, Box::new(Value::Int(123))),
//! );
//! # Ok(())
//! # }
//! ```

mod decode;
mod encode;
mod random;
mod resolver;
mod validator;

pub mod error;
pub mod schema;
pub mod tap;
pub mod types;
pub mod util;

pub use error::{Error, ErrorCategory};
pub use resolver::Resolver;
pub use schema::{Schema, SchemaFingerprint};
pub use tap::{ReadTap, WriteTap};
pub use types::{CloneOptions, Record, Value, ValueReadOptions};

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;

#[cfg(test)]
pub(crate) mod test_util {
    /// The result type used by the test suites.
    pub type TestResult = Result<(), Box<dyn std::error::Error>>;
}
