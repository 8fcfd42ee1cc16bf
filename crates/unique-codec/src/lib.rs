//! Schema-driven marshaling between typed records and JSON.
//!
//! A record type describes itself once, statically, with a [`Schema`]: an
//! ordered list of [`FieldDescriptor`]s naming each field, its external JSON
//! name, whether it is part of the primary key, and whether it holds a
//! scalar, a nested record, or a sequence of nested records. The [`Record`]
//! trait bridges a Rust struct to the dynamic [`Fields`] carrier, and
//! [`JsonRecordIo`] walks schema and fields together to produce or consume
//! canonical JSON. No per-type IO code is needed beyond the two hooks a
//! schema may declare.
//!
//! Encoded output is pretty-printed with four-space indentation and sorted
//! keys. The bytes are content-addressed downstream, so logically equal
//! records must always encode identically.

pub mod error;
pub mod fields;
pub mod json;
pub mod key;
pub mod schema;

#[cfg(any(test, feature = "test-records"))]
pub mod testing;

pub use error::{CodecError, CodecResult};
pub use fields::{Datum, Fields};
pub use json::{to_canonical_string, Decoded, JsonRecordIo, AGGREGATE_KEY};
pub use key::{Key, KeyPart};
pub use schema::{
    DecodeHook, EncodeHook, ExternalName, FieldDescriptor, FieldShape, Record, ScalarSerializer,
    Schema,
};

pub use serde_json::{Map, Value};
