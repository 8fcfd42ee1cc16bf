//! Static record schemas.
//!
//! A schema is declared once per record type, as a `static`, and carries
//! everything the visitor needs: field names, external-name hints, key
//! membership, nested shapes, and the optional per-type hooks. Nothing is
//! looked up reflectively at encode or decode time.

use serde_json::{Map, Value};

use crate::error::{CodecError, CodecResult};
use crate::fields::{Datum, Fields};
use crate::key::{Key, KeyPart};

/// Rewrites a record's encoded object after its fields have been written.
pub type EncodeHook = fn(&mut Map<String, Value>);

/// Rewrites a raw JSON object before its fields are read.
pub type DecodeHook = fn(Map<String, Value>) -> Map<String, Value>;

/// Custom scalar serializer applied on encode.
pub type ScalarSerializer = fn(&Value) -> Value;

/// How a field is named in JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExternalName {
    /// Use the field's own name.
    Default,
    /// Use this name instead.
    Renamed(&'static str),
    /// Never written, never read.
    Omitted,
}

impl ExternalName {
    /// The JSON key for a field called `name`, or `None` if omitted.
    pub fn resolve(self, name: &'static str) -> Option<&'static str> {
        match self {
            Self::Default => Some(name),
            Self::Renamed(external) => Some(external),
            Self::Omitted => None,
        }
    }
}

/// The closed set of shapes a field value can take.
#[derive(Clone, Copy, Debug)]
pub enum FieldShape {
    Scalar,
    Record(&'static Schema),
    Sequence(&'static Schema),
}

impl FieldShape {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Record(_) => "object",
            Self::Sequence(_) => "array",
        }
    }
}

/// Static description of one field.
#[derive(Clone, Copy, Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub external: ExternalName,
    pub primary_key: bool,
    pub shape: FieldShape,
    pub serializer: Option<ScalarSerializer>,
}

impl FieldDescriptor {
    const fn with_shape(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            external: ExternalName::Default,
            primary_key: false,
            shape,
            serializer: None,
        }
    }

    pub const fn scalar(name: &'static str) -> Self {
        Self::with_shape(name, FieldShape::Scalar)
    }

    pub const fn record(name: &'static str, schema: &'static Schema) -> Self {
        Self::with_shape(name, FieldShape::Record(schema))
    }

    pub const fn sequence(name: &'static str, schema: &'static Schema) -> Self {
        Self::with_shape(name, FieldShape::Sequence(schema))
    }

    /// Mark as part of the primary key. Key fields contribute to the key in
    /// declaration order.
    pub const fn key(self) -> Self {
        Self {
            primary_key: true,
            ..self
        }
    }

    pub const fn renamed(self, external: &'static str) -> Self {
        Self {
            external: ExternalName::Renamed(external),
            ..self
        }
    }

    pub const fn omitted(self) -> Self {
        Self {
            external: ExternalName::Omitted,
            ..self
        }
    }

    pub const fn serialize_with(self, serializer: ScalarSerializer) -> Self {
        Self {
            serializer: Some(serializer),
            ..self
        }
    }

    /// JSON key this field is written under, if any.
    pub fn external_name(&self) -> Option<&'static str> {
        self.external.resolve(self.name)
    }
}

/// Static description of a record type.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldDescriptor],
    /// Set for collection records: the record itself also holds an ordered
    /// run of member records of this schema.
    pub members: Option<&'static Schema>,
    pub on_encode: Option<EncodeHook>,
    pub on_decode: Option<DecodeHook>,
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [FieldDescriptor]) -> Self {
        Self {
            name,
            fields,
            members: None,
            on_encode: None,
            on_decode: None,
        }
    }

    pub const fn with_members(self, members: &'static Schema) -> Self {
        Self {
            members: Some(members),
            ..self
        }
    }

    pub const fn on_encode(self, hook: EncodeHook) -> Self {
        Self {
            on_encode: Some(hook),
            ..self
        }
    }

    pub const fn on_decode(self, hook: DecodeHook) -> Self {
        Self {
            on_decode: Some(hook),
            ..self
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Key fields in declaration order.
    pub fn primary_key(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_key().next().is_some()
    }

    /// Fail with `SchemaViolation` unless at least one key field is declared.
    pub fn require_primary_key(&self) -> CodecResult<()> {
        if self.has_primary_key() {
            Ok(())
        } else {
            Err(CodecError::SchemaViolation {
                schema: self.name.to_owned(),
                reason: "no primary key field declared".into(),
            })
        }
    }

    /// Derive the primary key of a record from its fields.
    ///
    /// An unset key field contributes `null`.
    pub fn key_of(&self, fields: &Fields) -> CodecResult<Key> {
        self.require_primary_key()?;
        self.primary_key()
            .map(|field| {
                let path = fields.child_path(field.name);
                match fields.get(field.name) {
                    None => Ok(KeyPart::Null),
                    Some(Datum::Scalar(value)) => KeyPart::from_json(value, &path),
                    Some(_) => Err(CodecError::TypeMismatch {
                        path,
                        expected: "scalar key value".into(),
                        found: "nested record".into(),
                    }),
                }
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(Key::new)
    }
}

/// A typed record that can be described by a static [`Schema`].
///
/// Implementations only move values between the struct and [`Fields`]; all
/// naming, nesting and JSON handling is driven by the schema.
pub trait Record: Sized + 'static {
    fn schema() -> &'static Schema;

    /// Snapshot this record's set fields, keyed by internal field name.
    fn to_fields(&self) -> Fields;

    /// Build a record from decoded fields.
    fn from_fields(fields: Fields) -> CodecResult<Self>;

    /// This record's primary key.
    fn key(&self) -> CodecResult<Key> {
        Self::schema().key_of(&self.to_fields())
    }
}
