//! Dynamic field carrier between typed records and the JSON visitor.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{describe, CodecError, CodecResult};
use crate::schema::Record;

/// The value of one field, in one of the three shapes a schema allows.
#[derive(Clone, Debug, PartialEq)]
pub enum Datum {
    Scalar(Value),
    Record(Fields),
    Sequence(Vec<Fields>),
}

impl Datum {
    fn describe(&self) -> String {
        match self {
            Self::Scalar(value) => describe(value),
            Self::Record(_) => "nested record".into(),
            Self::Sequence(items) => format!("sequence of {}", items.len()),
        }
    }
}

/// The set fields of one record, keyed by internal field name.
///
/// Decoded `Fields` remember where in the document they came from, so that
/// extraction errors name the full field path (`items[1].value`).
#[derive(Clone, Debug, Default)]
pub struct Fields {
    path: String,
    values: BTreeMap<String, Datum>,
    members: Option<Vec<Fields>>,
}

impl PartialEq for Fields {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.members == other.members
    }
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn at(path: String) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    /// Location of this record in the decoded document; empty at top level.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_owned()
        } else {
            format!("{}.{name}", self.path)
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.members.is_none()
    }

    pub fn get(&self, name: &str) -> Option<&Datum> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, datum: Datum) {
        self.values.insert(name.into(), datum);
    }

    pub fn remove(&mut self, name: &str) -> Option<Datum> {
        self.values.remove(name)
    }

    pub fn members(&self) -> Option<&[Fields]> {
        self.members.as_deref()
    }

    pub(crate) fn set_members(&mut self, members: Vec<Fields>) {
        self.members = Some(members);
    }

    // ---------------------------------------------------------------
    // Building (record -> fields)
    // ---------------------------------------------------------------

    /// Set a scalar field.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, Datum::Scalar(value.into()));
        self
    }

    /// Set a scalar field if `value` is present; leave it unset otherwise.
    pub fn with_opt(self, name: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn with_record<R: Record>(mut self, name: &str, record: &R) -> Self {
        self.insert(name, Datum::Record(record.to_fields()));
        self
    }

    pub fn with_records<R: Record>(mut self, name: &str, records: &[R]) -> Self {
        self.insert(
            name,
            Datum::Sequence(records.iter().map(Record::to_fields).collect()),
        );
        self
    }

    /// Attach the member run of a collection record.
    pub fn with_members<R: Record>(mut self, members: &[R]) -> Self {
        self.members = Some(members.iter().map(Record::to_fields).collect());
        self
    }

    // ---------------------------------------------------------------
    // Extraction (fields -> record)
    // ---------------------------------------------------------------

    fn take_scalar(&mut self, name: &str) -> CodecResult<Option<Value>> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(Datum::Scalar(value)) => Ok(Some(value)),
            Some(other) => Err(CodecError::TypeMismatch {
                path: self.child_path(name),
                expected: "scalar".into(),
                found: other.describe(),
            }),
        }
    }

    fn coerce<T: DeserializeOwned>(&self, name: &str, value: Value) -> CodecResult<T> {
        serde_json::from_value(value.clone()).map_err(|_| {
            CodecError::mismatch(self.child_path(name), std::any::type_name::<T>(), &value)
        })
    }

    /// Take a required scalar field.
    pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> CodecResult<T> {
        match self.take_scalar(name)? {
            Some(value) => self.coerce(name, value),
            None => Err(CodecError::TypeMismatch {
                path: self.child_path(name),
                expected: std::any::type_name::<T>().into(),
                found: "nothing".into(),
            }),
        }
    }

    /// Take an optional scalar field; unset and `null` both yield `None`.
    pub fn take_opt<T: DeserializeOwned>(&mut self, name: &str) -> CodecResult<Option<T>> {
        match self.take_scalar(name)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.coerce(name, value).map(Some),
        }
    }

    pub fn take_or_default<T: DeserializeOwned + Default>(&mut self, name: &str) -> CodecResult<T> {
        Ok(self.take_opt(name)?.unwrap_or_default())
    }

    /// Take a nested record field.
    pub fn take_record<R: Record>(&mut self, name: &str) -> CodecResult<Option<R>> {
        match self.values.remove(name) {
            None => Ok(None),
            Some(Datum::Record(fields)) => R::from_fields(fields).map(Some),
            Some(other) => Err(CodecError::TypeMismatch {
                path: self.child_path(name),
                expected: "nested record".into(),
                found: other.describe(),
            }),
        }
    }

    /// Take a sequence-of-records field; unset yields an empty vector.
    pub fn take_records<R: Record>(&mut self, name: &str) -> CodecResult<Vec<R>> {
        match self.values.remove(name) {
            None => Ok(Vec::new()),
            Some(Datum::Sequence(items)) => items.into_iter().map(R::from_fields).collect(),
            Some(other) => Err(CodecError::TypeMismatch {
                path: self.child_path(name),
                expected: "sequence of records".into(),
                found: other.describe(),
            }),
        }
    }

    /// Take the member run of a collection record.
    pub fn take_members<R: Record>(&mut self) -> CodecResult<Vec<R>> {
        self.members
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(R::from_fields)
            .collect()
    }
}
