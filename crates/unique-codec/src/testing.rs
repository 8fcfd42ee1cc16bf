//! Sample record types used by this workspace's tests.

use serde_json::{Map, Value};

use crate::error::CodecResult;
use crate::fields::Fields;
use crate::schema::{FieldDescriptor, Record, Schema};

/// Flat key/value record keyed by `key`.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleKeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl SimpleKeyValue {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

static SIMPLE_KEY_VALUE_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::scalar("key").key(),
    FieldDescriptor::scalar("value"),
];

pub static SIMPLE_KEY_VALUE: Schema = Schema::new("SimpleKeyValue", &SIMPLE_KEY_VALUE_FIELDS);

impl Record for SimpleKeyValue {
    fn schema() -> &'static Schema {
        &SIMPLE_KEY_VALUE
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("key", self.key.as_str())
            .with_opt("value", self.value.as_deref())
    }

    fn from_fields(mut fields: Fields) -> CodecResult<Self> {
        Ok(Self {
            key: fields.take("key")?,
            value: fields.take_opt("value")?,
        })
    }
}

/// Record with a list of nested records and a renamed field.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiLevelKeyValue {
    pub key: String,
    pub items: Vec<SimpleKeyValue>,
    pub custom_val: Option<String>,
}

static MULTI_LEVEL_KEY_VALUE_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::scalar("key").key(),
    FieldDescriptor::sequence("items", &SIMPLE_KEY_VALUE),
    FieldDescriptor::scalar("custom_val").renamed("custval"),
];

pub static MULTI_LEVEL_KEY_VALUE: Schema =
    Schema::new("MultiLevelKeyValue", &MULTI_LEVEL_KEY_VALUE_FIELDS);

impl MultiLevelKeyValue {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.into(),
            items: Vec::new(),
            custom_val: None,
        }
    }

    pub fn with_item(mut self, key: &str, value: &str) -> Self {
        self.items.push(SimpleKeyValue::new(key, value));
        self
    }
}

impl Record for MultiLevelKeyValue {
    fn schema() -> &'static Schema {
        &MULTI_LEVEL_KEY_VALUE
    }

    fn to_fields(&self) -> Fields {
        let fields = Fields::new().with("key", self.key.as_str());
        let fields = if self.items.is_empty() {
            fields
        } else {
            fields.with_records("items", &self.items)
        };
        fields.with_opt("custom_val", self.custom_val.as_deref())
    }

    fn from_fields(mut fields: Fields) -> CodecResult<Self> {
        Ok(Self {
            key: fields.take("key")?,
            items: fields.take_records("items")?,
            custom_val: fields.take_opt("custom_val")?,
        })
    }
}

/// Record whose encoded form carries a synthetic `oid` the decoder drops.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomMarshalled {
    pub key: String,
    pub value: Option<String>,
}

fn inject_oid(map: &mut Map<String, Value>) {
    map.insert("oid".into(), Value::String("1234567".into()));
}

fn strip_oid(mut map: Map<String, Value>) -> Map<String, Value> {
    map.remove("oid");
    map
}

static CUSTOM_MARSHALLED_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::scalar("key").key().renamed("id"),
    FieldDescriptor::scalar("value"),
];

pub static CUSTOM_MARSHALLED: Schema = Schema::new("CustomMarshalled", &CUSTOM_MARSHALLED_FIELDS)
    .on_encode(inject_oid)
    .on_decode(strip_oid);

impl Record for CustomMarshalled {
    fn schema() -> &'static Schema {
        &CUSTOM_MARSHALLED
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("key", self.key.as_str())
            .with_opt("value", self.value.as_deref())
    }

    fn from_fields(mut fields: Fields) -> CodecResult<Self> {
        Ok(Self {
            key: fields.take("key")?,
            value: fields.take_opt("value")?,
        })
    }
}

/// Keyless record whose tag is lower-cased on encode.
#[derive(Clone, Debug, PartialEq)]
pub struct Tagged {
    pub tag: Option<String>,
}

impl Tagged {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: Some(tag.into()),
        }
    }
}

fn lowercase(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other.clone(),
    }
}

static TAGGED_FIELDS: [FieldDescriptor; 1] =
    [FieldDescriptor::scalar("tag").serialize_with(lowercase)];

pub static TAGGED: Schema = Schema::new("Tagged", &TAGGED_FIELDS);

impl Record for Tagged {
    fn schema() -> &'static Schema {
        &TAGGED
    }

    fn to_fields(&self) -> Fields {
        Fields::new().with_opt("tag", self.tag.as_deref())
    }

    fn from_fields(mut fields: Fields) -> CodecResult<Self> {
        Ok(Self {
            tag: fields.take_opt("tag")?,
        })
    }
}

/// Collection record: a label plus a run of [`Tagged`] members.
#[derive(Clone, Debug, PartialEq)]
pub struct TaggedList {
    pub label: Option<String>,
    pub members: Vec<Tagged>,
}

static TAGGED_LIST_FIELDS: [FieldDescriptor; 1] = [FieldDescriptor::scalar("label")];

pub static TAGGED_LIST: Schema = Schema::new("TaggedList", &TAGGED_LIST_FIELDS).with_members(&TAGGED);

impl Record for TaggedList {
    fn schema() -> &'static Schema {
        &TAGGED_LIST
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with_opt("label", self.label.as_deref())
            .with_members(&self.members)
    }

    fn from_fields(mut fields: Fields) -> CodecResult<Self> {
        Ok(Self {
            label: fields.take_opt("label")?,
            members: fields.take_members()?,
        })
    }
}

/// Integer-keyed record holding one nested record and a hidden field.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub id: i64,
    pub body: Option<SimpleKeyValue>,
    pub scratch: Option<String>,
}

static ENVELOPE_FIELDS: [FieldDescriptor; 3] = [
    FieldDescriptor::scalar("id").key(),
    FieldDescriptor::record("body", &SIMPLE_KEY_VALUE),
    FieldDescriptor::scalar("scratch").omitted(),
];

pub static ENVELOPE: Schema = Schema::new("Envelope", &ENVELOPE_FIELDS);

impl Record for Envelope {
    fn schema() -> &'static Schema {
        &ENVELOPE
    }

    fn to_fields(&self) -> Fields {
        let fields = Fields::new()
            .with("id", self.id)
            .with_opt("scratch", self.scratch.as_deref());
        match &self.body {
            Some(body) => fields.with_record("body", body),
            None => fields,
        }
    }

    fn from_fields(mut fields: Fields) -> CodecResult<Self> {
        Ok(Self {
            id: fields.take("id")?,
            body: fields.take_record("body")?,
            scratch: fields.take_opt("scratch")?,
        })
    }
}
