//! The JSON marshaling visitor.
//!
//! Encoding walks a record's [`Schema`] alongside its [`Fields`]. Each node
//! contributes a map of named fields and, for sequences and collection
//! records, an aggregate of encoded members. The two are merged by one rule:
//! a node that produced any named output embeds its aggregate under
//! [`AGGREGATE_KEY`]; a node that produced none *is* its aggregate.
//!
//! Decoding is the reverse walk, with one asymmetry: a JSON array is always
//! read as a run of sibling records of the requested type, never as the
//! bare aggregate of a collection record.

use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{CodecError, CodecResult};
use crate::fields::{Datum, Fields};
use crate::schema::{FieldShape, Record, Schema};

/// Key under which a node's aggregate is embedded when it also has named
/// fields.
pub const AGGREGATE_KEY: &str = "values";

const INDENT: &[u8] = b"    ";

/// Result of decoding a document that may hold one record or many.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded<R> {
    /// The document was a single JSON object.
    One(R),
    /// The document was a JSON array.
    Many(Vec<R>),
}

impl<R> Decoded<R> {
    pub fn into_vec(self) -> Vec<R> {
        match self {
            Self::One(record) => vec![record],
            Self::Many(records) => records,
        }
    }

    /// The single record, or the first of many. Callers expecting exactly
    /// one record must check the count themselves.
    pub fn into_first(self) -> Option<R> {
        self.into_vec().into_iter().next()
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Schema-driven JSON encoder and decoder.
pub struct JsonRecordIo;

impl JsonRecordIo {
    // ---------------------------------------------------------------
    // Encode
    // ---------------------------------------------------------------

    /// Encode one record to a JSON value.
    pub fn encode_value<R: Record>(record: &R) -> CodecResult<Value> {
        encode_fields(R::schema(), &record.to_fields())
    }

    /// Encode one record to canonical JSON text.
    pub fn encode_str<R: Record>(record: &R) -> CodecResult<String> {
        to_canonical_string(&Self::encode_value(record)?)
    }

    /// Encode a run of records to a canonical JSON array, the page format.
    pub fn encode_many_str<R: Record>(records: &[R]) -> CodecResult<String> {
        let items = records
            .iter()
            .map(Self::encode_value)
            .collect::<CodecResult<Vec<_>>>()?;
        to_canonical_string(&Value::Array(items))
    }

    // ---------------------------------------------------------------
    // Decode
    // ---------------------------------------------------------------

    /// Decode a JSON value: an object yields one record, an array yields
    /// one record per element.
    pub fn decode_value<R: Record>(value: Value) -> CodecResult<Decoded<R>> {
        let schema = R::schema();
        match value {
            Value::Object(map) => {
                R::from_fields(decode_object(schema, map, String::new())?).map(Decoded::One)
            }
            Value::Array(items) => decode_elements(schema, items, "")?
                .into_iter()
                .map(R::from_fields)
                .collect::<CodecResult<Vec<_>>>()
                .map(Decoded::Many),
            other => Err(CodecError::mismatch("", "object or array", &other)),
        }
    }

    /// Parse and decode JSON text.
    pub fn decode_str<R: Record>(data: impl AsRef<[u8]>) -> CodecResult<Decoded<R>> {
        Self::decode_value(parse(data.as_ref())?)
    }

    /// Parse and decode JSON text that must be an array of records.
    pub fn decode_many_str<R: Record>(data: impl AsRef<[u8]>) -> CodecResult<Vec<R>> {
        match parse(data.as_ref())? {
            value @ Value::Array(_) => Ok(Self::decode_value(value)?.into_vec()),
            other => Err(CodecError::mismatch("", "array of records", &other)),
        }
    }
}

fn parse(data: &[u8]) -> CodecResult<Value> {
    serde_json::from_slice(data).map_err(|e| CodecError::Parse(e.to_string()))
}

fn element_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

fn field_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{path}.{name}")
    }
}

/// Merge a node's named output with its aggregate.
fn reduce(named: Map<String, Value>, aggregated: Option<Vec<Value>>) -> Value {
    if named.is_empty() {
        return match aggregated {
            Some(items) => Value::Array(items),
            None => Value::Object(named),
        };
    }
    let mut named = named;
    if let Some(items) = aggregated.filter(|items| !items.is_empty()) {
        named.insert(AGGREGATE_KEY.to_owned(), Value::Array(items));
    }
    Value::Object(named)
}

fn encode_sequence(schema: &Schema, items: &[Fields]) -> CodecResult<Value> {
    let encoded = items
        .iter()
        .map(|item| encode_fields(schema, item))
        .collect::<CodecResult<Vec<_>>>()?;
    Ok(reduce(Map::new(), Some(encoded)))
}

fn encode_fields(schema: &Schema, fields: &Fields) -> CodecResult<Value> {
    let mut named = Map::new();
    for field in schema.fields {
        let Some(external) = field.external_name() else {
            continue;
        };
        let Some(datum) = fields.get(field.name) else {
            continue;
        };
        let value = match (&field.shape, datum) {
            (FieldShape::Scalar, Datum::Scalar(value)) => match field.serializer {
                Some(serialize) => serialize(value),
                None => value.clone(),
            },
            (FieldShape::Record(nested), Datum::Record(inner)) => encode_fields(nested, inner)?,
            (FieldShape::Sequence(nested), Datum::Sequence(items)) => {
                encode_sequence(nested, items)?
            }
            (shape, _) => {
                return Err(CodecError::TypeMismatch {
                    path: field_path(schema.name, field.name),
                    expected: shape.describe().into(),
                    found: "a value of another shape".into(),
                })
            }
        };
        named.insert(external.to_owned(), value);
    }

    if let Some(hook) = schema.on_encode {
        hook(&mut named);
    }

    let aggregated = match (schema.members, fields.members()) {
        (Some(member_schema), Some(members)) => Some(
            members
                .iter()
                .map(|m| encode_fields(member_schema, m))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        _ => None,
    };

    Ok(reduce(named, aggregated))
}

fn decode_elements(schema: &Schema, items: Vec<Value>, path: &str) -> CodecResult<Vec<Fields>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let item_path = element_path(path, i);
            match item {
                Value::Object(map) => decode_object(schema, map, item_path),
                other => Err(CodecError::mismatch(item_path, "object", &other)),
            }
        })
        .collect()
}

fn decode_object(schema: &Schema, map: Map<String, Value>, path: String) -> CodecResult<Fields> {
    let mut map = match schema.on_decode {
        Some(hook) => hook(map),
        None => map,
    };
    let mut fields = Fields::at(path);

    for field in schema.fields {
        let Some(external) = field.external_name() else {
            continue;
        };
        let Some(value) = map.remove(external) else {
            continue;
        };
        let child = fields.child_path(field.name);
        let datum = match (field.shape, value) {
            (FieldShape::Scalar, value) => Datum::Scalar(value),
            (FieldShape::Record(_) | FieldShape::Sequence(_), Value::Null) => continue,
            (FieldShape::Record(nested), Value::Object(inner)) => {
                Datum::Record(decode_object(nested, inner, child)?)
            }
            (FieldShape::Sequence(nested), Value::Array(items)) => {
                Datum::Sequence(decode_elements(nested, items, &child)?)
            }
            (shape, other) => return Err(CodecError::mismatch(child, shape.describe(), &other)),
        };
        fields.insert(field.name, datum);
    }

    if let Some(member_schema) = schema.members {
        match map.remove(AGGREGATE_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                let members_path = fields.child_path(AGGREGATE_KEY);
                let members = decode_elements(member_schema, items, &members_path)?;
                fields.set_members(members);
            }
            Some(other) => {
                return Err(CodecError::mismatch(
                    fields.child_path(AGGREGATE_KEY),
                    "array",
                    &other,
                ))
            }
        }
    }

    if !map.is_empty() {
        trace!(
            schema = schema.name,
            ignored = ?map.keys().collect::<Vec<_>>(),
            "unknown keys ignored on decode"
        );
    }
    Ok(fields)
}

/// Rebuild every object with its keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        scalar => scalar,
    }
}

/// Four-space pretty printing that writes every non-ASCII character as a
/// `\uXXXX` escape, with surrogate pairs above the basic plane.
struct AsciiFormatter(PrettyFormatter<'static>);

impl AsciiFormatter {
    fn new() -> Self {
        Self(PrettyFormatter::with_indent(INDENT))
    }
}

impl Formatter for AsciiFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (pos, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..pos].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = pos + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Pretty JSON with four-space indentation, sorted keys and ASCII-only text.
pub fn to_canonical_string(value: &Value) -> CodecResult<String> {
    let canonical = canonicalize(value.clone());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter::new());
    canonical
        .serialize(&mut ser)
        .map_err(|e| CodecError::Serialization(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| CodecError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        CustomMarshalled, Envelope, MultiLevelKeyValue, SimpleKeyValue, Tagged, TaggedList,
    };
    use proptest::prelude::*;
    use serde_json::json;

    fn casper() -> MultiLevelKeyValue {
        MultiLevelKeyValue {
            key: "Casper".into(),
            items: vec![
                SimpleKeyValue::new("toast", "Charlie_Brown"),
                SimpleKeyValue::new("ham", "Lucy"),
                SimpleKeyValue::new("spam", "Franklin"),
            ],
            custom_val: Some("Minotaur".into()),
        }
    }

    #[test]
    fn simple_record_exact_bytes() {
        let sk = SimpleKeyValue::new("Bob", "bill");
        let encoded = JsonRecordIo::encode_str(&sk).unwrap();
        assert_eq!(encoded, "{\n    \"key\": \"Bob\",\n    \"value\": \"bill\"\n}");

        let decoded = JsonRecordIo::decode_str::<SimpleKeyValue>(&encoded).unwrap();
        assert_eq!(decoded, Decoded::One(sk));
    }

    #[test]
    fn multi_level_roundtrip_honours_external_name() {
        let mlkv = casper();
        let value = JsonRecordIo::encode_value(&mlkv).unwrap();
        assert_eq!(value["custval"], json!("Minotaur"));
        assert!(value.get("custom_val").is_none());
        assert_eq!(value["items"][1], json!({"key": "ham", "value": "Lucy"}));

        let encoded = JsonRecordIo::encode_str(&mlkv).unwrap();
        let decoded = JsonRecordIo::decode_str::<MultiLevelKeyValue>(&encoded)
            .unwrap()
            .into_first()
            .unwrap();
        assert_eq!(decoded, mlkv);
    }

    #[test]
    fn nested_sequence_field_encodes_as_bare_array() {
        // A sequence node has no named fields of its own, so the reduce
        // rule returns the aggregate directly rather than wrapping it.
        let value = JsonRecordIo::encode_value(&casper()).unwrap();
        assert!(value["items"].is_array());
        assert!(value.get(AGGREGATE_KEY).is_none());
    }

    #[test]
    fn nested_record_field_and_omitted_field() {
        let env = Envelope {
            id: 7,
            body: Some(SimpleKeyValue::new("inner", "x")),
            scratch: Some("never stored".into()),
        };
        let value = JsonRecordIo::encode_value(&env).unwrap();
        assert_eq!(value, json!({"id": 7, "body": {"key": "inner", "value": "x"}}));

        // An omitted field is not read back even when the document has it.
        let text = r#"{"id": 7, "body": {"key": "inner", "value": "x"}, "scratch": "y"}"#;
        let back = JsonRecordIo::decode_str::<Envelope>(text)
            .unwrap()
            .into_first()
            .unwrap();
        assert_eq!(back.scratch, None);
        assert_eq!(back.body, env.body);
    }

    #[test]
    fn nested_record_field_must_be_object() {
        let err = JsonRecordIo::decode_str::<Envelope>(r#"{"id": 1, "body": "x"}"#).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeMismatch { ref path, ref expected, .. }
                if path == "body" && expected == "object"
        ));
    }

    #[test]
    fn unset_fields_are_not_written() {
        let sk = SimpleKeyValue {
            key: "solo".into(),
            value: None,
        };
        assert_eq!(JsonRecordIo::encode_value(&sk).unwrap(), json!({"key": "solo"}));
    }

    #[test]
    fn encode_hook_injects_and_decode_hook_strips() {
        let rec = CustomMarshalled {
            key: "k1".into(),
            value: Some("v".into()),
        };
        let value = JsonRecordIo::encode_value(&rec).unwrap();
        assert_eq!(value, json!({"id": "k1", "oid": "1234567", "value": "v"}));

        let text = JsonRecordIo::encode_str(&rec).unwrap();
        let back = JsonRecordIo::decode_str::<CustomMarshalled>(&text)
            .unwrap()
            .into_first()
            .unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn collection_record_embeds_aggregate_under_reserved_key() {
        let list = TaggedList {
            label: Some("greek".into()),
            members: vec![Tagged::new("alpha"), Tagged::new("beta")],
        };
        let value = JsonRecordIo::encode_value(&list).unwrap();
        assert_eq!(
            value,
            json!({
                "label": "greek",
                "values": [{"tag": "alpha"}, {"tag": "beta"}],
            })
        );
        let back = JsonRecordIo::decode_value::<TaggedList>(value).unwrap();
        assert_eq!(back, Decoded::One(list));
    }

    #[test]
    fn collection_record_without_named_fields_is_its_aggregate() {
        let list = TaggedList {
            label: None,
            members: vec![Tagged::new("alpha"), Tagged::new("beta")],
        };
        let value = JsonRecordIo::encode_value(&list).unwrap();
        assert_eq!(value, json!([{"tag": "alpha"}, {"tag": "beta"}]));

        // Documented quirk: the bare array does not decode back into one
        // collection record. It is read as two sibling records of the
        // collection type, each built from an element.
        let back = JsonRecordIo::decode_value::<TaggedList>(value).unwrap();
        assert_eq!(back.len(), 2);
        assert_ne!(back.into_first(), Some(list));
    }

    #[test]
    fn empty_aggregate_is_not_embedded() {
        let list = TaggedList {
            label: Some("empty".into()),
            members: Vec::new(),
        };
        let value = JsonRecordIo::encode_value(&list).unwrap();
        assert_eq!(value, json!({"label": "empty"}));
    }

    #[test]
    fn empty_records() {
        let list = TaggedList {
            label: None,
            members: Vec::new(),
        };
        assert_eq!(JsonRecordIo::encode_value(&list).unwrap(), json!([]));
        let tagged = Tagged { tag: None };
        assert_eq!(JsonRecordIo::encode_value(&tagged).unwrap(), json!({}));
    }

    #[test]
    fn top_level_array_decodes_to_many() {
        let text = r#"[{"key": "a", "value": "1"}, {"key": "b"}]"#;
        let decoded = JsonRecordIo::decode_str::<SimpleKeyValue>(text).unwrap();
        assert_eq!(
            decoded,
            Decoded::Many(vec![
                SimpleKeyValue::new("a", "1"),
                SimpleKeyValue {
                    key: "b".into(),
                    value: None
                },
            ])
        );
        assert_eq!(JsonRecordIo::decode_many_str::<SimpleKeyValue>(text).unwrap().len(), 2);
    }

    #[test]
    fn decode_many_requires_array() {
        let err = JsonRecordIo::decode_many_str::<SimpleKeyValue>(r#"{"key": "a"}"#).unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = JsonRecordIo::decode_str::<SimpleKeyValue>("[{\"key\": ").unwrap_err();
        assert!(matches!(err, CodecError::Parse(_)));
    }

    #[test]
    fn scalar_document_is_a_type_mismatch() {
        let err = JsonRecordIo::decode_str::<SimpleKeyValue>("42").unwrap_err();
        assert!(matches!(err, CodecError::TypeMismatch { ref path, .. } if path.is_empty()));
    }

    #[test]
    fn nested_mismatch_reports_field_path() {
        let text = r#"[{"key": "Casper", "items": [{"key": "a"}, {"key": 5}]}]"#;
        let err = JsonRecordIo::decode_str::<MultiLevelKeyValue>(text).unwrap_err();
        match err {
            CodecError::TypeMismatch { path, .. } => assert_eq!(path, "[0].items[1].key"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sequence_field_must_be_array() {
        let text = r#"{"key": "Casper", "items": {"key": "a"}}"#;
        let err = JsonRecordIo::decode_str::<MultiLevelKeyValue>(text).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TypeMismatch { ref path, ref expected, .. }
                if path == "items" && expected == "array"
        ));
    }

    #[test]
    fn custom_scalar_serializer_applies_on_encode() {
        let tagged = Tagged::new("MiXeD");
        assert_eq!(
            JsonRecordIo::encode_value(&tagged).unwrap(),
            json!({"tag": "mixed"})
        );
    }

    #[test]
    fn canonical_output_sorts_keys() {
        let text = to_canonical_string(&json!({"b": 1, "a": {"d": [], "c": {}}})).unwrap();
        assert_eq!(
            text,
            "{\n    \"a\": {\n        \"c\": {},\n        \"d\": []\n    },\n    \"b\": 1\n}"
        );
    }

    #[test]
    fn canonical_output_escapes_non_ascii() {
        let text = to_canonical_string(&json!({"caf\u{e9}": "\u{1f36c} and \u{7cd6}"})).unwrap();
        assert_eq!(text, r#"{
    "caf\u00e9": "\ud83c\udf6c and \u7cd6"
}"#);
        assert!(text.is_ascii());

        let record = SimpleKeyValue::new("Cr\u{e8}me br\u{fb}l\u{e9}e", "\u{1f36e}");
        let page = JsonRecordIo::encode_many_str(std::slice::from_ref(&record)).unwrap();
        assert!(page.contains(r#""key": "Cr\u00e8me br\u00fbl\u00e9e""#));
        let back = JsonRecordIo::decode_str::<SimpleKeyValue>(&page).unwrap().into_vec();
        assert_eq!(back, vec![record]);
    }

    #[test]
    fn page_format_is_an_array() {
        let text = JsonRecordIo::encode_many_str(&[SimpleKeyValue::new("a", "1")]).unwrap();
        assert_eq!(
            text,
            "[\n    {\n        \"key\": \"a\",\n        \"value\": \"1\"\n    }\n]"
        );
    }

    fn arb_record() -> impl Strategy<Value = MultiLevelKeyValue> {
        (
            "[a-zA-Z]{1,12}",
            proptest::collection::vec(("[a-z]{1,6}", proptest::option::of("[ -~]{0,10}")), 0..5),
            proptest::option::of("[a-z]{0,8}"),
        )
            .prop_map(|(key, items, custom_val)| MultiLevelKeyValue {
                key,
                items: items
                    .into_iter()
                    .map(|(key, value)| SimpleKeyValue { key, value })
                    .collect(),
                custom_val,
            })
    }

    proptest! {
        #[test]
        fn encoding_is_deterministic(record in arb_record()) {
            let first = JsonRecordIo::encode_str(&record).unwrap();
            let second = JsonRecordIo::encode_str(&record.clone()).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn decode_inverts_encode(record in arb_record()) {
            let text = JsonRecordIo::encode_str(&record).unwrap();
            let back = JsonRecordIo::decode_str::<MultiLevelKeyValue>(&text).unwrap();
            prop_assert_eq!(back, Decoded::One(record));
        }
    }
}
