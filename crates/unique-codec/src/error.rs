/// Errors raised while encoding or decoding records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The content is not well-formed JSON.
    #[error("malformed JSON: {0}")]
    Parse(String),

    /// A value does not match the type its field declares.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// The record type cannot be used where it is being used, e.g. it
    /// declares no primary key.
    #[error("schema violation in {schema}: {reason}")]
    SchemaViolation { schema: String, reason: String },

    /// Writing canonical JSON failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CodecError {
    pub(crate) fn mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: &serde_json::Value,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: describe(found),
        }
    }
}

/// Short human description of a JSON value for error messages.
pub(crate) fn describe(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("bool {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(_) => "object".into(),
    }
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
