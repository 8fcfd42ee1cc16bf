use std::sync::Arc;

use unique_codec::{CodecError, Key};
use unique_store::StoreError;
use unique_types::ObjectId;

/// Errors raised by index stores.
///
/// `KeyNotFound` is the expected outcome of looking up an absent key; every
/// other variant is a structural or content fault. Callers should branch on
/// [`IndexError::is_not_found`] rather than treating all errors alike.
///
/// The type is `Clone` so that a memoized failure can be handed out again
/// on every later access.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IndexError {
    /// The key is absent, or outside the store's range.
    #[error("key not found: {0}")]
    KeyNotFound(Key),

    /// The key is already present (mutable stores only).
    #[error("key already exists: {0}")]
    KeyExists(Key),

    /// A page's content is not well-formed JSON.
    #[error("malformed page {oid}: {reason}")]
    Parse { oid: ObjectId, reason: String },

    /// A decoded value does not fit its declared field type.
    #[error("type mismatch in {oid} at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        oid: ObjectId,
        path: String,
        expected: String,
        found: String,
    },

    /// The record type is unusable here, typically for lacking a primary key.
    #[error("schema violation in {schema}: {reason}")]
    SchemaViolation { schema: String, reason: String },

    /// Keys within a page, or ranges across sibling nodes, are not strictly
    /// ascending.
    #[error("order violation in {oid}: {detail}")]
    OrderViolation { oid: ObjectId, detail: String },

    /// Re-encoding records failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Reading the object graph failed.
    #[error("object store error: {0}")]
    Store(Arc<StoreError>),
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }

    /// Attach the object a codec failure came from.
    pub fn codec(oid: ObjectId, err: CodecError) -> Self {
        match err {
            CodecError::Parse(reason) => Self::Parse { oid, reason },
            CodecError::TypeMismatch {
                path,
                expected,
                found,
            } => Self::TypeMismatch {
                oid,
                path,
                expected,
                found,
            },
            CodecError::SchemaViolation { schema, reason } => {
                Self::SchemaViolation { schema, reason }
            }
            CodecError::Serialization(reason) => Self::Encoding(reason),
        }
    }
}

impl From<StoreError> for IndexError {
    fn from(err: StoreError) -> Self {
        Self::Store(Arc::new(err))
    }
}

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
