use unique_types::ObjectId;

use crate::object::ObjectKind;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The object exists but is not the kind the caller asked for.
    #[error("object {id} is a {found}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: ObjectKind,
        found: ObjectKind,
    },

    /// The bytes read back do not hash to the id they were requested by.
    #[error("hash mismatch: requested {requested}, content hashes to {computed}")]
    HashMismatch {
        requested: ObjectId,
        computed: ObjectId,
    },

    /// Serialization or deserialization of a tree or commit failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Attempted to write an object whose id is null.
    #[error("cannot store object with null ID")]
    NullObjectId,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
