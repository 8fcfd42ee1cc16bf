//! Read-only typed view over an [`ObjectStore`].
//!
//! The record index only ever needs four things from the object graph: an
//! object's kind, a blob's bytes, a tree's children, and a commit's root
//! tree. [`ObjectGraph`] provides exactly those and nothing that mutates.

use std::sync::Arc;

use tracing::trace;
use unique_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, CommitObject, ObjectKind, StoredObject, Tree, TreeEntry};
use crate::traits::ObjectStore;

/// Cheaply clonable read handle into a shared object store.
#[derive(Clone)]
pub struct ObjectGraph {
    store: Arc<dyn ObjectStore>,
}

impl ObjectGraph {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch an object, failing if it is missing or its content does not
    /// hash back to `id`.
    pub fn load(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        let obj = self.store.read(id)?.ok_or(StoreError::NotFound(*id))?;
        let computed = obj.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch {
                requested: *id,
                computed,
            });
        }
        trace!(id = %id.short_hex(), kind = %obj.kind, "loaded object");
        Ok(obj)
    }

    pub fn kind(&self, id: &ObjectId) -> StoreResult<ObjectKind> {
        Ok(self.load(id)?.kind)
    }

    /// Bytes of a blob.
    pub fn read_bytes(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        Ok(Blob::from_stored_object(self.load(id)?)?.data)
    }

    /// Direct entries of a tree, in stored (name) order.
    pub fn list_children(&self, id: &ObjectId) -> StoreResult<Vec<TreeEntry>> {
        Ok(Tree::from_stored_object(self.load(id)?)?.entries)
    }

    pub fn commit(&self, id: &ObjectId) -> StoreResult<CommitObject> {
        CommitObject::from_stored_object(self.load(id)?)
    }

    /// Root tree referenced by a commit.
    pub fn root_tree(&self, id: &ObjectId) -> StoreResult<ObjectId> {
        Ok(self.commit(id)?.tree_id)
    }
}

impl std::fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectGraph").finish_non_exhaustive()
    }
}
