use std::fmt;

use tracing::debug;
use unique_codec::{Key, Record};
use unique_store::{CommitObject, ObjectGraph};
use unique_types::ObjectId;

use crate::config::IndexConfig;
use crate::error::IndexResult;
use crate::memo::Memo;
use crate::range::KeyRange;
use crate::store::{failed_scan, require_primary_key, Scan, Store};
use crate::tree::IndexTree;

/// Store over a commit snapshot.
///
/// Behaves exactly like the root tree the commit references. The commit
/// object is read on first use.
pub struct Commit<R: Record> {
    graph: ObjectGraph,
    oid: ObjectId,
    config: IndexConfig,
    snapshot: Memo<CommitObject>,
    tree: Memo<IndexTree<R>>,
}

impl<R: Record> Commit<R> {
    /// The commit object itself.
    pub fn snapshot(&self) -> IndexResult<&CommitObject> {
        self.snapshot.get_or_try_init(self.config.cache_failures, || {
            Ok(self.graph.commit(&self.oid)?)
        })
    }

    /// Root tree of the snapshot.
    pub fn tree(&self) -> IndexResult<&IndexTree<R>> {
        self.tree.get_or_try_init(self.config.cache_failures, || {
            let root = self.snapshot()?.tree_id;
            debug!(
                commit = %self.oid.short_hex(),
                tree = %root.short_hex(),
                "resolved root tree"
            );
            Ok(IndexTree::open(self.graph.clone(), root, self.config.clone()))
        })
    }

    pub fn parents(&self) -> IndexResult<&[ObjectId]> {
        Ok(self.snapshot()?.parents.as_slice())
    }

    pub fn message(&self) -> IndexResult<&str> {
        Ok(self.snapshot()?.message.as_str())
    }
}

impl<R: Record> Store<R> for Commit<R> {
    fn from_object(graph: ObjectGraph, oid: ObjectId, config: IndexConfig) -> IndexResult<Self> {
        require_primary_key::<R>()?;
        Ok(Self {
            graph,
            oid,
            config,
            snapshot: Memo::new(),
            tree: Memo::new(),
        })
    }

    fn oid(&self) -> ObjectId {
        self.oid
    }

    fn range(&self) -> IndexResult<Option<&KeyRange>> {
        self.tree()?.range()
    }

    fn get(&self, key: &Key) -> IndexResult<&R> {
        self.tree()?.get(key)
    }

    fn scan(&self) -> Scan<'_, R> {
        Box::new(
            std::iter::once_with(move || self.tree()).flat_map(|tree| match tree {
                Ok(tree) => tree.scan(),
                Err(err) => failed_scan(err),
            }),
        )
    }

    fn scan_range<'a>(&'a self, range: &KeyRange) -> Scan<'a, R> {
        let range = range.clone();
        Box::new(
            std::iter::once_with(move || self.tree()).flat_map(move |tree| match tree {
                Ok(tree) => tree.scan_range(&range),
                Err(err) => failed_scan(err),
            }),
        )
    }
}

impl<R: Record> fmt::Debug for Commit<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commit")
            .field("oid", &self.oid)
            .field("record_type", &R::schema().name)
            .finish()
    }
}
