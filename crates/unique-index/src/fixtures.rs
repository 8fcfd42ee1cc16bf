//! Object graphs for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use unique_codec::testing::MultiLevelKeyValue;
use unique_codec::{JsonRecordIo, Record};
use unique_store::{
    Blob, CommitObject, InMemoryObjectStore, ObjectGraph, ObjectStore, StoreResult, StoredObject,
    Tree, TreeEntry,
};
use unique_types::ObjectId;

use crate::config::IndexConfig;
use crate::store::Store;

/// Store wrapper recording how often each object is read.
struct CountingStore {
    inner: InMemoryObjectStore,
    reads: Mutex<HashMap<ObjectId, usize>>,
}

impl ObjectStore for CountingStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        *self.reads.lock().unwrap().entry(*id).or_default() += 1;
        self.inner.read(id)
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        self.inner.write(object)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        self.inner.exists(id)
    }
}

pub(crate) struct Fixture {
    store: Arc<CountingStore>,
    config: IndexConfig,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    pub(crate) fn with_config(config: IndexConfig) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
        Self {
            store: Arc::new(CountingStore {
                inner: InMemoryObjectStore::new(),
                reads: Mutex::new(HashMap::new()),
            }),
            config,
        }
    }

    pub(crate) fn graph(&self) -> ObjectGraph {
        ObjectGraph::new(self.store.clone())
    }

    /// Open a store of any level over `oid` with this fixture's config.
    pub(crate) fn open<R: Record, S: Store<R>>(&self, oid: ObjectId) -> S {
        S::from_object(self.graph(), oid, self.config.clone()).unwrap()
    }

    /// Total object reads so far.
    pub(crate) fn reads(&self) -> usize {
        self.store.reads.lock().unwrap().values().sum()
    }

    pub(crate) fn reads_of(&self, oid: ObjectId) -> usize {
        self.store
            .reads
            .lock()
            .unwrap()
            .get(&oid)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn write_blob(&self, content: &str) -> ObjectId {
        self.store
            .write(&Blob::new(content).to_stored_object())
            .unwrap()
    }

    pub(crate) fn write_page<R: Record>(&self, records: &[R]) -> ObjectId {
        self.write_blob(&JsonRecordIo::encode_many_str(records).unwrap())
    }

    pub(crate) fn write_tree(&self, entries: Vec<TreeEntry>) -> ObjectId {
        self.store
            .write(&Tree::new(entries).to_stored_object().unwrap())
            .unwrap()
    }

    pub(crate) fn write_commit(&self, tree: ObjectId) -> ObjectId {
        let commit = CommitObject::new(tree, "snapshot")
            .with_author("fixtures")
            .at(1_700_000_000_000);
        self.store
            .write(&commit.to_stored_object().unwrap())
            .unwrap()
    }

    /// Write a page of [`MultiLevelKeyValue`] records with the given keys.
    pub(crate) fn write_named_page(&self, keys: &[&str]) -> ObjectId {
        let records: Vec<_> = keys.iter().map(|key| record(key)).collect();
        self.write_page(&records)
    }

    /// The standard three-level repository.
    ///
    /// ```text
    /// A-F/
    ///   Apple-Cherry.json    Apple Banana Cherry
    ///   Date-Fig.json        Date Eggplant Elderberry Fig
    /// Gumdrop.json           Gumdrop
    /// H-R/
    ///   H-K/
    ///     Hazel-Iris.json    Hazel Holly Iris
    ///     Juniper-Kale.json  Juniper Kale
    ///   Lemon-Rhubarb.json   Lemon Mango Nutmeg Olive
    /// Scout-Start.json       Scout Sesame Squash Start
    /// ```
    pub(crate) fn standard_repo(&self) -> StandardRepo {
        let a_f = self.write_tree(vec![
            TreeEntry::blob(
                "Apple-Cherry.json",
                self.write_named_page(&["Apple", "Banana", "Cherry"]),
            ),
            TreeEntry::blob(
                "Date-Fig.json",
                self.write_named_page(&["Date", "Eggplant", "Elderberry", "Fig"]),
            ),
        ]);
        let h_k = self.write_tree(vec![
            TreeEntry::blob(
                "Hazel-Iris.json",
                self.write_named_page(&["Hazel", "Holly", "Iris"]),
            ),
            TreeEntry::blob(
                "Juniper-Kale.json",
                self.write_named_page(&["Juniper", "Kale"]),
            ),
        ]);
        let h_r = self.write_tree(vec![
            TreeEntry::dir("H-K", h_k),
            TreeEntry::blob(
                "Lemon-Rhubarb.json",
                self.write_named_page(&["Lemon", "Mango", "Nutmeg", "Olive"]),
            ),
        ]);
        let root = self.write_tree(vec![
            TreeEntry::dir("A-F", a_f),
            TreeEntry::blob("Gumdrop.json", self.write_named_page(&["Gumdrop"])),
            TreeEntry::dir("H-R", h_r),
            TreeEntry::blob(
                "Scout-Start.json",
                self.write_named_page(&["Scout", "Sesame", "Squash", "Start"]),
            ),
        ]);
        let commit = self.write_commit(root);
        StandardRepo { root, commit }
    }
}

pub(crate) struct StandardRepo {
    pub root: ObjectId,
    pub commit: ObjectId,
}

impl StandardRepo {
    /// Every key in the repository, ascending.
    pub(crate) const KEYS: [&'static str; 21] = [
        "Apple",
        "Banana",
        "Cherry",
        "Date",
        "Eggplant",
        "Elderberry",
        "Fig",
        "Gumdrop",
        "Hazel",
        "Holly",
        "Iris",
        "Juniper",
        "Kale",
        "Lemon",
        "Mango",
        "Nutmeg",
        "Olive",
        "Scout",
        "Sesame",
        "Squash",
        "Start",
    ];
}

/// The record stored under `key` in fixture pages.
pub(crate) fn record(key: &str) -> MultiLevelKeyValue {
    MultiLevelKeyValue {
        custom_val: Some(key.to_lowercase()),
        ..MultiLevelKeyValue::new(key).with_item("len", &key.len().to_string())
    }
}
