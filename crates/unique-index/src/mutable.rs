//! Write-side extension contract.
//!
//! No store in this crate implements [`MutableStore`]; the read-only
//! stores are immutable views of committed objects. The trait fixes the
//! shape a writable store must take, and [`FieldSelector`] provides the
//! field-selective merge that `patch` is built on.

use std::collections::BTreeSet;

use unique_codec::{CodecError, CodecResult, Key, Record};

use crate::error::{IndexError, IndexResult};
use crate::store::Store;

/// A writable store, obtained by connecting to a [`Store`] for update.
pub trait MutableStore<R: Record>: Store<R> {
    /// The immutable store produced by [`commit`](MutableStore::commit).
    type Frozen: Store<R>;

    /// Replace the record under `key`. Fails with `KeyNotFound` if absent.
    fn put(&mut self, key: &Key, value: R) -> IndexResult<()>;

    /// Insert a new record. Fails with `KeyExists` if `key` is present.
    fn post(&mut self, key: &Key, value: R) -> IndexResult<()>;

    /// Remove and return the record under `key`. Fails with `KeyNotFound`
    /// if absent.
    fn delete(&mut self, key: &Key) -> IndexResult<R>;

    /// Copy the fields named by `selector` from `value` into the stored
    /// record, leaving its other fields untouched.
    fn patch(&mut self, key: &Key, value: &R, selector: &FieldSelector) -> IndexResult<()> {
        let merged = selector
            .merge(self.get(key)?, value)
            .map_err(|err| IndexError::codec(self.oid(), err))?;
        self.put(key, merged)
    }

    /// Write pending changes and return the resulting immutable store.
    fn commit(self) -> IndexResult<Self::Frozen>;
}

/// A set of field names selected for a patch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSelector {
    fields: BTreeSet<String>,
}

impl FieldSelector {
    /// Select fields of `R` by name; every name must be a declared field.
    pub fn of<R: Record>(names: &[&str]) -> CodecResult<Self> {
        let schema = R::schema();
        let fields = names
            .iter()
            .map(|name| {
                schema
                    .field(name)
                    .map(|field| field.name.to_owned())
                    .ok_or_else(|| CodecError::SchemaViolation {
                        schema: schema.name.to_owned(),
                        reason: format!("no field named `{name}`"),
                    })
            })
            .collect::<CodecResult<_>>()?;
        Ok(Self { fields })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `target` with each selected field replaced by `source`'s value for
    /// it. A selected field unset in `source` becomes unset.
    pub fn merge<R: Record>(&self, target: &R, source: &R) -> CodecResult<R> {
        let mut merged = target.to_fields();
        let mut source = source.to_fields();
        for name in &self.fields {
            match source.remove(name) {
                Some(datum) => merged.insert(name.clone(), datum),
                None => {
                    merged.remove(name);
                }
            }
        }
        R::from_fields(merged)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use unique_codec::testing::{MultiLevelKeyValue, SimpleKeyValue};
    use unique_store::ObjectGraph;
    use unique_types::ObjectId;

    use super::*;
    use crate::config::IndexConfig;
    use crate::range::KeyRange;
    use crate::store::Scan;

    /// Minimal map-backed store, enough to drive the trait's default
    /// methods.
    #[derive(Default)]
    struct MapStore {
        rows: BTreeMap<Key, MultiLevelKeyValue>,
        range: Option<KeyRange>,
    }

    impl MapStore {
        fn refresh(&mut self) {
            self.range = KeyRange::covering(self.rows.keys());
        }
    }

    impl Store<MultiLevelKeyValue> for MapStore {
        fn from_object(_: ObjectGraph, _: ObjectId, _: IndexConfig) -> IndexResult<Self> {
            Ok(Self::default())
        }

        fn oid(&self) -> ObjectId {
            ObjectId::null()
        }

        fn range(&self) -> IndexResult<Option<&KeyRange>> {
            Ok(self.range.as_ref())
        }

        fn get(&self, key: &Key) -> IndexResult<&MultiLevelKeyValue> {
            self.rows
                .get(key)
                .ok_or_else(|| IndexError::KeyNotFound(key.clone()))
        }

        fn scan(&self) -> Scan<'_, MultiLevelKeyValue> {
            Box::new(self.rows.iter().map(Ok))
        }
    }

    impl MutableStore<MultiLevelKeyValue> for MapStore {
        type Frozen = MapStore;

        fn put(&mut self, key: &Key, value: MultiLevelKeyValue) -> IndexResult<()> {
            let slot = self
                .rows
                .get_mut(key)
                .ok_or_else(|| IndexError::KeyNotFound(key.clone()))?;
            *slot = value;
            Ok(())
        }

        fn post(&mut self, key: &Key, value: MultiLevelKeyValue) -> IndexResult<()> {
            if self.rows.contains_key(key) {
                return Err(IndexError::KeyExists(key.clone()));
            }
            self.rows.insert(key.clone(), value);
            self.refresh();
            Ok(())
        }

        fn delete(&mut self, key: &Key) -> IndexResult<MultiLevelKeyValue> {
            let removed = self
                .rows
                .remove(key)
                .ok_or_else(|| IndexError::KeyNotFound(key.clone()))?;
            self.refresh();
            Ok(removed)
        }

        fn commit(self) -> IndexResult<Self::Frozen> {
            Ok(self)
        }
    }

    fn casper() -> MultiLevelKeyValue {
        MultiLevelKeyValue {
            key: "Casper".into(),
            items: vec![SimpleKeyValue::new("toast", "Charlie_Brown")],
            custom_val: Some("Minotaur".into()),
        }
    }

    #[test]
    fn selector_rejects_unknown_fields() {
        assert!(FieldSelector::of::<MultiLevelKeyValue>(&["custom_val"]).is_ok());
        let err = FieldSelector::of::<MultiLevelKeyValue>(&["custval"]).unwrap_err();
        assert!(matches!(err, CodecError::SchemaViolation { .. }));
    }

    #[test]
    fn merge_copies_only_selected_fields() {
        let target = casper();
        let source = MultiLevelKeyValue {
            key: "ignored".into(),
            items: Vec::new(),
            custom_val: Some("Sphinx".into()),
        };
        let selector = FieldSelector::of::<MultiLevelKeyValue>(&["custom_val"]).unwrap();
        let merged = selector.merge(&target, &source).unwrap();
        assert_eq!(merged.key, "Casper");
        assert_eq!(merged.items, target.items);
        assert_eq!(merged.custom_val.as_deref(), Some("Sphinx"));
    }

    #[test]
    fn merge_unsets_selected_field_missing_from_source() {
        let selector = FieldSelector::of::<MultiLevelKeyValue>(&["items", "custom_val"]).unwrap();
        let merged = selector
            .merge(&casper(), &MultiLevelKeyValue::new("other"))
            .unwrap();
        assert!(merged.items.is_empty());
        assert_eq!(merged.custom_val, None);
    }

    #[test]
    fn patch_goes_through_get_and_put() {
        let mut store = MapStore::default();
        let key = Key::single("Casper");
        store.post(&key, casper()).unwrap();
        assert!(matches!(
            store.post(&key, casper()),
            Err(IndexError::KeyExists(_))
        ));

        let update = MultiLevelKeyValue {
            custom_val: Some("Sphinx".into()),
            ..MultiLevelKeyValue::new("Casper")
        };
        let selector = FieldSelector::of::<MultiLevelKeyValue>(&["custom_val"]).unwrap();
        store.patch(&key, &update, &selector).unwrap();

        let frozen = store.commit().unwrap();
        let stored = frozen.get(&key).unwrap();
        assert_eq!(stored.custom_val.as_deref(), Some("Sphinx"));
        assert_eq!(stored.items.len(), 1);
        assert_eq!(frozen.record_type(), "MultiLevelKeyValue");
    }

    #[test]
    fn patch_of_missing_key_is_not_found() {
        let mut store = MapStore::default();
        let selector = FieldSelector::default();
        let err = store
            .patch(&Key::single("nobody"), &casper(), &selector)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_updates_range() {
        let mut store = MapStore::default();
        for name in ["a", "b"] {
            store
                .post(&Key::single(name), MultiLevelKeyValue::new(name))
                .unwrap();
        }
        store.delete(&Key::single("b")).unwrap();
        assert_eq!(
            store.range().unwrap(),
            Some(&KeyRange::point(Key::single("a")))
        );
        assert_eq!(store.scan().count(), 1);
    }
}
