use unique_codec::{Key, Record};
use unique_store::ObjectGraph;
use unique_types::ObjectId;

use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::range::KeyRange;

/// One scanned record, or the failure that stopped the scan.
pub type ScanItem<'a, R> = IndexResult<(&'a Key, &'a R)>;

/// Lazy, in-order scan over a store. Calling `scan()` again restarts it.
pub type Scan<'a, R> = Box<dyn Iterator<Item = ScanItem<'a, R>> + 'a>;

/// Read-only ordered key-value store over records of type `R`.
///
/// Implemented identically by pages, trees and commits, so callers can hold
/// any level of the hierarchy behind the same interface.
pub trait Store<R: Record> {
    /// Open a store over an object in the graph.
    ///
    /// Fails with `SchemaViolation` if `R` declares no primary key. Nothing
    /// is read from the graph until the store is first used.
    fn from_object(graph: ObjectGraph, oid: ObjectId, config: IndexConfig) -> IndexResult<Self>
    where
        Self: Sized;

    /// Content address of the underlying object.
    fn oid(&self) -> ObjectId;

    /// Name of the record type held.
    fn record_type(&self) -> &'static str {
        R::schema().name
    }

    /// Bounds of every key in the store; `None` when the store is empty.
    fn range(&self) -> IndexResult<Option<&KeyRange>>;

    /// The record stored under `key`.
    fn get(&self, key: &Key) -> IndexResult<&R>;

    /// Every record with its key, in ascending key order.
    fn scan(&self) -> Scan<'_, R>;

    /// Records whose keys fall within `range`, in ascending key order.
    ///
    /// Stops at the first key above `range.high`. Failures are passed
    /// through. A range that overlaps no key yields nothing.
    fn scan_range<'a>(&'a self, range: &KeyRange) -> Scan<'a, R> {
        let KeyRange { low, high } = range.clone();
        Box::new(
            self.scan()
                .filter(move |item| !matches!(item, Ok((key, _)) if **key < low))
                .take_while(move |item| !matches!(item, Ok((key, _)) if **key > high)),
        )
    }
}

pub(crate) fn require_primary_key<R: Record>() -> IndexResult<()> {
    R::schema()
        .require_primary_key()
        .map_err(|err| IndexError::codec(ObjectId::null(), err))
}

/// A scan that yields a single failure.
pub(crate) fn failed_scan<'a, R: Record>(err: IndexError) -> Scan<'a, R> {
    Box::new(std::iter::once(Err(err)))
}
