use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;
use unique_codec::{JsonRecordIo, Key, Record};
use unique_store::ObjectGraph;
use unique_types::ObjectId;

use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::memo::Memo;
use crate::range::KeyRange;
use crate::store::{failed_scan, require_primary_key, Scan, Store};

/// Decoded content of a page: records in content order, plus a key index.
struct Rows<R> {
    entries: Vec<(Key, R)>,
    index: BTreeMap<Key, usize>,
}

/// Leaf store over a single blob holding a JSON array of records.
///
/// The blob is read and decoded on first use and the result kept for the
/// page's lifetime. Under [`OrderCheck::Strict`](crate::OrderCheck) the
/// decoded keys must be strictly ascending; otherwise content order is
/// trusted as-is.
pub struct Page<R: Record> {
    graph: ObjectGraph,
    oid: ObjectId,
    config: IndexConfig,
    rows: Memo<Rows<R>>,
    range: Memo<Option<KeyRange>>,
}

impl<R: Record> Page<R> {
    pub(crate) fn open(graph: ObjectGraph, oid: ObjectId, config: IndexConfig) -> Self {
        Self {
            graph,
            oid,
            config,
            rows: Memo::new(),
            range: Memo::new(),
        }
    }

    /// Whether the blob has been decoded yet.
    pub fn is_decoded(&self) -> bool {
        self.rows.is_computed()
    }

    /// Number of records on the page.
    pub fn len(&self) -> IndexResult<usize> {
        Ok(self.rows()?.entries.len())
    }

    pub fn is_empty(&self) -> IndexResult<bool> {
        Ok(self.len()? == 0)
    }

    fn rows(&self) -> IndexResult<&Rows<R>> {
        self.rows
            .get_or_try_init(self.config.cache_failures, || self.decode())
    }

    fn decode(&self) -> IndexResult<Rows<R>> {
        let data = self.graph.read_bytes(&self.oid)?;
        let records = JsonRecordIo::decode_str::<R>(&data)
            .map_err(|err| IndexError::codec(self.oid, err))?
            .into_vec();

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let key = record.key().map_err(|err| IndexError::codec(self.oid, err))?;
            entries.push((key, record));
        }

        if self.config.is_strict() {
            if let Some(pair) = entries.windows(2).find(|pair| pair[0].0 >= pair[1].0) {
                return Err(IndexError::OrderViolation {
                    oid: self.oid,
                    detail: format!("key {} is followed by {}", pair[0].0, pair[1].0),
                });
            }
        }

        let mut index = BTreeMap::new();
        for (pos, (key, _)) in entries.iter().enumerate() {
            index.entry(key.clone()).or_insert(pos);
        }

        debug!(
            page = %self.oid.short_hex(),
            record_type = R::schema().name,
            records = entries.len(),
            "decoded page"
        );
        Ok(Rows { entries, index })
    }
}

impl<R: Record> Store<R> for Page<R> {
    fn from_object(graph: ObjectGraph, oid: ObjectId, config: IndexConfig) -> IndexResult<Self> {
        require_primary_key::<R>()?;
        Ok(Self::open(graph, oid, config))
    }

    fn oid(&self) -> ObjectId {
        self.oid
    }

    fn range(&self) -> IndexResult<Option<&KeyRange>> {
        let range = self.range.get_or_try_init(self.config.cache_failures, || {
            let rows = self.rows()?;
            Ok(KeyRange::covering(rows.entries.iter().map(|(key, _)| key)))
        })?;
        Ok(range.as_ref())
    }

    fn get(&self, key: &Key) -> IndexResult<&R> {
        let rows = self.rows()?;
        rows.index
            .get(key)
            .map(|&pos| &rows.entries[pos].1)
            .ok_or_else(|| IndexError::KeyNotFound(key.clone()))
    }

    fn scan(&self) -> Scan<'_, R> {
        Box::new(std::iter::once_with(move || self.rows()).flat_map(scan_rows))
    }
}

fn scan_rows<R: Record>(rows: IndexResult<&Rows<R>>) -> Scan<'_, R> {
    match rows {
        Ok(rows) => Box::new(rows.entries.iter().map(|(key, record)| Ok((key, record)))),
        Err(err) => failed_scan(err),
    }
}

impl<R: Record> fmt::Debug for Page<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("oid", &self.oid)
            .field("record_type", &R::schema().name)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}
