use std::fmt;

use tracing::{debug, warn};
use unique_codec::{Key, Record};
use unique_store::{EntryMode, ObjectGraph, ObjectKind, StoreError};
use unique_types::ObjectId;

use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::memo::Memo;
use crate::page::Page;
use crate::range::KeyRange;
use crate::store::{failed_scan, require_primary_key, Scan, Store};

/// A child store of a tree: a nested tree or a leaf page.
pub enum Node<R: Record> {
    Tree(IndexTree<R>),
    Page(Page<R>),
}

impl<R: Record> Store<R> for Node<R> {
    /// Open a page or tree according to the object's kind.
    fn from_object(graph: ObjectGraph, oid: ObjectId, config: IndexConfig) -> IndexResult<Self> {
        require_primary_key::<R>()?;
        match graph.kind(&oid)? {
            ObjectKind::Tree => Ok(Node::Tree(IndexTree::open(graph, oid, config))),
            ObjectKind::Blob => Ok(Node::Page(Page::open(graph, oid, config))),
            found => Err(StoreError::UnexpectedKind {
                id: oid,
                expected: ObjectKind::Tree,
                found,
            }
            .into()),
        }
    }

    fn oid(&self) -> ObjectId {
        match self {
            Node::Tree(tree) => tree.oid(),
            Node::Page(page) => page.oid(),
        }
    }

    fn range(&self) -> IndexResult<Option<&KeyRange>> {
        match self {
            Node::Tree(tree) => tree.range(),
            Node::Page(page) => page.range(),
        }
    }

    fn get(&self, key: &Key) -> IndexResult<&R> {
        match self {
            Node::Tree(tree) => tree.get(key),
            Node::Page(page) => page.get(key),
        }
    }

    fn scan(&self) -> Scan<'_, R> {
        match self {
            Node::Tree(tree) => tree.scan(),
            Node::Page(page) => page.scan(),
        }
    }

    fn scan_range<'a>(&'a self, range: &KeyRange) -> Scan<'a, R> {
        match self {
            Node::Tree(tree) => tree.scan_range(range),
            Node::Page(page) => page.scan_range(range),
        }
    }
}

impl<R: Record> fmt::Debug for Node<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Tree(tree) => fmt::Debug::fmt(tree, f),
            Node::Page(page) => fmt::Debug::fmt(page, f),
        }
    }
}

/// A named entry of a tree.
#[derive(Debug)]
pub struct Child<R: Record> {
    pub name: String,
    pub node: Node<R>,
}

/// Interior store over a directory of pages and nested trees.
///
/// Children are ordered by entry name, and their key ranges are expected to
/// ascend in that order without overlap. Point lookups binary-search the
/// children by range and descend into one child per level, so only the pages
/// on the search path are decoded.
pub struct IndexTree<R: Record> {
    graph: ObjectGraph,
    oid: ObjectId,
    config: IndexConfig,
    children: Memo<Vec<Child<R>>>,
    range: Memo<Option<KeyRange>>,
}

impl<R: Record> IndexTree<R> {
    pub(crate) fn open(graph: ObjectGraph, oid: ObjectId, config: IndexConfig) -> Self {
        Self {
            graph,
            oid,
            config,
            children: Memo::new(),
            range: Memo::new(),
        }
    }

    /// Direct children in name order.
    pub fn children(&self) -> IndexResult<&[Child<R>]> {
        self.children
            .get_or_try_init(self.config.cache_failures, || self.load_children())
            .map(Vec::as_slice)
    }

    fn load_children(&self) -> IndexResult<Vec<Child<R>>> {
        let mut children = Vec::new();
        for entry in self.graph.list_children(&self.oid)? {
            let node = match entry.mode {
                EntryMode::Directory => Node::Tree(IndexTree::open(
                    self.graph.clone(),
                    entry.object_id,
                    self.config.clone(),
                )),
                mode if mode.is_content() => Node::Page(Page::open(
                    self.graph.clone(),
                    entry.object_id,
                    self.config.clone(),
                )),
                mode => {
                    debug!(tree = %self.oid.short_hex(), name = %entry.name, %mode, "skipping entry");
                    continue;
                }
            };
            children.push(Child {
                name: entry.name,
                node,
            });
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));

        if self.config.is_strict() {
            self.check_order(&children)?;
        }

        debug!(
            tree = %self.oid.short_hex(),
            children = children.len(),
            "enumerated tree"
        );
        Ok(children)
    }

    /// Non-empty child ranges must ascend strictly in name order. Children
    /// that fail to load are left out of the comparison; their error surfaces
    /// when a lookup or scan reaches them.
    fn check_order(&self, children: &[Child<R>]) -> IndexResult<()> {
        let mut previous: Option<(&str, &KeyRange)> = None;
        for child in children {
            let range = match child.node.range() {
                Ok(Some(range)) => range,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        tree = %self.oid.short_hex(),
                        child = %child.name,
                        error = %err,
                        "unreadable child left out of order check"
                    );
                    continue;
                }
            };
            if let Some((name, prev)) = previous {
                if !prev.precedes(range) {
                    warn!(
                        tree = %self.oid.short_hex(),
                        before = name,
                        after = %child.name,
                        "sibling ranges out of order"
                    );
                    return Err(IndexError::OrderViolation {
                        oid: self.oid,
                        detail: format!(
                            "`{name}` {prev} does not precede `{}` {range}",
                            child.name
                        ),
                    });
                }
            }
            previous = Some((child.name.as_str(), range));
        }
        Ok(())
    }

    fn compute_range(&self) -> IndexResult<Option<KeyRange>> {
        let children = self.children()?;
        let mut low = None;
        for child in children {
            if let Some(range) = child.node.range()? {
                low = Some(range.low.clone());
                break;
            }
        }
        let Some(low) = low else {
            return Ok(None);
        };
        for child in children.iter().rev() {
            if let Some(range) = child.node.range()? {
                return Ok(Some(KeyRange::new(low, range.high.clone())));
            }
        }
        Ok(None)
    }

    /// Index of the nearest child at or around `mid` within `[lo, hi)` that
    /// holds any keys, with its range. Children whose range fails to load are
    /// passed over and the first such error is kept in `skipped`.
    fn nearest_nonempty<'a>(
        children: &'a [Child<R>],
        lo: usize,
        mid: usize,
        hi: usize,
        skipped: &mut Option<IndexError>,
    ) -> Option<(usize, &'a KeyRange)> {
        for idx in (mid..hi).chain((lo..mid).rev()) {
            match children[idx].node.range() {
                Ok(Some(range)) => return Some((idx, range)),
                Ok(None) => {}
                Err(err) => {
                    skipped.get_or_insert(err);
                }
            }
        }
        None
    }
}

impl<R: Record> Store<R> for IndexTree<R> {
    fn from_object(graph: ObjectGraph, oid: ObjectId, config: IndexConfig) -> IndexResult<Self> {
        require_primary_key::<R>()?;
        Ok(Self::open(graph, oid, config))
    }

    fn oid(&self) -> ObjectId {
        self.oid
    }

    fn range(&self) -> IndexResult<Option<&KeyRange>> {
        let range = self
            .range
            .get_or_try_init(self.config.cache_failures, || self.compute_range())?;
        Ok(range.as_ref())
    }

    fn get(&self, key: &Key) -> IndexResult<&R> {
        let not_found = || IndexError::KeyNotFound(key.clone());
        match self.range()? {
            Some(range) if range.contains(key) => {}
            _ => return Err(not_found()),
        }

        let children = self.children()?;
        let (mut lo, mut hi) = (0, children.len());
        // A key held by an unreadable child always leaves that child inside
        // `[lo, hi)`, so a miss after passing one over reports its error.
        let mut skipped = None;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let Some((idx, range)) = Self::nearest_nonempty(children, lo, mid, hi, &mut skipped)
            else {
                break;
            };
            if range.contains(key) {
                return children[idx].node.get(key);
            }
            if range.is_below(key) {
                lo = idx + 1;
            } else {
                hi = idx;
            }
        }
        Err(skipped.unwrap_or_else(not_found))
    }

    fn scan(&self) -> Scan<'_, R> {
        Box::new(std::iter::once_with(move || self.children()).flat_map(scan_children))
    }

    /// Children lying wholly below `range` are passed over, and the scan
    /// ends at the first child lying wholly above it.
    fn scan_range<'a>(&'a self, range: &KeyRange) -> Scan<'a, R> {
        let range = range.clone();
        Box::new(
            std::iter::once_with(move || self.children())
                .flat_map(move |children| scan_children_within(children, range.clone())),
        )
    }
}

fn scan_children<R: Record>(children: IndexResult<&[Child<R>]>) -> Scan<'_, R> {
    match children {
        Ok(children) => Box::new(children.iter().flat_map(|child| child.node.scan())),
        Err(err) => failed_scan(err),
    }
}

fn scan_children_within<R: Record>(
    children: IndexResult<&[Child<R>]>,
    range: KeyRange,
) -> Scan<'_, R> {
    let children = match children {
        Ok(children) => children,
        Err(err) => return failed_scan(err),
    };
    let low = range.low.clone();
    let high = range.high.clone();
    Box::new(
        children
            .iter()
            .filter(move |child| !matches!(child.node.range(), Ok(Some(r)) if r.is_below(&low)))
            .take_while(move |child| !matches!(child.node.range(), Ok(Some(r)) if r.is_above(&high)))
            .flat_map(move |child| child.node.scan_range(&range)),
    )
}

impl<R: Record> fmt::Debug for IndexTree<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexTree")
            .field("oid", &self.oid)
            .field("record_type", &R::schema().name)
            .field("enumerated", &self.children.is_computed())
            .finish()
    }
}
