//! Read-only primary-key index over records stored in a content-addressed
//! object graph.
//!
//! Records live in sorted pages (JSON blobs), pages are grouped into sorted
//! directories (trees), and a commit points at one root tree. Each level is
//! exposed through the same ordered key-value interface, [`Store`]:
//!
//! - [`Page`] -- a leaf; decodes its blob into records on first use
//! - [`IndexTree`] -- an interior node; binary-searches its children by key
//!   range and descends into one of them per lookup
//! - [`Commit`] -- a snapshot; delegates to its root tree
//!
//! Every derived value (decoded rows, child lists, key ranges) is computed
//! at most once per store instance. Stores use interior memoization and are
//! therefore confined to one thread; open a fresh store per thread over a
//! shared [`ObjectGraph`](unique_store::ObjectGraph).
//!
//! # Ordering
//!
//! Lookups rely on keys ascending within each page and on sibling ranges
//! ascending in entry-name order. [`IndexConfig`] controls whether that is
//! checked ([`OrderCheck::Strict`], the default) or trusted
//! ([`OrderCheck::Trusted`], which keeps lookups lazy).
//!
//! # Writes
//!
//! [`MutableStore`] defines the write-side contract. No store here
//! implements it.

pub mod commit;
pub mod config;
pub mod error;
mod memo;
pub mod mutable;
pub mod page;
pub mod range;
pub mod store;
pub mod tree;

#[cfg(test)]
mod fixtures;

pub use commit::Commit;
pub use config::{IndexConfig, OrderCheck};
pub use error::{IndexError, IndexResult};
pub use mutable::{FieldSelector, MutableStore};
pub use page::Page;
pub use range::KeyRange;
pub use store::{Scan, ScanItem, Store};
pub use tree::{Child, IndexTree, Node};
