//! Content-addressed object graph for the unique record store.
//!
//! The record index never writes here. It reads three kinds of immutable
//! objects, shaped after git's object database:
//!
//! - [`Blob`] -- raw bytes; for the index, a JSON array of records
//! - [`Tree`] -- a directory listing mapping entry names to object ids
//! - [`CommitObject`] -- a snapshot pointing at exactly one root tree
//!
//! Objects are addressed by a domain-separated BLAKE3 hash of their kind and
//! bytes (see [`ContentHasher`]).
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- object graph held in memory
//!
//! [`ObjectGraph`] layers the typed read capabilities (kind, bytes, children,
//! root tree) over any backend.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written.
//! 2. Concurrent reads are always safe.
//! 3. The store never interprets blob contents.

pub mod error;
pub mod graph;
pub mod hasher;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use graph::ObjectGraph;
pub use hasher::ContentHasher;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, CommitObject, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
