//! Foundation types for the unique record store.
//!
//! Every object in the underlying graph (record pages, directory trees,
//! commit snapshots) is named by an [`ObjectId`], the BLAKE3 hash of its
//! content. The other crates in the workspace depend on this one.

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
