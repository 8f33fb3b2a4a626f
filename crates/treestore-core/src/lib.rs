//! Treestore Core: In-Memory Tree Catalog
//!
//! A catalog of remarkable trees held entirely in RAM. Records from the
//! remote open-data set and records created by users share one id space.
//!
//! # Origin Partition
//!
//! - **Dataset records**: id is a multiple of 10, inserted verbatim
//! - **User records**: any other id, handed out by the [`IdAllocator`]
//! - **Bulk deletion**: by origin class, decided from the id alone
//!
//! # No I/O
//!
//! This crate does not fetch, read files, or listen on sockets.
//! Ingestion and HTTP live in `treestore-server`.

pub mod allocator;
pub mod error;
pub mod search;
pub mod store;
pub mod tree;
pub mod validate;

// Re-export key types for convenience
pub use allocator::IdAllocator;
pub use error::{StoreError, StoreResult};
pub use search::compare_names;
pub use store::TreeStore;
pub use tree::{is_dataset_id, Origin, Scope, Tree, DATASET_ID_STRIDE};
pub use validate::tree_from_json;
