//! Treestore service: ingestion and HTTP over treestore-core
//!
//! Feeds a `TreeStore` from the Paris "arbres remarquables" open-data set
//! and a local seed snapshot, then serves it over HTTP.
//!
//! # Architecture
//!
//! The store itself has no I/O. This crate wires it to the outside world:
//! - Startup ingestion runs the seed and remote loaders concurrently and
//!   joins them before anything is served
//! - Dataset records keep their `index * 10` ids; created records go through
//!   the store's allocator
//! - Request workers share one `Arc<TreeStore>`

pub mod config;
pub mod error;
pub mod http;
pub mod ingest;

pub use config::{Config, RemoteConfig};
pub use error::{ServiceError, ServiceResult};
pub use ingest::{bootstrap, bootstrap_with, IngestReport};
