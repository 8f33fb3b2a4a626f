//! Startup ingestion
//!
//! The seed loader and the remote loader run on two scoped threads against
//! the same store, in no particular order. `bootstrap` returns only after
//! both have finished, so the catalog is never served half-populated.

pub mod remote;
pub mod seed;

use std::path::Path;
use std::thread::{self, ScopedJoinHandle};

use tracing::{error, info};

use treestore_core::TreeStore;

use crate::config::{Config, RemoteConfig};
use remote::{HttpPageSource, PageSource};

/// How many records each source contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub seeded: usize,
    pub fetched: usize,
}

/// Run every source enabled in `config` and wait for all of them.
pub fn bootstrap(store: &TreeStore, config: &Config) -> IngestReport {
    let http = config.remote.as_ref().map(|remote| (HttpPageSource::new(remote), remote));
    let remote = http
        .as_ref()
        .map(|(pages, remote)| (pages as &dyn PageSource, *remote));
    bootstrap_with(store, config.seed_path.as_deref(), remote)
}

/// Run the given sources concurrently and wait for both.
pub fn bootstrap_with(
    store: &TreeStore,
    seed_path: Option<&Path>,
    remote: Option<(&dyn PageSource, &RemoteConfig)>,
) -> IngestReport {
    let report = thread::scope(|scope| {
        let seeded = scope.spawn(|| seed_path.map_or(0, |path| seed::load_seed(store, path)));
        let fetched = scope.spawn(|| {
            remote.map_or(0, |(pages, config)| remote::load_remote(store, pages, config))
        });
        IngestReport {
            seeded: joined(seeded, "seed"),
            fetched: joined(fetched, "remote"),
        }
    });

    info!(
        seeded = report.seeded,
        fetched = report.fetched,
        total = store.len(),
        "catalog ready"
    );
    report
}

fn joined(handle: ScopedJoinHandle<'_, usize>, source: &str) -> usize {
    handle.join().unwrap_or_else(|_| {
        error!(source, "ingestion thread panicked");
        0
    })
}
