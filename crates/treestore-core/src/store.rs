//! Record store: sole owner of the id → Tree mapping.
//!
//! TreeStore keeps every record in a RAM hash table next to the identity
//! allocator, both behind one RwLock.
//!
//! **Read path**: `get`, `list`, `search` share the read lock and return
//! owned clones, so a reader never sees a half-applied write.
//! **Write path**: each mutation holds the write lock for its whole
//! duration. Allocation and commit of an assigned id are a single critical
//! section.

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::allocator::IdAllocator;
use crate::error::StoreResult;
use crate::search;
use crate::tree::{is_dataset_id, Origin, Scope, Tree};

/// Everything guarded by the store lock.
#[derive(Debug, Default)]
struct Catalog {
    trees: HashMap<u64, Tree>,
    allocator: IdAllocator,
}

/// In-memory tree catalog.
///
/// All public methods take `&self` for concurrent access; share it as
/// `Arc<TreeStore>` between ingestion threads and request handlers.
#[derive(Debug, Default)]
pub struct TreeStore {
    catalog: RwLock<Catalog>,
}

impl TreeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace under `tree.id`, verbatim.
    ///
    /// No allocation happens on this path. Dataset ingestion uses it with
    /// ids that are multiples of 10; replacing an existing record uses it
    /// with that record's id. Returns the record previously stored there.
    pub fn insert_with_id(&self, tree: Tree) -> Option<Tree> {
        let mut catalog = self.catalog.write();
        catalog.trees.insert(tree.id, tree)
    }

    /// Insert a user record, assigning a fresh id when needed.
    ///
    /// `tree.id` is kept if it is non-zero, free, and outside the dataset
    /// partition. Otherwise the allocator picks one and `tree.id` is
    /// overwritten. Returns the id the record was stored under.
    pub fn insert_assigning_id(&self, mut tree: Tree) -> u64 {
        let mut catalog = self.catalog.write();
        let Catalog { trees, allocator } = &mut *catalog;

        let requested = tree.id;
        let id = allocator.allocate(Some(requested), |id| trees.contains_key(&id));
        if id != requested {
            debug!(requested, assigned = id, "reassigned tree id");
        }

        tree.id = id;
        trees.insert(id, tree);
        id
    }

    /// Record stored under `id`, if any.
    pub fn get(&self, id: u64) -> Option<Tree> {
        let catalog = self.catalog.read();
        catalog.trees.get(&id).cloned()
    }

    /// Check if a record exists under `id`.
    pub fn contains(&self, id: u64) -> bool {
        let catalog = self.catalog.read();
        catalog.trees.contains_key(&id)
    }

    /// Every record, ordered by id.
    pub fn list(&self) -> Vec<Tree> {
        let catalog = self.catalog.read();
        let mut trees: Vec<Tree> = catalog.trees.values().cloned().collect();
        trees.sort_by_key(|tree| tree.id);
        trees
    }

    /// Remove one record. Returns true iff it existed.
    pub fn delete(&self, id: u64) -> bool {
        let mut catalog = self.catalog.write();
        catalog.trees.remove(&id).is_some()
    }

    /// Remove every record covered by `scope`. Returns how many were removed.
    pub fn purge(&self, scope: Scope) -> usize {
        let mut catalog = self.catalog.write();
        let before = catalog.trees.len();
        match scope {
            Scope::All => catalog.trees.clear(),
            Scope::Only(_) => catalog.trees.retain(|&id, _| !scope.covers(id)),
        }
        let removed = before - catalog.trees.len();
        info!(%scope, removed, "purged trees");
        removed
    }

    /// Remove every record of the origin class named by `scope`.
    ///
    /// Accepts `all`, `dataset` (or `api`), and `user` (or `manual`). Any
    /// other name is an [`StoreError::InvalidOrigin`](crate::StoreError)
    /// and leaves the store untouched.
    pub fn delete_by_origin(&self, scope: &str) -> StoreResult<usize> {
        let scope: Scope = scope.parse()?;
        Ok(self.purge(scope))
    }

    /// Records containing `term` in a searchable attribute, sorted by name.
    pub fn search(&self, term: &str) -> Vec<Tree> {
        let catalog = self.catalog.read();
        // Scan in id order so equal names come out deterministically
        let mut candidates: Vec<&Tree> = catalog.trees.values().collect();
        candidates.sort_by_key(|tree| tree.id);
        search::search(candidates, term)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        let catalog = self.catalog.read();
        catalog.trees.len()
    }

    /// Returns true if the store has no records.
    pub fn is_empty(&self) -> bool {
        let catalog = self.catalog.read();
        catalog.trees.is_empty()
    }

    /// Number of records of one origin class.
    pub fn count(&self, origin: Origin) -> usize {
        let catalog = self.catalog.read();
        catalog
            .trees
            .keys()
            .filter(|&&id| is_dataset_id(id) == (origin == Origin::Dataset))
            .count()
    }
}
